//! Appointment booking for an authenticated recipient.
//!
//! idle -> overlay-open -> slot-selected -> submitting -> booked | failed.
//! The overlay only opens once the recipient identity is resolved.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use shared::{
    domain::{BookingRequest, Provider, RecipientProfile, Role},
    protocol::{AppointmentPayload, MessageResponse},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::PortalError,
    events::{EventSink, UiErrorContext, UiEvent},
    session::SessionView,
    PortalApi,
};

const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
const IDENTITY_UNAVAILABLE: &str = "Could not fetch patient data. Please try again.";
const MISSING_DATE_OR_TIME: &str = "Please pick date and time";
const SLOT_NOT_OFFERED: &str = "Selected time is not available for this doctor.";
const BOOKING_FAILED: &str = "Failed to book an appointment";
const BOOKED: &str = "Appointment Booked successfully";

/// Start boundary of a slot label such as `09:00-10:00`.
pub fn slot_start(label: &str) -> Option<NaiveTime> {
    let start = label.split('-').next()?.trim();
    NaiveTime::parse_from_str(start, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(start, "%H:%M"))
        .ok()
}

/// `09:00-10:00` and `09:00:00-10:00:00` both yield `09:00:00`.
pub fn slot_start_label(label: &str) -> Option<String> {
    slot_start(label).map(|time| time.format("%H:%M:%S").to_string())
}

pub fn compose_slot_start(date: NaiveDate, label: &str) -> Option<NaiveDateTime> {
    slot_start(label).map(|time| date.and_time(time))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingPhase {
    Idle,
    OverlayOpen,
    SlotSelected,
    Submitting,
    Booked,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingOverlay {
    pub provider: Provider,
    pub recipient: RecipientProfile,
    pub date: Option<NaiveDate>,
    pub slot: Option<String>,
}

impl BookingOverlay {
    pub fn slots(&self) -> &[String] {
        &self.provider.availability
    }
}

#[derive(Debug, Clone)]
pub struct BookingState {
    pub phase: BookingPhase,
    pub overlay: Option<BookingOverlay>,
}

impl Default for BookingState {
    fn default() -> Self {
        Self {
            phase: BookingPhase::Idle,
            overlay: None,
        }
    }
}

struct CachedIdentity {
    token: String,
    profile: RecipientProfile,
}

fn parse_profile(payload: Value) -> Option<RecipientProfile> {
    let inner = match payload.get("patient") {
        Some(patient) if patient.is_object() => patient.clone(),
        _ => payload,
    };
    serde_json::from_value(inner).ok()
}

/// Recipient profile lookup by token, cached until a different token is seen.
pub struct RecipientIdentity {
    api: Arc<dyn PortalApi>,
    cached: Mutex<Option<CachedIdentity>>,
}

impl RecipientIdentity {
    pub fn new(api: Arc<dyn PortalApi>) -> Self {
        Self {
            api,
            cached: Mutex::new(None),
        }
    }

    pub async fn resolve(&self, token: &str) -> Result<RecipientProfile, PortalError> {
        let mut cached = self.cached.lock().await;
        if let Some(identity) = cached.as_ref().filter(|identity| identity.token == token) {
            return Ok(identity.profile.clone());
        }

        let profile = match self.api.recipient_profile(token).await {
            Ok(payload) => parse_profile(payload),
            Err(err) => {
                warn!(error = %err, "identity: recipient lookup failed");
                None
            }
        };
        let Some(profile) = profile else {
            return Err(PortalError::Server {
                status: None,
                message: IDENTITY_UNAVAILABLE.to_string(),
            });
        };
        *cached = Some(CachedIdentity {
            token: token.to_string(),
            profile: profile.clone(),
        });
        Ok(profile)
    }
}

pub struct BookingWorkflow {
    api: Arc<dyn PortalApi>,
    session: SessionView,
    events: EventSink,
    identity: Arc<RecipientIdentity>,
    state: Mutex<BookingState>,
}

impl BookingWorkflow {
    pub fn new(
        api: Arc<dyn PortalApi>,
        session: SessionView,
        events: EventSink,
        identity: Arc<RecipientIdentity>,
    ) -> Self {
        Self {
            api,
            session,
            events,
            identity,
            state: Mutex::new(BookingState::default()),
        }
    }

    pub async fn state(&self) -> BookingState {
        self.state.lock().await.clone()
    }

    pub async fn phase(&self) -> BookingPhase {
        self.state.lock().await.phase.clone()
    }

    /// "Book" on a provider card. Resolves the recipient first; on failure
    /// the workflow stays idle.
    pub async fn begin(&self, provider: Provider) -> Result<(), PortalError> {
        let Some(token) = self.session.credential_for(Role::LoggedPatient) else {
            return self.abort(PortalError::Auth(SESSION_EXPIRED.to_string())).await;
        };
        let recipient = match self.identity.resolve(&token).await {
            Ok(profile) => profile,
            Err(err) => return self.abort(err).await,
        };

        let overlay = BookingOverlay {
            provider,
            recipient,
            date: None,
            slot: None,
        };
        info!(provider_id = %overlay.provider.id, "booking: overlay opened");
        {
            let mut state = self.state.lock().await;
            state.overlay = Some(overlay.clone());
            state.phase = BookingPhase::OverlayOpen;
        }
        self.events.emit(UiEvent::BookingOverlayOpened(overlay));
        self.events
            .emit(UiEvent::BookingPhaseChanged(BookingPhase::OverlayOpen));
        Ok(())
    }

    pub async fn set_date(&self, date: NaiveDate) -> Result<(), PortalError> {
        let mut state = self.state.lock().await;
        let Some(overlay) = state.overlay.as_mut() else {
            return Err(PortalError::validation("No booking in progress"));
        };
        overlay.date = Some(date);
        Ok(())
    }

    /// Picks one of the provider's offered slots.
    pub async fn select_slot(&self, label: &str) -> Result<(), PortalError> {
        let mut state = self.state.lock().await;
        let Some(overlay) = state.overlay.as_mut() else {
            return Err(PortalError::validation("No booking in progress"));
        };
        let label = label.trim();
        if !overlay.provider.availability.iter().any(|slot| slot == label) {
            drop(state);
            let err = PortalError::validation(SLOT_NOT_OFFERED);
            self.events.error(UiErrorContext::Booking, &err);
            return Err(err);
        }
        overlay.slot = Some(label.to_string());
        state.phase = BookingPhase::SlotSelected;
        drop(state);
        self.events
            .emit(UiEvent::BookingPhaseChanged(BookingPhase::SlotSelected));
        Ok(())
    }

    /// Submits exactly one booking. On failure the overlay stays open.
    pub async fn confirm(&self) -> Result<(), PortalError> {
        let (overlay, token) = {
            let mut state = self.state.lock().await;
            let Some(overlay) = state.overlay.clone() else {
                return Err(PortalError::validation("No booking in progress"));
            };
            if state.phase == BookingPhase::Submitting {
                return Err(PortalError::validation("Booking already in progress"));
            }
            let (Some(_), Some(_)) = (overlay.date, overlay.slot.as_deref()) else {
                drop(state);
                return self.reject(PortalError::validation(MISSING_DATE_OR_TIME));
            };
            let Some(token) = self.session.credential_for(Role::LoggedPatient) else {
                drop(state);
                return self.reject(PortalError::Auth(SESSION_EXPIRED.to_string()));
            };
            state.phase = BookingPhase::Submitting;
            (overlay, token)
        };
        self.events
            .emit(UiEvent::BookingPhaseChanged(BookingPhase::Submitting));

        let slot_start = overlay
            .date
            .zip(overlay.slot.as_deref())
            .and_then(|(date, label)| compose_slot_start(date, label));
        let Some(slot_start) = slot_start else {
            return self
                .fail(PortalError::validation(MISSING_DATE_OR_TIME))
                .await;
        };

        let request = BookingRequest::new(overlay.provider.id, overlay.recipient.id, slot_start);
        let payload = AppointmentPayload::from(&request);
        match self.api.book_appointment(&token, &payload).await {
            Ok(body) => {
                info!(provider_id = %request.provider_id, "booking: appointment booked");
                let message = serde_json::from_value::<MessageResponse>(body)
                    .ok()
                    .and_then(|response| response.message)
                    .unwrap_or_else(|| BOOKED.to_string());
                {
                    let mut state = self.state.lock().await;
                    state.phase = BookingPhase::Booked;
                    state.overlay = None;
                }
                self.events.emit(UiEvent::BookingPhaseChanged(BookingPhase::Booked));
                self.events.emit(UiEvent::BookingOverlayClosed);
                self.events.notice(message);
                Ok(())
            }
            Err(err) => {
                warn!(provider_id = %request.provider_id, error = %err, "booking: submission failed");
                self.fail(PortalError::server(err, BOOKING_FAILED)).await
            }
        }
    }

    pub async fn cancel(&self) {
        let had_overlay = {
            let mut state = self.state.lock().await;
            let had_overlay = state.overlay.take().is_some();
            state.phase = BookingPhase::Idle;
            had_overlay
        };
        if had_overlay {
            self.events.emit(UiEvent::BookingOverlayClosed);
            self.events.emit(UiEvent::BookingPhaseChanged(BookingPhase::Idle));
        }
    }

    async fn abort(&self, error: PortalError) -> Result<(), PortalError> {
        {
            let mut state = self.state.lock().await;
            state.phase = BookingPhase::Idle;
            state.overlay = None;
        }
        self.events.error(UiErrorContext::Booking, &error);
        Err(error)
    }

    fn reject(&self, error: PortalError) -> Result<(), PortalError> {
        self.events.error(UiErrorContext::Booking, &error);
        Err(error)
    }

    async fn fail(&self, error: PortalError) -> Result<(), PortalError> {
        self.state.lock().await.phase = BookingPhase::Failed(error.message().to_string());
        self.events
            .emit(UiEvent::BookingPhaseChanged(BookingPhase::Failed(
                error.message().to_string(),
            )));
        self.reject(error)
    }
}

#[cfg(test)]
#[path = "tests/booking_tests.rs"]
mod tests;
