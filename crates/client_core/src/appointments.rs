//! Appointment lists for clinicians and recipients, plus update and cancel.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use shared::{
    domain::{Appointment, AppointmentCondition, AppointmentId, Role},
    protocol::{AppointmentPayload, EntityRef, MessageResponse},
};
use tracing::{info, warn};

use crate::{
    booking::RecipientIdentity,
    error::PortalError,
    events::{EventSink, UiErrorContext, UiEvent},
    normalize::Normalizer,
    session::SessionView,
    ApiResult, PortalApi,
};

const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
const NO_APPOINTMENTS_TODAY: &str = "No Appointments found for today.";
const NO_APPOINTMENTS: &str = "No appointments found.";
const NO_MATCHING_APPOINTMENTS: &str = "No appointments match the given filters.";
const LOAD_FAILED: &str = "Error loading appointments. Try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentsView {
    Populated(Vec<Appointment>),
    Empty { message: String },
    Error { message: String },
}

impl AppointmentsView {
    pub fn appointments(&self) -> &[Appointment] {
        match self {
            AppointmentsView::Populated(items) => items,
            _ => &[],
        }
    }
}

pub struct AppointmentBoard {
    api: Arc<dyn PortalApi>,
    normalizer: Arc<Normalizer>,
    session: SessionView,
    events: EventSink,
    identity: Arc<RecipientIdentity>,
}

impl AppointmentBoard {
    pub fn new(
        api: Arc<dyn PortalApi>,
        normalizer: Arc<Normalizer>,
        session: SessionView,
        events: EventSink,
        identity: Arc<RecipientIdentity>,
    ) -> Self {
        Self {
            api,
            normalizer,
            session,
            events,
            identity,
        }
    }

    /// Clinician's appointments for `date` (today when absent), optionally
    /// narrowed by recipient name.
    pub async fn clinician_day(
        &self,
        date: Option<NaiveDate>,
        patient_name: Option<&str>,
    ) -> AppointmentsView {
        let Some(token) = self.session.credential_for(Role::Doctor) else {
            return self.render(AppointmentsView::Error {
                message: SESSION_EXPIRED.to_string(),
            });
        };
        let date = date.unwrap_or_else(|| Local::now().date_naive());
        let patient_name = patient_name.map(str::trim).filter(|name| !name.is_empty());

        let result = self
            .api
            .clinician_appointments(&token, date, patient_name)
            .await;
        let view = self.to_view(result, NO_APPOINTMENTS_TODAY);
        self.render(view)
    }

    /// The authenticated recipient's own appointments.
    pub async fn recipient_history(&self) -> AppointmentsView {
        let Some(token) = self.session.credential_for(Role::LoggedPatient) else {
            return self.render(AppointmentsView::Error {
                message: SESSION_EXPIRED.to_string(),
            });
        };
        let recipient = match self.identity.resolve(&token).await {
            Ok(profile) => profile,
            Err(err) => {
                return self.render(AppointmentsView::Error {
                    message: err.message().to_string(),
                })
            }
        };

        let result = self.api.recipient_appointments(&token, recipient.id).await;
        let view = self.to_view(result, NO_APPOINTMENTS);
        self.render(view)
    }

    /// The recipient's appointments narrowed to past or upcoming visits and/or
    /// a provider name. With neither filter this is [`Self::recipient_history`].
    pub async fn recipient_filter(
        &self,
        condition: Option<AppointmentCondition>,
        provider_name: Option<&str>,
    ) -> AppointmentsView {
        let provider_name = provider_name.map(str::trim).filter(|name| !name.is_empty());
        if condition.is_none() && provider_name.is_none() {
            return self.recipient_history().await;
        }
        let Some(token) = self.session.credential_for(Role::LoggedPatient) else {
            return self.render(AppointmentsView::Error {
                message: SESSION_EXPIRED.to_string(),
            });
        };

        let result = self
            .api
            .filter_recipient_appointments(&token, condition, provider_name)
            .await;
        let view = self.to_view(result, NO_MATCHING_APPOINTMENTS);
        self.render(view)
    }

    /// Rewrites an appointment the current user owns.
    pub async fn update(&self, appointment: &Appointment) -> Result<String, PortalError> {
        let token = self.any_token()?;
        let (Some(doctor), Some(patient)) = (appointment.doctor_id, appointment.patient_id) else {
            return self.reject(PortalError::validation(
                "Appointment is missing its doctor or patient.",
            ));
        };
        let payload = AppointmentPayload {
            id: Some(appointment.id),
            doctor: EntityRef { id: doctor },
            patient: EntityRef { id: patient },
            appointment_time: appointment.appointment_time,
            status: appointment.status,
        };
        match self.api.update_appointment(&token, &payload).await {
            Ok(body) => {
                info!(appointment_id = %appointment.id, "appointments: updated");
                Ok(self.notify(body, "Appointment updated successfully"))
            }
            Err(err) => {
                warn!(appointment_id = %appointment.id, error = %err, "appointments: update failed");
                self.reject(PortalError::server(err, "Failed to update appointment"))
            }
        }
    }

    pub async fn cancel(&self, id: AppointmentId) -> Result<String, PortalError> {
        let token = self.any_token()?;
        match self.api.cancel_appointment(&token, id).await {
            Ok(body) => {
                info!(appointment_id = %id, "appointments: cancelled");
                Ok(self.notify(body, "Appointment cancelled successfully"))
            }
            Err(err) => {
                warn!(appointment_id = %id, error = %err, "appointments: cancel failed");
                self.reject(PortalError::server(err, "Failed to cancel appointment"))
            }
        }
    }

    fn any_token(&self) -> Result<String, PortalError> {
        [Role::Doctor, Role::LoggedPatient, Role::Admin]
            .into_iter()
            .find_map(|role| self.session.credential_for(role))
            .map_or_else(
                || self.reject(PortalError::Auth(SESSION_EXPIRED.to_string())),
                Ok,
            )
    }

    fn to_view(&self, result: ApiResult<serde_json::Value>, empty: &str) -> AppointmentsView {
        match result {
            Ok(payload) => {
                let appointments = self.normalizer.appointments(&payload).items;
                if appointments.is_empty() {
                    AppointmentsView::Empty {
                        message: empty.to_string(),
                    }
                } else {
                    AppointmentsView::Populated(appointments)
                }
            }
            Err(err) => {
                warn!(error = %err, "appointments: list request failed");
                AppointmentsView::Error {
                    message: PortalError::server(err, LOAD_FAILED).message().to_string(),
                }
            }
        }
    }

    fn render(&self, view: AppointmentsView) -> AppointmentsView {
        self.events.emit(UiEvent::AppointmentsRendered(view.clone()));
        view
    }

    fn notify(&self, body: serde_json::Value, fallback: &str) -> String {
        let message = serde_json::from_value::<MessageResponse>(body)
            .ok()
            .and_then(|response| response.message)
            .unwrap_or_else(|| fallback.to_string());
        self.events.notice(message.clone());
        message
    }

    fn reject<T>(&self, error: PortalError) -> Result<T, PortalError> {
        self.events.error(UiErrorContext::Appointments, &error);
        Err(error)
    }
}

#[cfg(test)]
#[path = "tests/appointments_tests.rs"]
mod tests;
