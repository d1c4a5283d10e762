//! Visit records (prescriptions) keyed by appointment.

use std::sync::Arc;

use shared::{
    domain::{AppointmentId, Role, VisitRecord},
    protocol::{MessageResponse, VisitRecordPayload},
};
use tracing::{info, warn};

use crate::{
    error::PortalError,
    events::{EventSink, UiErrorContext},
    normalize::Normalizer,
    session::SessionView,
    PortalApi,
};

pub struct VisitRecords {
    api: Arc<dyn PortalApi>,
    normalizer: Arc<Normalizer>,
    session: SessionView,
    events: EventSink,
}

impl VisitRecords {
    pub fn new(
        api: Arc<dyn PortalApi>,
        normalizer: Arc<Normalizer>,
        session: SessionView,
        events: EventSink,
    ) -> Self {
        Self {
            api,
            normalizer,
            session,
            events,
        }
    }

    /// Record attached to `appointment_id`, if one was saved.
    pub async fn load(&self, appointment_id: AppointmentId) -> Result<Option<VisitRecord>, PortalError> {
        let token = self.clinician_token()?;
        match self.api.visit_record(&token, appointment_id).await {
            Ok(payload) => Ok(self
                .normalizer
                .visit_records(&payload)
                .items
                .into_iter()
                .next()),
            Err(err) if err.status() == Some(404) => Ok(None),
            Err(err) => {
                warn!(appointment_id = %appointment_id, error = %err, "records: fetch failed");
                self.reject(PortalError::server(err, "Failed to fetch prescription."))
            }
        }
    }

    pub async fn save(&self, record: &VisitRecord) -> Result<String, PortalError> {
        if record.medication.trim().is_empty() {
            return self.reject(PortalError::validation("Medication is required."));
        }
        let token = self.clinician_token()?;
        let payload = VisitRecordPayload::from(record);
        match self.api.save_visit_record(&token, &payload).await {
            Ok(body) => {
                info!(appointment_id = %record.appointment_id, "records: saved");
                let message = serde_json::from_value::<MessageResponse>(body)
                    .ok()
                    .and_then(|response| response.message)
                    .unwrap_or_else(|| "Prescription saved successfully.".to_string());
                self.events.notice(message.clone());
                Ok(message)
            }
            Err(err) => {
                warn!(appointment_id = %record.appointment_id, error = %err, "records: save failed");
                let fallback = match err.status() {
                    Some(status) => format!("Server error {status}"),
                    None => "Failed to save prescription.".to_string(),
                };
                self.reject(PortalError::server(err, &fallback))
            }
        }
    }

    fn clinician_token(&self) -> Result<String, PortalError> {
        match self.session.credential_for(Role::Doctor) {
            Some(token) => Ok(token),
            None => self.reject(PortalError::Auth(
                "Session expired. Please log in again.".to_string(),
            )),
        }
    }

    fn reject<T>(&self, error: PortalError) -> Result<T, PortalError> {
        self.events.error(UiErrorContext::VisitRecord, &error);
        Err(error)
    }
}

#[cfg(test)]
#[path = "tests/records_tests.rs"]
mod tests;
