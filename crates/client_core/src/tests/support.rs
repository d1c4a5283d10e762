//! In-memory `PortalApi` with scripted responses and call recording.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use shared::{
    domain::{AppointmentCondition, AppointmentId, FilterCriteria, ProviderId, RecipientId},
    protocol::{
        AdminLoginRequest, AppointmentPayload, CredentialLoginRequest, ProviderUpsertRequest,
        SignupRequest, VisitRecordPayload,
    },
};

use crate::{
    error::TransportError, events::UiEvent, session::SessionStore, ApiResult, PortalApi,
};

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub op: &'static str,
    pub detail: String,
}

#[derive(Clone)]
struct Scripted {
    delay: Duration,
    result: ApiResult<Value>,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    calls: Mutex<Vec<Call>>,
    responses: Mutex<HashMap<&'static str, Scripted>>,
    filters: Mutex<HashMap<String, Scripted>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, op: &'static str, result: ApiResult<Value>) -> &Self {
        self.respond_after(op, Duration::ZERO, result)
    }

    pub fn respond_after(&self, op: &'static str, delay: Duration, result: ApiResult<Value>) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(op, Scripted { delay, result });
        self
    }

    /// Filter response keyed by the request's `detail` string.
    pub fn respond_to_filter(&self, detail: &str, delay: Duration, result: ApiResult<Value>) -> &Self {
        self.filters
            .lock()
            .unwrap()
            .insert(detail.to_string(), Scripted { delay, result });
        self
    }

    pub fn calls(&self, op: &str) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls(op).len()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn answer(&self, op: &'static str, detail: String) -> ApiResult<Value> {
        let scripted = if op == "filter_providers" {
            self.filters.lock().unwrap().get(&detail).cloned()
        } else {
            None
        }
        .or_else(|| self.responses.lock().unwrap().get(op).cloned());
        self.calls.lock().unwrap().push(Call { op, detail });

        match scripted {
            Some(scripted) => {
                if !scripted.delay.is_zero() {
                    tokio::time::sleep(scripted.delay).await;
                }
                scripted.result
            }
            None => Ok(Value::Null),
        }
    }
}

pub(crate) fn criteria_detail(criteria: &FilterCriteria) -> String {
    format!(
        "{}|{}|{}",
        criteria.name.as_deref().unwrap_or(""),
        criteria.time_slot.as_deref().unwrap_or(""),
        criteria.specialty.as_deref().unwrap_or("")
    )
}

pub(crate) fn rejected(status: u16, message: &str) -> TransportError {
    TransportError::Rejected {
        status,
        message: Some(message.to_string()),
    }
}

pub(crate) fn network_down() -> TransportError {
    TransportError::Network("connection refused".to_string())
}

pub(crate) fn logged_in(role: shared::domain::Role, token: &str) -> SessionStore {
    let store = SessionStore::default();
    store.establish(role, token);
    store
}

/// Drains every event currently buffered on `rx`.
pub(crate) fn drain(rx: &mut tokio::sync::broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[async_trait]
impl PortalApi for FakeApi {
    async fn list_providers(&self) -> ApiResult<Value> {
        self.answer("list_providers", String::new()).await
    }

    async fn filter_providers(&self, criteria: &FilterCriteria) -> ApiResult<Value> {
        self.answer("filter_providers", criteria_detail(criteria)).await
    }

    async fn save_provider(&self, token: &str, provider: &ProviderUpsertRequest) -> ApiResult<Value> {
        let body = serde_json::to_string(provider).unwrap();
        self.answer("save_provider", format!("{token} {body}")).await
    }

    async fn update_provider(&self, token: &str, provider: &ProviderUpsertRequest) -> ApiResult<Value> {
        let body = serde_json::to_string(provider).unwrap();
        self.answer("update_provider", format!("{token} {body}")).await
    }

    async fn delete_provider(&self, token: &str, id: ProviderId) -> ApiResult<Value> {
        self.answer("delete_provider", format!("{token} {id}")).await
    }

    async fn admin_login(&self, credentials: &AdminLoginRequest) -> ApiResult<Value> {
        self.answer("admin_login", credentials.username.clone()).await
    }

    async fn clinician_login(&self, credentials: &CredentialLoginRequest) -> ApiResult<Value> {
        self.answer("clinician_login", credentials.identifier.clone())
            .await
    }

    async fn recipient_login(&self, credentials: &CredentialLoginRequest) -> ApiResult<Value> {
        self.answer("recipient_login", credentials.identifier.clone())
            .await
    }

    async fn recipient_signup(&self, signup: &SignupRequest) -> ApiResult<Value> {
        self.answer("recipient_signup", signup.email.clone()).await
    }

    async fn recipient_profile(&self, token: &str) -> ApiResult<Value> {
        self.answer("recipient_profile", token.to_string()).await
    }

    async fn recipient_appointments(&self, token: &str, id: RecipientId) -> ApiResult<Value> {
        self.answer("recipient_appointments", format!("{token} {id}"))
            .await
    }

    async fn filter_recipient_appointments(
        &self,
        token: &str,
        condition: Option<AppointmentCondition>,
        provider_name: Option<&str>,
    ) -> ApiResult<Value> {
        let condition = condition.map_or("-", AppointmentCondition::as_str);
        let detail = format!("{token} {condition} {}", provider_name.unwrap_or("-"));
        self.answer("filter_recipient_appointments", detail).await
    }

    async fn clinician_appointments(
        &self,
        token: &str,
        date: NaiveDate,
        patient_name: Option<&str>,
    ) -> ApiResult<Value> {
        let detail = format!("{token} {date} {}", patient_name.unwrap_or("-"));
        self.answer("clinician_appointments", detail).await
    }

    async fn book_appointment(&self, token: &str, appointment: &AppointmentPayload) -> ApiResult<Value> {
        let body = serde_json::to_string(appointment).unwrap();
        self.answer("book_appointment", format!("{token} {body}")).await
    }

    async fn update_appointment(
        &self,
        token: &str,
        appointment: &AppointmentPayload,
    ) -> ApiResult<Value> {
        let body = serde_json::to_string(appointment).unwrap();
        self.answer("update_appointment", format!("{token} {body}"))
            .await
    }

    async fn cancel_appointment(&self, token: &str, id: AppointmentId) -> ApiResult<Value> {
        self.answer("cancel_appointment", format!("{token} {id}")).await
    }

    async fn save_visit_record(&self, token: &str, record: &VisitRecordPayload) -> ApiResult<Value> {
        let body = serde_json::to_string(record).unwrap();
        self.answer("save_visit_record", format!("{token} {body}")).await
    }

    async fn visit_record(&self, token: &str, appointment_id: AppointmentId) -> ApiResult<Value> {
        self.answer("visit_record", format!("{token} {appointment_id}"))
            .await
    }
}
