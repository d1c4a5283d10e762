//! reqwest-backed implementation of the upstream portal API.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::{AppointmentCondition, AppointmentId, FilterCriteria, ProviderId, RecipientId},
    error::ErrorBody,
    protocol::{
        AdminLoginRequest, AppointmentPayload, CredentialLoginRequest, ProviderUpsertRequest,
        SignupRequest, VisitRecordPayload,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{error::TransportError, types::FilterRoute, ApiResult, PortalApi};

const NULL_SEGMENT: &str = "null";

pub struct HttpPortalApi {
    http: Client,
    base_url: Url,
    filter_route: FilterRoute,
}

impl HttpPortalApi {
    pub fn new(base_url: Url, filter_route: FilterRoute) -> Self {
        Self {
            http: Client::new(),
            base_url,
            filter_route,
        }
    }

    /// Joins path segments onto the base URL, percent-encoding each one so a
    /// token can travel as a path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::Network(format!("base url cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, TransportError> {
        let url = self.endpoint(segments)?;
        // Tokens travel in path segments and are never logged.
        debug!(%method, resource = segments.first().copied().unwrap_or(""), "portal: upstream request");
        Ok(self.http.request(method, url))
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Value> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice::<Value>(&bytes).ok()
        };

        if status.is_success() {
            return match body {
                Some(value) => Ok(value),
                None if bytes.is_empty() => Ok(Value::Null),
                None => Err(TransportError::Decode(format!(
                    "expected JSON body, got {} bytes",
                    bytes.len()
                ))),
            };
        }

        let message = body
            .as_ref()
            .map(ErrorBody::from_value)
            .and_then(|parsed| parsed.text().map(str::to_string));
        warn!(status = status.as_u16(), "portal: upstream returned non-success status");
        Err(TransportError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> ApiResult<Value> {
        let request = self.request(method, segments)?.json(body);
        self.send(request).await
    }
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn list_providers(&self) -> ApiResult<Value> {
        let request = self.request(Method::GET, &["doctor"])?;
        self.send(request).await
    }

    async fn filter_providers(&self, criteria: &FilterCriteria) -> ApiResult<Value> {
        let request = match &self.filter_route {
            FilterRoute::Query { specialty_key } => {
                let mut params: Vec<(&str, &str)> = Vec::new();
                if let Some(name) = criteria.name.as_deref() {
                    params.push(("name", name));
                }
                if let Some(time) = criteria.time_slot.as_deref() {
                    params.push(("time", time));
                }
                if let Some(specialty) = criteria.specialty.as_deref() {
                    params.push((specialty_key.as_str(), specialty));
                }
                self.request(Method::GET, &["doctor", "filter"])?
                    .query(&params)
            }
            FilterRoute::Path => {
                let segment = |value: &Option<String>| {
                    value.as_deref().unwrap_or(NULL_SEGMENT).to_string()
                };
                let name = segment(&criteria.name);
                let time = segment(&criteria.time_slot);
                let specialty = segment(&criteria.specialty);
                self.request(Method::GET, &["doctor", "filter", &name, &time, &specialty])?
            }
        };
        self.send(request).await
    }

    async fn save_provider(&self, token: &str, provider: &ProviderUpsertRequest) -> ApiResult<Value> {
        self.send_json(Method::POST, &["doctor", token], provider).await
    }

    async fn update_provider(
        &self,
        token: &str,
        provider: &ProviderUpsertRequest,
    ) -> ApiResult<Value> {
        self.send_json(Method::PUT, &["doctor", token], provider).await
    }

    async fn delete_provider(&self, token: &str, id: ProviderId) -> ApiResult<Value> {
        let id = id.to_string();
        let request = self.request(Method::DELETE, &["doctor", &id, token])?;
        self.send(request).await
    }

    async fn admin_login(&self, credentials: &AdminLoginRequest) -> ApiResult<Value> {
        self.send_json(Method::POST, &["admin", "login"], credentials)
            .await
    }

    async fn clinician_login(&self, credentials: &CredentialLoginRequest) -> ApiResult<Value> {
        self.send_json(Method::POST, &["doctor", "login"], credentials)
            .await
    }

    async fn recipient_login(&self, credentials: &CredentialLoginRequest) -> ApiResult<Value> {
        self.send_json(Method::POST, &["patient", "login"], credentials)
            .await
    }

    async fn recipient_signup(&self, signup: &SignupRequest) -> ApiResult<Value> {
        self.send_json(Method::POST, &["patient"], signup).await
    }

    async fn recipient_profile(&self, token: &str) -> ApiResult<Value> {
        let request = self.request(Method::GET, &["patient", token])?;
        self.send(request).await
    }

    async fn recipient_appointments(&self, token: &str, id: RecipientId) -> ApiResult<Value> {
        let id = id.to_string();
        let request = self.request(Method::GET, &["patient", &id, token])?;
        self.send(request).await
    }

    async fn filter_recipient_appointments(
        &self,
        token: &str,
        condition: Option<AppointmentCondition>,
        provider_name: Option<&str>,
    ) -> ApiResult<Value> {
        let condition = condition.map(AppointmentCondition::as_str);
        let request = match &self.filter_route {
            FilterRoute::Query { .. } => {
                let mut params: Vec<(&str, &str)> = Vec::new();
                if let Some(condition) = condition {
                    params.push(("condition", condition));
                }
                if let Some(name) = provider_name {
                    params.push(("name", name));
                }
                params.push(("token", token));
                self.request(Method::GET, &["patient", "filter"])?
                    .query(&params)
            }
            FilterRoute::Path => {
                let condition = condition.unwrap_or(NULL_SEGMENT);
                let name = provider_name.unwrap_or(NULL_SEGMENT);
                self.request(Method::GET, &["patient", "filter", condition, name, token])?
            }
        };
        self.send(request).await
    }

    async fn clinician_appointments(
        &self,
        token: &str,
        date: NaiveDate,
        patient_name: Option<&str>,
    ) -> ApiResult<Value> {
        let date = date.format("%Y-%m-%d").to_string();
        let mut params: Vec<(&str, &str)> = vec![("date", date.as_str())];
        if let Some(name) = patient_name {
            params.push(("patientName", name));
        }
        params.push(("token", token));
        let request = self.request(Method::GET, &["appointments"])?.query(&params);
        self.send(request).await
    }

    async fn book_appointment(&self, token: &str, appointment: &AppointmentPayload) -> ApiResult<Value> {
        self.send_json(Method::POST, &["appointments", token], appointment)
            .await
    }

    async fn update_appointment(
        &self,
        token: &str,
        appointment: &AppointmentPayload,
    ) -> ApiResult<Value> {
        self.send_json(Method::PUT, &["appointments", token], appointment)
            .await
    }

    async fn cancel_appointment(&self, token: &str, id: AppointmentId) -> ApiResult<Value> {
        let id = id.to_string();
        let request = self.request(Method::DELETE, &["appointments", &id, token])?;
        self.send(request).await
    }

    async fn save_visit_record(&self, token: &str, record: &VisitRecordPayload) -> ApiResult<Value> {
        self.send_json(Method::POST, &["prescription", token], record)
            .await
    }

    async fn visit_record(&self, token: &str, appointment_id: AppointmentId) -> ApiResult<Value> {
        let id = appointment_id.to_string();
        let request = self.request(Method::GET, &["prescription", &id, token])?;
        self.send(request).await
    }
}
