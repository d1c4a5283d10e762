//! Modal-driven credential submission.
//!
//! Every entry point validates locally, issues exactly one request and never
//! retries. Failures leave the session untouched.

use std::sync::{Arc, OnceLock};

use serde_json::Value;
use shared::{
    domain::{ProviderId, Role},
    protocol::{
        AdminLoginRequest, CredentialLoginRequest, MessageResponse, ProviderUpsertRequest,
        SignupRequest, TokenResponse,
    },
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    error::PortalError,
    events::{EventSink, UiErrorContext, UiEvent},
    role_gate::{route_for_role, Route},
    session::SessionStore,
    ApiResult, PortalApi,
};

pub const MIN_PROVIDER_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const MISSING_USERNAME_OR_PASSWORD: &str = "Please enter username and password";
const MISSING_EMAIL_OR_PASSWORD: &str = "Please enter email and password";
const MISSING_FIELDS: &str = "Please fill all fields.";
const SHORT_PASSWORD: &str = "Password must be at least 6 characters.";
const MISSING_ADMIN_TOKEN: &str =
    "Admin token missing. Please login as admin before adding a doctor.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    AdminLogin,
    ClinicianLogin,
    RecipientLogin,
    RecipientSignup,
    AddProvider,
}

impl ModalKind {
    /// Modal opened by a role-selection button. Unknown labels fall back to
    /// the recipient login.
    pub fn for_role_selection(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "admin" => ModalKind::AdminLogin,
            "doctor" => ModalKind::ClinicianLogin,
            _ => ModalKind::RecipientLogin,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdminLoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct ClinicianLoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecipientLoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderForm {
    pub name: String,
    pub specialty: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub availability: Vec<String>,
}

/// Dependent view refreshed after a successful submission.
pub trait RefreshHook: Send + Sync {
    fn trigger_refresh(&self);
}

fn required(fields: &[&str]) -> bool {
    fields.iter().all(|field| !field.trim().is_empty())
}

fn extract_token(payload: Value) -> Option<String> {
    serde_json::from_value::<TokenResponse>(payload)
        .ok()
        .map(|response| response.token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn server_message(payload: Value) -> Option<String> {
    serde_json::from_value::<MessageResponse>(payload)
        .ok()
        .and_then(|response| response.message)
        .filter(|message| !message.trim().is_empty())
}

pub struct AuthFlow {
    api: Arc<dyn PortalApi>,
    session: Arc<SessionStore>,
    events: EventSink,
    modal: watch::Sender<Option<ModalKind>>,
    refresh: OnceLock<Arc<dyn RefreshHook>>,
}

impl AuthFlow {
    pub fn new(api: Arc<dyn PortalApi>, session: Arc<SessionStore>, events: EventSink) -> Self {
        let (modal, _) = watch::channel(None);
        Self {
            api,
            session,
            events,
            modal,
            refresh: OnceLock::new(),
        }
    }

    /// Registers the view refreshed after success. Only the first hook sticks.
    pub fn set_refresh_hook(&self, hook: Arc<dyn RefreshHook>) {
        if self.refresh.set(hook).is_err() {
            warn!("auth: refresh hook already registered");
        }
    }

    pub fn active_modal(&self) -> Option<ModalKind> {
        *self.modal.borrow()
    }

    pub fn open_modal(&self, kind: ModalKind) {
        self.modal.send_replace(Some(kind));
        self.events.emit(UiEvent::ModalOpened(kind));
    }

    pub fn close_modal(&self) {
        if self.modal.send_replace(None).is_some() {
            self.events.emit(UiEvent::ModalClosed);
        }
    }

    /// Role-selection button: records the chosen role and opens its modal.
    pub fn open_for_role(&self, label: &str) -> ModalKind {
        let kind = ModalKind::for_role_selection(label);
        let role = match kind {
            ModalKind::AdminLogin => Role::Admin,
            ModalKind::ClinicianLogin => Role::Doctor,
            _ => Role::Patient,
        };
        self.session.select_role(role);
        self.open_modal(kind);
        kind
    }

    pub async fn login_admin(&self, form: AdminLoginForm) -> Result<(), PortalError> {
        if !required(&[form.username.as_str(), form.password.as_str()]) {
            return self.reject(UiErrorContext::Login, MISSING_USERNAME_OR_PASSWORD);
        }
        let request = AdminLoginRequest {
            username: form.username.trim().to_string(),
            password: form.password.trim().to_string(),
        };
        let result = self.api.admin_login(&request).await;
        self.complete_login(Role::Admin, result)
    }

    pub async fn login_clinician(&self, form: ClinicianLoginForm) -> Result<(), PortalError> {
        if !required(&[form.email.as_str(), form.password.as_str()]) {
            return self.reject(UiErrorContext::Login, MISSING_EMAIL_OR_PASSWORD);
        }
        let request = CredentialLoginRequest {
            identifier: form.email.trim().to_string(),
            password: form.password.trim().to_string(),
        };
        let result = self.api.clinician_login(&request).await;
        self.complete_login(Role::Doctor, result)
    }

    pub async fn login_recipient(&self, form: RecipientLoginForm) -> Result<(), PortalError> {
        if !required(&[form.email.as_str(), form.password.as_str()]) {
            return self.reject(UiErrorContext::Login, MISSING_EMAIL_OR_PASSWORD);
        }
        let request = CredentialLoginRequest {
            identifier: form.email.trim().to_string(),
            password: form.password.trim().to_string(),
        };
        let result = self.api.recipient_login(&request).await;
        self.complete_login(Role::LoggedPatient, result)
    }

    /// Creates the account only; the recipient still has to log in.
    pub async fn signup_recipient(&self, form: SignupForm) -> Result<(), PortalError> {
        if !required(&[form.name.as_str(), form.email.as_str(), form.password.as_str()]) {
            return self.reject(UiErrorContext::Signup, MISSING_FIELDS);
        }
        let request = SignupRequest {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.trim().to_string(),
            phone: form.phone.trim().to_string(),
            address: form.address.trim().to_string(),
        };
        match self.api.recipient_signup(&request).await {
            Ok(payload) => {
                info!("auth: recipient signup accepted");
                let message = server_message(payload).unwrap_or_else(|| "Signup successful".into());
                self.events.notice(message);
                self.finish();
                Ok(())
            }
            Err(err) => self.fail(UiErrorContext::Signup, PortalError::auth(err, "Signup failed")),
        }
    }

    pub async fn create_provider(&self, form: ProviderForm) -> Result<(), PortalError> {
        if !required(&[
            form.name.as_str(),
            form.specialty.as_str(),
            form.email.as_str(),
            form.password.as_str(),
        ]) {
            return self.reject(UiErrorContext::ProviderAdmin, MISSING_FIELDS);
        }
        if form.password.chars().count() < MIN_PROVIDER_PASSWORD_LEN {
            return self.reject(UiErrorContext::ProviderAdmin, SHORT_PASSWORD);
        }
        let Some(token) = self.admin_token() else {
            return self.reject(UiErrorContext::ProviderAdmin, MISSING_ADMIN_TOKEN);
        };

        let request = ProviderUpsertRequest {
            id: None,
            name: form.name.trim().to_string(),
            specialty: form.specialty.trim().to_string(),
            email: form.email.trim().to_string(),
            password: Some(form.password),
            phone: Some(form.phone.trim().to_string()).filter(|phone| !phone.is_empty()),
            available_times: form.availability,
        };
        match self.api.save_provider(&token, &request).await {
            Ok(payload) => {
                info!("auth: provider created");
                let message =
                    server_message(payload).unwrap_or_else(|| "Doctor added successfully.".into());
                self.events.notice(message);
                self.finish();
                Ok(())
            }
            Err(err) => {
                let fallback = match err.status() {
                    Some(status) => format!("Failed to add doctor (status {status})."),
                    None => "Failed to add doctor.".to_string(),
                };
                self.fail(
                    UiErrorContext::ProviderAdmin,
                    PortalError::server(err, &fallback),
                )
            }
        }
    }

    /// Edits an existing provider. The password is left unchanged when blank.
    pub async fn update_provider(
        &self,
        id: ProviderId,
        form: ProviderForm,
    ) -> Result<(), PortalError> {
        if !required(&[form.name.as_str(), form.specialty.as_str(), form.email.as_str()]) {
            return self.reject(UiErrorContext::ProviderAdmin, MISSING_FIELDS);
        }
        let Some(token) = self.admin_token() else {
            return self.reject(UiErrorContext::ProviderAdmin, MISSING_ADMIN_TOKEN);
        };

        let request = ProviderUpsertRequest {
            id: Some(id),
            name: form.name.trim().to_string(),
            specialty: form.specialty.trim().to_string(),
            email: form.email.trim().to_string(),
            password: Some(form.password).filter(|password| !password.is_empty()),
            phone: Some(form.phone.trim().to_string()).filter(|phone| !phone.is_empty()),
            available_times: form.availability,
        };
        match self.api.update_provider(&token, &request).await {
            Ok(payload) => {
                info!(provider_id = %id, "auth: provider updated");
                let message =
                    server_message(payload).unwrap_or_else(|| "Doctor updated successfully.".into());
                self.events.notice(message);
                self.finish();
                Ok(())
            }
            Err(err) => self.fail(
                UiErrorContext::ProviderAdmin,
                PortalError::server(err, "Failed to update doctor."),
            ),
        }
    }

    pub fn logout(&self) {
        self.session.logout();
        self.close_modal();
        self.events.emit(UiEvent::Navigate(Route::Landing));
    }

    pub fn logout_recipient(&self) {
        self.session.logout_recipient();
        self.events.emit(UiEvent::Navigate(Route::PatientDashboard));
    }

    fn admin_token(&self) -> Option<String> {
        self.session.view().credential_for(Role::Admin)
    }

    fn complete_login(&self, role: Role, result: ApiResult<Value>) -> Result<(), PortalError> {
        let token = match result {
            Ok(payload) => extract_token(payload),
            Err(err) => {
                warn!(role = %role, error = %err, "auth: login failed");
                return self.fail(UiErrorContext::Login, PortalError::auth(err, INVALID_CREDENTIALS));
            }
        };
        let Some(token) = token else {
            warn!(role = %role, "auth: login response carried no token");
            return self.reject_auth(INVALID_CREDENTIALS);
        };

        self.session.establish(role, token.as_str());
        self.finish();
        self.events
            .emit(UiEvent::Navigate(route_for_role(role, Some(&token))));
        Ok(())
    }

    /// Closes the modal, then refreshes the dependent view or reloads.
    fn finish(&self) {
        self.close_modal();
        match self.refresh.get() {
            Some(hook) => hook.trigger_refresh(),
            None => self.events.emit(UiEvent::Reload),
        }
    }

    fn reject(&self, context: UiErrorContext, message: &str) -> Result<(), PortalError> {
        self.fail(context, PortalError::validation(message))
    }

    fn reject_auth(&self, message: &str) -> Result<(), PortalError> {
        self.fail(UiErrorContext::Login, PortalError::Auth(message.to_string()))
    }

    fn fail(&self, context: UiErrorContext, error: PortalError) -> Result<(), PortalError> {
        self.events.error(context, &error);
        Err(error)
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
