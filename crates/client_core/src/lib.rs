use std::sync::Arc;

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
use tokio::sync::broadcast;
use tracing::info;

pub mod appointments;
pub mod auth;
pub mod booking;
pub mod directory;
pub mod error;
pub mod events;
pub mod normalize;
pub mod records;
pub mod role_gate;
pub mod session;
pub mod transport;
pub mod types;

pub use appointments::{AppointmentBoard, AppointmentsView};
pub use auth::{AuthFlow, ModalKind, RefreshHook};
pub use booking::{BookingOverlay, BookingPhase, BookingWorkflow, RecipientIdentity};
pub use directory::{DirectorySearch, DirectoryView, ProviderCard};
pub use error::{ErrorCategory, PortalError, TransportError};
pub use events::{EventSink, UiError, UiErrorContext, UiEvent};
pub use normalize::{ListKind, ListShape, MatchedShape, Normalizer};
pub use records::VisitRecords;
pub use role_gate::{CardAction, HeaderView, NavOption, Page, RoleGate, Route};
pub use session::{Session, SessionStore, SessionView};
pub use transport::HttpPortalApi;
pub use types::{ClientConfig, FilterRoute};

use directory::DirectoryDeps;

const EVENT_CAPACITY: usize = 256;

pub type ApiResult<T> = Result<T, TransportError>;

/// Upstream REST collaborator. Payloads come back as raw JSON so callers can
/// run them through the [`Normalizer`].
#[async_trait]
pub trait PortalApi: Send + Sync {
    async fn list_providers(&self) -> ApiResult<Value>;
    async fn filter_providers(&self, criteria: &FilterCriteria) -> ApiResult<Value>;
    async fn save_provider(&self, token: &str, provider: &ProviderUpsertRequest)
        -> ApiResult<Value>;
    async fn update_provider(
        &self,
        token: &str,
        provider: &ProviderUpsertRequest,
    ) -> ApiResult<Value>;
    async fn delete_provider(&self, token: &str, id: ProviderId) -> ApiResult<Value>;

    async fn admin_login(&self, credentials: &AdminLoginRequest) -> ApiResult<Value>;
    async fn clinician_login(&self, credentials: &CredentialLoginRequest) -> ApiResult<Value>;
    async fn recipient_login(&self, credentials: &CredentialLoginRequest) -> ApiResult<Value>;
    async fn recipient_signup(&self, signup: &SignupRequest) -> ApiResult<Value>;

    async fn recipient_profile(&self, token: &str) -> ApiResult<Value>;
    async fn recipient_appointments(&self, token: &str, id: RecipientId) -> ApiResult<Value>;
    /// The recipient's own appointments narrowed by time and provider name.
    async fn filter_recipient_appointments(
        &self,
        token: &str,
        condition: Option<AppointmentCondition>,
        provider_name: Option<&str>,
    ) -> ApiResult<Value>;
    async fn clinician_appointments(
        &self,
        token: &str,
        date: NaiveDate,
        patient_name: Option<&str>,
    ) -> ApiResult<Value>;
    async fn book_appointment(
        &self,
        token: &str,
        appointment: &AppointmentPayload,
    ) -> ApiResult<Value>;
    async fn update_appointment(
        &self,
        token: &str,
        appointment: &AppointmentPayload,
    ) -> ApiResult<Value>;
    async fn cancel_appointment(&self, token: &str, id: AppointmentId) -> ApiResult<Value>;

    async fn save_visit_record(&self, token: &str, record: &VisitRecordPayload)
        -> ApiResult<Value>;
    async fn visit_record(&self, token: &str, appointment_id: AppointmentId) -> ApiResult<Value>;
}

/// Every portal component wired to one session and one event stream.
pub struct Portal {
    pub session: Arc<SessionStore>,
    pub gate: RoleGate,
    pub auth: Arc<AuthFlow>,
    pub directory: DirectorySearch,
    pub booking: Arc<BookingWorkflow>,
    pub appointments: AppointmentBoard,
    pub records: VisitRecords,
    events: EventSink,
}

impl Portal {
    pub fn new(config: &ClientConfig, session: SessionStore) -> Self {
        let api = Arc::new(HttpPortalApi::new(
            config.api_base_url.clone(),
            config.filter_route.clone(),
        ));
        Self::with_api(api, config, session)
    }

    pub fn with_api(api: Arc<dyn PortalApi>, config: &ClientConfig, session: SessionStore) -> Self {
        let session = Arc::new(session);
        let events = EventSink::new(EVENT_CAPACITY);
        let normalizer = Arc::new(Normalizer::default());
        let gate = RoleGate::new(session.view());
        let identity = Arc::new(RecipientIdentity::new(Arc::clone(&api)));

        let booking = Arc::new(BookingWorkflow::new(
            Arc::clone(&api),
            session.view(),
            events.clone(),
            Arc::clone(&identity),
        ));
        let directory = DirectorySearch::new(
            DirectoryDeps {
                api: Arc::clone(&api),
                normalizer: Arc::clone(&normalizer),
                gate: gate.clone(),
                session: session.view(),
                events: events.clone(),
                booking: Arc::clone(&booking),
            },
            config.debounce,
        );
        let auth = Arc::new(AuthFlow::new(
            Arc::clone(&api),
            Arc::clone(&session),
            events.clone(),
        ));
        auth.set_refresh_hook(Arc::new(directory.clone()));

        let appointments = AppointmentBoard::new(
            Arc::clone(&api),
            Arc::clone(&normalizer),
            session.view(),
            events.clone(),
            identity,
        );
        let records = VisitRecords::new(api, normalizer, session.view(), events.clone());

        info!(api = %config.api_base_url, "portal: components ready");
        Self {
            session,
            gate,
            auth,
            directory,
            booking,
            appointments,
            records,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Renders the header for `page`. Visiting the landing page ends the session.
    pub fn render_header(&self, page: Page) -> HeaderView {
        if page == Page::Landing {
            self.session.visit_landing();
        }
        let header = self.gate.header(page);
        self.events.emit(UiEvent::HeaderRendered(header.clone()));
        header
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
