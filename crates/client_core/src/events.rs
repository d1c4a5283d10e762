//! UI events emitted by portal components and the error model they carry.

use shared::domain::ProviderId;
use tokio::sync::broadcast;

use crate::{
    appointments::AppointmentsView,
    auth::ModalKind,
    booking::{BookingOverlay, BookingPhase},
    directory::DirectoryView,
    error::{ErrorCategory, PortalError},
    role_gate::{HeaderView, Route},
};

#[derive(Debug, Clone)]
pub enum UiEvent {
    HeaderRendered(HeaderView),
    ModalOpened(ModalKind),
    ModalClosed,
    Notice(String),
    Error(UiError),
    Navigate(Route),
    Reload,
    DirectoryRendered(DirectoryView),
    ProviderRemoved(ProviderId),
    BookingOverlayOpened(BookingOverlay),
    BookingPhaseChanged(BookingPhase),
    BookingOverlayClosed,
    AppointmentsRendered(AppointmentsView),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    Login,
    Signup,
    ProviderAdmin,
    Directory,
    Booking,
    Appointments,
    VisitRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    category: ErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn new(context: UiErrorContext, error: &PortalError) -> Self {
        Self {
            category: error.category(),
            context,
            message: error.message().to_string(),
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == ErrorCategory::Auth
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Cloneable sender shared by every component.
#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<UiEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: UiEvent) {
        // No subscriber simply means nothing is rendering.
        let _ = self.tx.send(event);
    }

    pub fn notice(&self, message: impl Into<String>) {
        self.emit(UiEvent::Notice(message.into()));
    }

    pub fn error(&self, context: UiErrorContext, error: &PortalError) {
        self.emit(UiEvent::Error(UiError::new(context, error)));
    }
}
