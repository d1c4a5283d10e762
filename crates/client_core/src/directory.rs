//! Provider directory: debounced filtering, render states and card actions.
//!
//! Every effective criteria change issues one request. A newer request aborts
//! the one in flight, and results are applied only when their generation is
//! still the latest, so the last request always wins.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use shared::domain::{FilterCriteria, Provider, ProviderId, Role};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    auth::RefreshHook,
    booking::BookingWorkflow,
    error::PortalError,
    events::{EventSink, UiErrorContext, UiEvent},
    normalize::Normalizer,
    role_gate::{CardAction, RoleGate},
    session::SessionView,
    PortalApi,
};

const NO_PROVIDERS: &str = "No doctors found.";
const NO_MATCHING_PROVIDERS: &str = "No doctors found with the given filters.";
const LOAD_FAILED: &str = "Failed to load doctors. Please try again.";
const FILTER_FAILED: &str = "Error applying filters.";
const LOGIN_FIRST: &str = "Patient needs to login first.";
const DELETED: &str = "Doctor deleted successfully.";
const DELETE_FAILED: &str = "Failed to delete doctor. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCard {
    pub provider: Provider,
    pub actions: Vec<CardAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryView {
    Loading,
    Populated(Vec<ProviderCard>),
    Empty { message: String },
    Error { message: String },
}

impl DirectoryView {
    pub fn cards(&self) -> &[ProviderCard] {
        match self {
            DirectoryView::Populated(cards) => cards,
            _ => &[],
        }
    }
}

struct DirectoryInner {
    api: Arc<dyn PortalApi>,
    normalizer: Arc<Normalizer>,
    gate: RoleGate,
    session: SessionView,
    events: EventSink,
    booking: Arc<BookingWorkflow>,
    debounce: Duration,
    criteria: watch::Sender<FilterCriteria>,
    view: watch::Sender<DirectoryView>,
    generation: AtomicU64,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    pending_input: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct DirectorySearch {
    inner: Arc<DirectoryInner>,
}

pub struct DirectoryDeps {
    pub api: Arc<dyn PortalApi>,
    pub normalizer: Arc<Normalizer>,
    pub gate: RoleGate,
    pub session: SessionView,
    pub events: EventSink,
    pub booking: Arc<BookingWorkflow>,
}

impl DirectorySearch {
    pub fn new(deps: DirectoryDeps, debounce: Duration) -> Self {
        let (criteria, _) = watch::channel(FilterCriteria::default());
        let (view, _) = watch::channel(DirectoryView::Loading);
        Self {
            inner: Arc::new(DirectoryInner {
                api: deps.api,
                normalizer: deps.normalizer,
                gate: deps.gate,
                session: deps.session,
                events: deps.events,
                booking: deps.booking,
                debounce,
                criteria,
                view,
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                pending_input: Mutex::new(None),
            }),
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.inner.criteria.borrow().clone()
    }

    pub fn current_view(&self) -> DirectoryView {
        self.inner.view.borrow().clone()
    }

    /// Free-text name input. Restarts the debounce timer on every call.
    pub fn on_name_input(&self, text: &str) {
        let name = Some(text);
        self.inner
            .criteria
            .send_modify(|criteria| *criteria = criteria.clone().with_name(name));

        let this = self.clone();
        let delay = self.inner.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.dispatch();
        });
        if let Some(previous) = lock(&self.inner.pending_input).replace(timer) {
            previous.abort();
        }
    }

    pub fn on_time_slot_change(&self, value: &str) {
        let value = Some(value);
        self.inner
            .criteria
            .send_modify(|criteria| *criteria = criteria.clone().with_time_slot(value));
        self.apply_now();
    }

    pub fn on_specialty_change(&self, value: &str) {
        let value = Some(value);
        self.inner
            .criteria
            .send_modify(|criteria| *criteria = criteria.clone().with_specialty(value));
        self.apply_now();
    }

    /// Re-fetches with the current criteria. The request is registered before
    /// this returns, so a following [`settle`](Self::settle) waits for it.
    pub fn refresh(&self) {
        self.apply_now();
    }

    /// Replaces the criteria and fetches inline, returning what was rendered.
    pub async fn search(&self, criteria: FilterCriteria) -> DirectoryView {
        self.cancel_pending_input();
        self.inner.criteria.send_replace(criteria.clone());
        let generation = {
            let mut in_flight = lock(&self.inner.in_flight);
            if let Some(previous) = in_flight.take() {
                previous.abort();
            }
            self.next_generation()
        };
        let view = self.fetch(&criteria).await;
        self.apply(generation, view.clone());
        view
    }

    /// Waits for the pending debounce timer and the in-flight request.
    pub async fn settle(&self) {
        let pending = lock(&self.inner.pending_input).take();
        if let Some(timer) = pending {
            let _ = timer.await;
        }
        let in_flight = lock(&self.inner.in_flight).take();
        if let Some(request) = in_flight {
            let _ = request.await;
        }
    }

    /// Card action activation, gated on the current role.
    pub async fn activate(&self, provider_id: ProviderId, action: CardAction) -> Result<(), PortalError> {
        if !self.inner.gate.allows(action) {
            let err = PortalError::validation("This action is not available for your role.");
            self.inner.events.error(UiErrorContext::Directory, &err);
            return Err(err);
        }
        match action {
            CardAction::LoginPrompt => {
                self.inner.events.notice(LOGIN_FIRST);
                Ok(())
            }
            CardAction::Delete => self.delete(provider_id).await,
            CardAction::Book => {
                let Some(provider) = self.find(provider_id) else {
                    let err = PortalError::validation(format!("Doctor {provider_id} is not listed."));
                    self.inner.events.error(UiErrorContext::Directory, &err);
                    return Err(err);
                };
                self.inner.booking.begin(provider).await
            }
        }
    }

    fn find(&self, provider_id: ProviderId) -> Option<Provider> {
        self.inner
            .view
            .borrow()
            .cards()
            .iter()
            .find(|card| card.provider.id == provider_id)
            .map(|card| card.provider.clone())
    }

    async fn delete(&self, provider_id: ProviderId) -> Result<(), PortalError> {
        let Some(token) = self.inner.session.credential_for(Role::Admin) else {
            let err = PortalError::Auth("Session expired. Please log in again.".to_string());
            self.inner.events.error(UiErrorContext::ProviderAdmin, &err);
            return Err(err);
        };
        match self.inner.api.delete_provider(&token, provider_id).await {
            Ok(_) => {
                info!(provider_id = %provider_id, "directory: provider deleted");
                self.inner.events.notice(DELETED);
                self.inner.events.emit(UiEvent::ProviderRemoved(provider_id));
                self.refresh();
                Ok(())
            }
            Err(err) => {
                warn!(provider_id = %provider_id, error = %err, "directory: delete failed");
                let err = PortalError::server(err, DELETE_FAILED);
                self.inner.events.error(UiErrorContext::ProviderAdmin, &err);
                Err(err)
            }
        }
    }

    fn cancel_pending_input(&self) {
        if let Some(timer) = lock(&self.inner.pending_input).take() {
            timer.abort();
        }
    }

    fn apply_now(&self) {
        // A pending name change rides along with this request.
        self.cancel_pending_input();
        self.dispatch();
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Bumps the generation and swaps the in-flight task under one lock, so
    /// the stored task always carries the latest generation.
    fn dispatch(&self) {
        let criteria = self.criteria();
        let mut in_flight = lock(&self.inner.in_flight);
        let generation = self.next_generation();
        debug!(generation, "directory: dispatching provider request");

        let this = self.clone();
        let request = tokio::spawn(async move {
            let view = this.fetch(&criteria).await;
            this.apply(generation, view);
        });
        if let Some(previous) = in_flight.replace(request) {
            previous.abort();
        }
    }

    async fn fetch(&self, criteria: &FilterCriteria) -> DirectoryView {
        let filtered = !criteria.is_empty();
        let result = if filtered {
            self.inner.api.filter_providers(criteria).await
        } else {
            self.inner.api.list_providers().await
        };

        match result {
            Ok(payload) => {
                let providers = self.inner.normalizer.providers(&payload).items;
                if providers.is_empty() {
                    let message = if filtered { NO_MATCHING_PROVIDERS } else { NO_PROVIDERS };
                    return DirectoryView::Empty {
                        message: message.to_string(),
                    };
                }
                let actions = self.inner.gate.card_actions().to_vec();
                DirectoryView::Populated(
                    providers
                        .into_iter()
                        .map(|provider| ProviderCard {
                            provider,
                            actions: actions.clone(),
                        })
                        .collect(),
                )
            }
            Err(err) => {
                warn!(error = %err, "directory: provider request failed");
                let fallback = if filtered { FILTER_FAILED } else { LOAD_FAILED };
                DirectoryView::Error {
                    message: PortalError::server(err, fallback).message().to_string(),
                }
            }
        }
    }

    fn apply(&self, generation: u64, view: DirectoryView) {
        let latest = self.inner.generation.load(Ordering::SeqCst);
        if generation != latest {
            debug!(generation, latest, "directory: dropping superseded result");
            return;
        }
        self.inner.view.send_replace(view.clone());
        self.inner.events.emit(UiEvent::DirectoryRendered(view));
    }
}

impl RefreshHook for DirectorySearch {
    fn trigger_refresh(&self) {
        self.refresh();
    }
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
