use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::*;
use crate::{
    error::{ErrorCategory, NETWORK_ERROR_MESSAGE},
    test_support::{drain, logged_in, network_down, rejected, FakeApi},
};

#[derive(Default)]
struct CountingRefresh {
    hits: AtomicUsize,
}

impl RefreshHook for CountingRefresh {
    fn trigger_refresh(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

fn flow(api: Arc<FakeApi>, store: SessionStore) -> (AuthFlow, Arc<SessionStore>, EventSink) {
    let store = Arc::new(store);
    let events = EventSink::new(64);
    let flow = AuthFlow::new(api, Arc::clone(&store), events.clone());
    (flow, store, events)
}

fn provider_form(password: &str) -> ProviderForm {
    ProviderForm {
        name: "Dr. Grey".into(),
        specialty: "surgery".into(),
        email: "grey@clinic.test".into(),
        password: password.into(),
        phone: String::new(),
        availability: vec!["09:00-10:00".into()],
    }
}

#[tokio::test]
async fn five_character_provider_password_is_rejected_without_a_request() {
    let api = FakeApi::new();
    let (flow, _store, _events) = flow(api.clone(), logged_in(Role::Admin, "adm"));

    let err = flow
        .create_provider(provider_form("12345"))
        .await
        .expect_err("too short");

    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(err.message(), "Password must be at least 6 characters.");
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn six_character_provider_password_proceeds_with_admin_token() {
    let api = FakeApi::new();
    api.respond("save_provider", Ok(json!({ "message": "Doctor added" })));
    let (flow, _store, events) = flow(api.clone(), logged_in(Role::Admin, "adm"));
    let mut rx = events.subscribe();

    flow.create_provider(provider_form("123456"))
        .await
        .expect("created");

    let calls = api.calls("save_provider");
    assert_eq!(calls.len(), 1);
    assert!(calls[0].detail.starts_with("adm "));
    assert!(calls[0].detail.contains("\"availableTimes\":[\"09:00-10:00\"]"));
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|event| matches!(event, UiEvent::Notice(text) if text == "Doctor added")));
    // No refresh hook registered: full reload.
    assert!(events.iter().any(|event| matches!(event, UiEvent::Reload)));
}

#[tokio::test]
async fn provider_creation_requires_admin_token() {
    let api = FakeApi::new();
    let (flow, _store, _events) = flow(api.clone(), SessionStore::default());

    let err = flow
        .create_provider(provider_form("longenough"))
        .await
        .expect_err("no admin");
    assert!(err.message().starts_with("Admin token missing"));
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn empty_login_fields_never_reach_the_network() {
    let api = FakeApi::new();
    let (flow, store, _events) = flow(api.clone(), SessionStore::default());

    let err = flow
        .login_clinician(ClinicianLoginForm {
            email: "  ".into(),
            password: "pw".into(),
        })
        .await
        .expect_err("blank email");
    assert_eq!(err, PortalError::Validation("Please enter email and password".into()));
    assert_eq!(api.total_calls(), 0);
    assert_eq!(store.snapshot().token(), None);
}

#[tokio::test]
async fn recipient_login_writes_token_closes_modal_and_refreshes() {
    let api = FakeApi::new();
    api.respond("recipient_login", Ok(json!({ "token": "pat-1" })));
    let (flow, store, events) = flow(api.clone(), SessionStore::default());
    let refresh = Arc::new(CountingRefresh::default());
    flow.set_refresh_hook(refresh.clone());
    let mut rx = events.subscribe();

    assert_eq!(flow.open_for_role("patient"), ModalKind::RecipientLogin);
    flow.login_recipient(RecipientLoginForm {
        email: "jo@example.test".into(),
        password: "pw".into(),
    })
    .await
    .expect("login");

    assert_eq!(store.snapshot().role, Role::LoggedPatient);
    assert_eq!(store.snapshot().token(), Some("pat-1"));
    assert_eq!(flow.active_modal(), None);
    assert_eq!(refresh.hits.load(Ordering::SeqCst), 1);
    assert_eq!(api.call_count("recipient_login"), 1);

    let events = drain(&mut rx);
    assert!(events.iter().any(|event| matches!(event, UiEvent::ModalClosed)));
    assert!(!events.iter().any(|event| matches!(event, UiEvent::Reload)));
}

#[tokio::test]
async fn network_failure_shows_generic_text_and_leaves_session() {
    let api = FakeApi::new();
    api.respond("clinician_login", Err(network_down()));
    let (flow, store, _events) = flow(api.clone(), SessionStore::default());
    flow.open_for_role("doctor");

    let err = flow
        .login_clinician(ClinicianLoginForm {
            email: "doc@clinic.test".into(),
            password: "pw".into(),
        })
        .await
        .expect_err("offline");

    assert_eq!(err, PortalError::Network(NETWORK_ERROR_MESSAGE.into()));
    assert_eq!(store.snapshot().role, Role::Doctor);
    assert_eq!(store.snapshot().token(), None);
    assert_eq!(flow.active_modal(), Some(ModalKind::ClinicianLogin));
    assert_eq!(api.call_count("clinician_login"), 1);
}

#[tokio::test]
async fn rejection_without_message_falls_back_to_invalid_credentials() {
    let api = FakeApi::new();
    api.respond(
        "admin_login",
        Err(crate::error::TransportError::Rejected {
            status: 401,
            message: None,
        }),
    );
    let (flow, _store, _events) = flow(api.clone(), SessionStore::default());

    let err = flow
        .login_admin(AdminLoginForm {
            username: "admin".into(),
            password: "nope".into(),
        })
        .await
        .expect_err("rejected");
    assert_eq!(err, PortalError::Auth("Invalid credentials".into()));
}

#[tokio::test]
async fn signup_surfaces_server_message_and_writes_no_token() {
    let api = FakeApi::new();
    api.respond("recipient_signup", Err(rejected(409, "Patient already exists")));
    let (flow, store, _events) = flow(api.clone(), SessionStore::default());

    let form = SignupForm {
        name: "Jo".into(),
        email: "jo@example.test".into(),
        password: "secret".into(),
        ..SignupForm::default()
    };
    let err = flow.signup_recipient(form.clone()).await.expect_err("dupe");
    assert_eq!(err.message(), "Patient already exists");

    api.respond("recipient_signup", Ok(json!({ "message": "Signup successful" })));
    flow.signup_recipient(form).await.expect("signup");
    assert_eq!(store.snapshot().token(), None);
}

#[tokio::test]
async fn logout_clears_token_and_navigates_to_landing() {
    let api = FakeApi::new();
    let (flow, store, events) = flow(api, logged_in(Role::Admin, "adm"));
    let mut rx = events.subscribe();

    flow.logout();

    assert_eq!(store.snapshot().token(), None);
    assert_eq!(store.snapshot().effective_role(), Role::Anonymous);
    assert!(drain(&mut rx)
        .iter()
        .any(|event| matches!(event, UiEvent::Navigate(Route::Landing))));
}

#[test]
fn role_buttons_map_to_modals() {
    assert_eq!(ModalKind::for_role_selection("Admin"), ModalKind::AdminLogin);
    assert_eq!(ModalKind::for_role_selection("doctor"), ModalKind::ClinicianLogin);
    assert_eq!(ModalKind::for_role_selection("patient"), ModalKind::RecipientLogin);
    assert_eq!(ModalKind::for_role_selection("visitor"), ModalKind::RecipientLogin);
}

#[tokio::test]
async fn provider_update_needs_admin_token() {
    let api = FakeApi::new();
    let (flow, _store, _events) = flow(api.clone(), logged_in(Role::Doctor, "doc"));

    let err = flow
        .update_provider(ProviderId(4), provider_form(""))
        .await
        .expect_err("doctor cannot edit");
    assert!(err.message().starts_with("Admin token missing"));
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn provider_update_omits_blank_password_and_surfaces_server_text() {
    let api = FakeApi::new();
    api.respond("update_provider", Ok(json!({ "message": "Doctor updated" })));
    let (flow, _store, events) = flow(api.clone(), logged_in(Role::Admin, "adm"));
    let mut rx = events.subscribe();

    flow.update_provider(ProviderId(4), provider_form(""))
        .await
        .expect("updated");

    let calls = api.calls("update_provider");
    assert_eq!(calls.len(), 1);
    assert!(calls[0].detail.starts_with("adm "));
    assert!(calls[0].detail.contains("\"id\":4"));
    assert!(!calls[0].detail.contains("password"));
    assert!(drain(&mut rx)
        .iter()
        .any(|event| matches!(event, UiEvent::Notice(text) if text == "Doctor updated")));

    api.respond("update_provider", Err(rejected(404, "Doctor not found")));
    let err = flow
        .update_provider(ProviderId(99), provider_form("newpass"))
        .await
        .expect_err("missing");
    assert_eq!(err.message(), "Doctor not found");
    assert!(api.calls("update_provider")[1]
        .detail
        .contains("\"password\":\"newpass\""));
}
