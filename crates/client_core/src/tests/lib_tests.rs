use std::collections::BTreeMap;

use super::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use shared::domain::Role;
use tokio::{net::TcpListener, sync::Mutex};
use url::Url;

use crate::{
    auth::{AdminLoginForm, ProviderForm},
    error::NETWORK_ERROR_MESSAGE,
};

#[derive(Clone, Default)]
struct ServerState {
    seen: Arc<Mutex<Vec<String>>>,
}

fn doctors() -> Value {
    json!([
        { "id": 1, "name": "Ada Lovelace", "specialty": "cardiology", "email": "ada@clinic.test",
          "availableTimes": ["09:00-10:00"] },
        { "id": 2, "name": "Ben Carson", "specialty": "neurology", "email": "ben@clinic.test",
          "availability": null }
    ])
}

async fn handle_list(State(state): State<ServerState>) -> Json<Value> {
    state.seen.lock().await.push("GET /doctor".to_string());
    Json(doctors())
}

async fn handle_filter(
    State(state): State<ServerState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    state.seen.lock().await.push(format!("GET /doctor/filter?{query}"));
    Json(json!({ "doctors": [doctors()[0].clone()] }))
}

async fn handle_filter_path(
    State(state): State<ServerState>,
    Path((name, time, specialty)): Path<(String, String, String)>,
) -> Json<Value> {
    state
        .seen
        .lock()
        .await
        .push(format!("GET /doctor/filter/{name}/{time}/{specialty}"));
    Json(json!({ "data": { "doctors": [] } }))
}

async fn handle_admin_login(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen.lock().await.push("POST /admin/login".to_string());
    if body["password"] == "secret" {
        (StatusCode::OK, Json(json!({ "token": "adm/1 x" })))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid username or password" })),
        )
    }
}

async fn handle_delete(
    State(state): State<ServerState>,
    Path((id, token)): Path<(i64, String)>,
) -> Json<Value> {
    state
        .seen
        .lock()
        .await
        .push(format!("DELETE /doctor/{id} token={token}"));
    Json(json!({ "message": "Doctor deleted successfully" }))
}

async fn handle_update(
    State(state): State<ServerState>,
    Path(token): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.seen.lock().await.push(format!(
        "PUT /doctor/{token} id={} password={}",
        body["id"],
        body.get("password").is_some()
    ));
    Json(json!({ "message": "Doctor updated" }))
}

async fn spawn_portal_server() -> anyhow::Result<(Url, ServerState)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/doctor", get(handle_list))
        .route("/doctor/filter", get(handle_filter))
        .route("/doctor/filter/:name/:time/:specialty", get(handle_filter_path))
        .route("/doctor/:key", put(handle_update))
        .route("/doctor/:key/:token", delete(handle_delete))
        .route("/admin/login", post(handle_admin_login))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((Url::parse(&format!("http://{addr}/"))?, state))
}

fn portal_for(base: Url, route: FilterRoute) -> Portal {
    let mut config = ClientConfig::new(base.clone());
    config.filter_route = route.clone();
    Portal::with_api(
        Arc::new(HttpPortalApi::new(base, route)),
        &config,
        SessionStore::default(),
    )
}

#[tokio::test]
async fn admin_login_over_http_establishes_session_and_deletes_with_path_token() -> anyhow::Result<()> {
    let (base, state) = spawn_portal_server().await?;
    let portal = portal_for(base, FilterRoute::default());

    portal
        .auth
        .login_admin(AdminLoginForm {
            username: "admin".into(),
            password: "secret".into(),
        })
        .await?;
    assert_eq!(portal.session.snapshot().role, Role::Admin);
    assert_eq!(portal.session.snapshot().token(), Some("adm/1 x"));

    let view = portal.directory.search(FilterCriteria::default()).await;
    let cards = view.cards();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].actions, vec![CardAction::Delete]);
    assert!(cards[1].provider.availability.is_empty());

    portal
        .directory
        .activate(ProviderId(2), CardAction::Delete)
        .await?;
    portal.directory.settle().await;

    let seen = state.seen.lock().await.clone();
    assert!(seen.contains(&"DELETE /doctor/2 token=adm/1 x".to_string()), "{seen:?}");
    Ok(())
}

#[tokio::test]
async fn provider_update_puts_to_token_path_without_blank_password() -> anyhow::Result<()> {
    let (base, state) = spawn_portal_server().await?;
    let portal = portal_for(base, FilterRoute::default());
    portal
        .auth
        .login_admin(AdminLoginForm {
            username: "admin".into(),
            password: "secret".into(),
        })
        .await?;

    portal
        .auth
        .update_provider(
            ProviderId(2),
            ProviderForm {
                name: "Ben Carson".into(),
                specialty: "neurology".into(),
                email: "ben@clinic.test".into(),
                ..ProviderForm::default()
            },
        )
        .await?;

    let seen = state.seen.lock().await.clone();
    assert!(
        seen.contains(&"PUT /doctor/adm/1 x id=2 password=false".to_string()),
        "{seen:?}"
    );
    Ok(())
}

#[tokio::test]
async fn rejected_login_surfaces_server_text_and_keeps_session() -> anyhow::Result<()> {
    let (base, _state) = spawn_portal_server().await?;
    let portal = portal_for(base, FilterRoute::default());
    let mut events = portal.subscribe_events();

    let err = portal
        .auth
        .login_admin(AdminLoginForm {
            username: "admin".into(),
            password: "wrong".into(),
        })
        .await
        .expect_err("login should be rejected");

    assert_eq!(err, PortalError::Auth("Invalid username or password".into()));
    assert_eq!(portal.session.snapshot(), Session::default());
    let surfaced = test_support::drain(&mut events).into_iter().any(|event| {
        matches!(event, UiEvent::Error(error) if error.requires_reauth()
            && error.message() == "Invalid username or password")
    });
    assert!(surfaced);
    Ok(())
}

#[tokio::test]
async fn query_filter_omits_absent_criteria_and_uses_speciality_key() -> anyhow::Result<()> {
    let (base, state) = spawn_portal_server().await?;
    let portal = portal_for(base, FilterRoute::default());

    let view = portal
        .directory
        .search(FilterCriteria::new(Some("ada"), Some("  "), Some("cardiology")))
        .await;

    assert_eq!(view.cards().len(), 1);
    let seen = state.seen.lock().await.clone();
    assert_eq!(seen, vec!["GET /doctor/filter?name=ada&speciality=cardiology"]);
    Ok(())
}

#[tokio::test]
async fn path_filter_sends_null_segments_and_renders_empty_state() -> anyhow::Result<()> {
    let (base, state) = spawn_portal_server().await?;
    let portal = portal_for(base, FilterRoute::Path);

    let view = portal
        .directory
        .search(FilterCriteria::new(None, Some("AM"), None))
        .await;

    assert_eq!(
        view,
        DirectoryView::Empty {
            message: "No doctors found with the given filters.".into()
        }
    );
    let seen = state.seen.lock().await.clone();
    assert_eq!(seen, vec!["GET /doctor/filter/null/AM/null"]);
    Ok(())
}

#[tokio::test]
async fn unreachable_upstream_reports_generic_network_error() {
    let base = Url::parse("http://127.0.0.1:1/").expect("url");
    let portal = portal_for(base, FilterRoute::default());

    let err = portal
        .auth
        .login_admin(AdminLoginForm {
            username: "admin".into(),
            password: "secret".into(),
        })
        .await
        .expect_err("no server");
    assert_eq!(err, PortalError::Network(NETWORK_ERROR_MESSAGE.into()));
    assert_eq!(portal.session.snapshot().token(), None);

    let view = portal.directory.search(FilterCriteria::default()).await;
    assert!(matches!(view, DirectoryView::Error { .. }));
}

#[tokio::test]
async fn landing_header_clears_session() {
    let store = test_support::logged_in(Role::Doctor, "doc");
    let api = test_support::FakeApi::new();
    let config = ClientConfig::new(Url::parse("http://localhost:8080/").expect("url"));
    let portal = Portal::with_api(api, &config, store);

    assert_eq!(
        portal.render_header(Page::Dashboard).nav,
        vec![NavOption::ProviderHome, NavOption::Logout]
    );
    assert!(portal.render_header(Page::Landing).is_minimal());
    assert_eq!(portal.session.snapshot(), Session::default());
}
