//! Role-scoped UI gating: card actions, header navigation and role routes.

use shared::domain::Role;

use crate::session::{Session, SessionView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardAction {
    Delete,
    LoginPrompt,
    Book,
}

/// The single capability table for provider cards.
pub fn card_actions(role: Role) -> &'static [CardAction] {
    match role {
        Role::Admin => &[CardAction::Delete],
        Role::Anonymous | Role::Patient => &[CardAction::LoginPrompt],
        Role::LoggedPatient => &[CardAction::Book],
        Role::Doctor => &[],
    }
}

/// Capability lookup for a raw stored label; unknown labels get no actions.
pub fn card_actions_for_label(label: &str) -> &'static [CardAction] {
    Role::parse(label).map(card_actions).unwrap_or(&[])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOption {
    AddProvider,
    ProviderHome,
    Login,
    SignUp,
    Home,
    Appointments,
    Logout,
    Landing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Landing,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
    pub nav: Vec<NavOption>,
}

impl HeaderView {
    /// Logo only, no navigation.
    pub fn minimal() -> Self {
        Self { nav: Vec::new() }
    }

    pub fn is_minimal(&self) -> bool {
        self.nav.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    AdminDashboard { token: String },
    PublicAdminDashboard,
    DoctorDashboard { token: String },
    PublicDoctorDashboard,
    PatientDashboard,
    LoggedPatientDashboard,
    PatientAppointments,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::AdminDashboard { token } => format!("/adminDashboard/{token}"),
            Route::PublicAdminDashboard => "/pages/adminDashboard.html".to_string(),
            Route::DoctorDashboard { token } => format!("/doctorDashboard/{token}"),
            Route::PublicDoctorDashboard => "/pages/doctorDashboard.html".to_string(),
            Route::PatientDashboard => "/pages/patientDashboard.html".to_string(),
            Route::LoggedPatientDashboard => "/pages/loggedPatientDashboard.html".to_string(),
            Route::PatientAppointments => "/pages/patientAppointments.html".to_string(),
        }
    }
}

pub fn header_for(session: &Session, page: Page) -> HeaderView {
    if page == Page::Landing {
        return HeaderView::minimal();
    }
    // Credentialed role with no token: show the bare header instead of redirecting.
    if session.role.requires_token() && session.token.is_none() {
        return HeaderView::minimal();
    }
    let nav = match session.role {
        Role::Admin => vec![NavOption::AddProvider, NavOption::Logout],
        Role::Doctor => vec![NavOption::ProviderHome, NavOption::Logout],
        Role::Patient => vec![NavOption::Login, NavOption::SignUp],
        Role::LoggedPatient => vec![
            NavOption::Home,
            NavOption::Appointments,
            NavOption::Logout,
        ],
        Role::Anonymous => vec![NavOption::Landing],
    };
    HeaderView { nav }
}

/// Where selecting `role` leads. Token-carrying dashboards are only used
/// when a token exists.
pub fn route_for_role(role: Role, token: Option<&str>) -> Route {
    match (role, token) {
        (Role::Admin, Some(token)) => Route::AdminDashboard {
            token: token.to_string(),
        },
        (Role::Admin, None) => Route::PublicAdminDashboard,
        (Role::Doctor, Some(token)) => Route::DoctorDashboard {
            token: token.to_string(),
        },
        (Role::Doctor, None) => Route::PublicDoctorDashboard,
        (Role::LoggedPatient, Some(_)) => Route::LoggedPatientDashboard,
        (Role::LoggedPatient, None) | (Role::Patient, _) => Route::PatientDashboard,
        (Role::Anonymous, _) => Route::Landing,
    }
}

/// Read-only gate over the live session.
#[derive(Clone)]
pub struct RoleGate {
    session: SessionView,
}

impl RoleGate {
    pub fn new(session: SessionView) -> Self {
        Self { session }
    }

    pub fn card_actions(&self) -> &'static [CardAction] {
        card_actions(self.session.effective_role())
    }

    pub fn allows(&self, action: CardAction) -> bool {
        self.card_actions().contains(&action)
    }

    pub fn header(&self, page: Page) -> HeaderView {
        header_for(&self.session.snapshot(), page)
    }

    pub fn route(&self) -> Route {
        let session = self.session.snapshot();
        route_for_role(session.role, session.token())
    }
}

#[cfg(test)]
#[path = "tests/role_gate_tests.rs"]
mod tests;
