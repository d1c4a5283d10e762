//! Process-wide session: current role plus opaque credential token.
//!
//! `SessionStore` is the only writer. Everything else holds a read-only
//! [`SessionView`]; writes are visible to every view immediately and
//! concurrent writers simply overwrite each other.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use shared::domain::Role;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::SessionFileError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Session {
    /// Role as renders must treat it: a credentialed role without a token
    /// falls back to its public variant.
    pub fn effective_role(&self) -> Role {
        if self.role.requires_token() && self.token.is_none() {
            self.role.public_variant()
        } else {
            self.role
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Drops a token stored under a public role.
    fn sanitized(mut self) -> Self {
        if !self.role.requires_token() {
            self.token = None;
        }
        self
    }

    /// Token backing `role`, if that is the role currently in effect.
    pub fn credential_for(&self, role: Role) -> Option<&str> {
        if self.effective_role() == role {
            self.token()
        } else {
            None
        }
    }
}

pub struct SessionStore {
    tx: watch::Sender<Session>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Session::default())
    }
}

impl SessionStore {
    pub fn new(initial: Session) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Switching to a public role drops any token.
    pub fn set_role(&self, role: Role) {
        info!(role = %role, "session: role set");
        self.tx.send_modify(|session| {
            session.role = role;
            if !role.requires_token() {
                session.token = None;
            }
        });
    }

    /// Ignored while the current role is a public one.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let accepted = self.tx.send_if_modified(|session| {
            if !session.role.requires_token() {
                return false;
            }
            session.token = Some(token);
            true
        });
        if !accepted {
            warn!("session: token ignored for public role");
        }
    }

    pub fn clear(&self) {
        info!("session: cleared");
        self.tx.send_replace(Session::default());
    }

    /// First role selection on the landing page.
    pub fn select_role(&self, role: Role) {
        self.set_role(role);
    }

    /// Writes role and token together after a successful credential check.
    pub fn establish(&self, role: Role, token: impl Into<String>) {
        let token = token.into();
        info!(role = %role, "session: authenticated");
        self.tx.send_replace(Session {
            role,
            token: Some(token),
        });
    }

    pub fn logout(&self) {
        self.clear();
    }

    /// Recipient logout keeps the visitor on the public recipient pages.
    pub fn logout_recipient(&self) {
        info!("session: recipient logged out");
        self.tx.send_replace(Session {
            role: Role::Patient,
            token: None,
        });
    }

    pub fn visit_landing(&self) {
        self.clear();
    }

    /// Restores a session saved by [`SessionStore::save`]. A missing file
    /// yields an anonymous session.
    pub fn load(path: &Path) -> Result<Self, SessionFileError> {
        let session = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<Session>(&raw)?.sanitized(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Session::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self::new(session))
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionFileError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, raw)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SessionView {
    rx: watch::Receiver<Session>,
}

impl SessionView {
    pub fn snapshot(&self) -> Session {
        self.rx.borrow().clone()
    }

    pub fn effective_role(&self) -> Role {
        self.rx.borrow().effective_role()
    }

    pub fn credential_for(&self, role: Role) -> Option<String> {
        self.rx.borrow().credential_for(role).map(str::to_string)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
