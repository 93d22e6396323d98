//! Viewer/admin mode switch.
//!
//! This is a presentation gate only: it decides which mutations a session
//! offers. The API server enforces nothing.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminMode {
    Viewer,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    #[error("admin mode is not available: no credential configured")]
    NotConfigured,

    #[error("incorrect admin password")]
    WrongCredential,
}

#[derive(Debug)]
pub struct AdminGate {
    mode: AdminMode,
    credential: Option<SecretString>,
    message: Option<String>,
}

impl AdminGate {
    pub fn new(credential: Option<SecretString>) -> Self {
        Self {
            mode: AdminMode::Viewer,
            credential,
            message: None,
        }
    }

    pub fn mode(&self) -> AdminMode {
        self.mode
    }

    pub fn is_admin(&self) -> bool {
        self.mode == AdminMode::Admin
    }

    /// Inline feedback from the last failed unlock attempt.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn unlock(&mut self, attempt: &str) -> Result<(), AdminError> {
        let Some(credential) = &self.credential else {
            self.message = Some(AdminError::NotConfigured.to_string());
            return Err(AdminError::NotConfigured);
        };

        let matches: bool = attempt
            .as_bytes()
            .ct_eq(credential.expose_secret().as_bytes())
            .into();
        if !matches {
            tracing::debug!("Admin unlock rejected");
            self.message = Some(AdminError::WrongCredential.to_string());
            return Err(AdminError::WrongCredential);
        }

        self.mode = AdminMode::Admin;
        self.message = None;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.mode = AdminMode::Viewer;
        self.message = None;
    }

    /// Admin locks immediately; viewer needs the credential to unlock.
    pub fn toggle(&mut self, attempt: Option<&str>) -> Result<AdminMode, AdminError> {
        match self.mode {
            AdminMode::Admin => self.lock(),
            AdminMode::Viewer => self.unlock(attempt.unwrap_or_default())?,
        }
        Ok(self.mode)
    }
}
