use std::fmt;
use std::str::FromStr;

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{DateTime, Utc};
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::PortalConfig;
use crate::database::Database;
use crate::error::PortalError;

pub const LANDING_PAGE: &str = "dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Student => "/student",
        }
    }

    pub fn login_path(&self) -> String {
        format!("{}/login", self.prefix())
    }

    pub fn logout_path(&self) -> String {
        format!("{}/logout", self.prefix())
    }

    pub fn page_path(&self, page: &str) -> String {
        format!("{}/{}", self.prefix(), page)
    }

    pub fn landing_path(&self) -> String {
        self.page_path(LANDING_PAGE)
    }

    pub fn portal_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin Portal",
            Role::Student => "Student Portal",
        }
    }

    /// Label of the login identifier field.
    pub fn identifier_label(&self) -> &'static str {
        match self {
            Role::Admin => "Username",
            Role::Student => "Email",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            other => Err(PortalError::NotFound {
                resource: format!("portal {}", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub subject_id: i64,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The session attached to the request, if any.
///
/// Extraction never fails. A lookup error is logged and treated as an
/// anonymous request so the guard redirects to the login page.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    pub fn require(self, role: Role) -> Result<Session, PortalError> {
        match self.0 {
            Some(session) if session.role == role => Ok(session),
            Some(session) => {
                tracing::info!(
                    "{} session {} refused by the {} portal",
                    session.role,
                    session.subject_id,
                    role
                );
                Err(PortalError::LoginRequired(role))
            }
            None => Err(PortalError::LoginRequired(role)),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_ref().map(|s| s.token.as_str())
    }
}

impl FromRequest for CurrentSession {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let db = req.app_data::<web::Data<Database>>().cloned();
        let token = req
            .app_data::<web::Data<PortalConfig>>()
            .and_then(|config| req.cookie(&config.session_cookie))
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty());

        Box::pin(async move {
            let (Some(db), Some(token)) = (db, token) else {
                return Ok(CurrentSession(None));
            };

            match db.find_session(&token).await {
                Ok(session) => Ok(CurrentSession(session)),
                Err(e) => {
                    tracing::error!("Session lookup failed: {}", e);
                    Ok(CurrentSession(None))
                }
            }
        })
    }
}
