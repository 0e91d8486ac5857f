use actix_web::http::header::{ContentType, LOCATION};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::session::Role;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Login required for the {0} portal")]
    LoginRequired(Role),

    #[error("Not found: {resource}")]
    NotFound { resource: String },
}

impl From<argon2::password_hash::Error> for PortalError {
    fn from(err: argon2::password_hash::Error) -> Self {
        PortalError::PasswordHash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;

impl ResponseError for PortalError {
    fn status_code(&self) -> StatusCode {
        match self {
            PortalError::LoginRequired(_) => StatusCode::SEE_OTHER,
            PortalError::NotFound { .. } => StatusCode::NOT_FOUND,
            PortalError::Database(_) | PortalError::PasswordHash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            PortalError::LoginRequired(role) => HttpResponse::SeeOther()
                .insert_header((LOCATION, role.login_path()))
                .finish(),
            PortalError::NotFound { resource } => HttpResponse::NotFound()
                .content_type(ContentType::plaintext())
                .body(format!("Not found: {}", resource)),
            other => {
                tracing::error!("Request failed: {}", other);
                HttpResponse::build(self.status_code())
                    .content_type(ContentType::plaintext())
                    .body("Something went wrong. Please try again later.")
            }
        }
    }
}
