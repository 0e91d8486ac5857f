use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::http::header::{ContentType, LOCATION};
use actix_web::{web, HttpResponse};
use maud::Markup;
use serde::Deserialize;

use crate::config::PortalConfig;
use crate::database::Database;
use crate::error::{PortalError, Result};
use crate::layout::{self, Chrome};
use crate::nav;
use crate::session::{CurrentSession, Role, LANDING_PAGE};

#[derive(Deserialize)]
pub struct LoginForm {
    identifier: String,
    password: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health_check))
        .service(
            web::resource("/{portal}/login")
                .route(web::get().to(login_form))
                .route(web::post().to(login)),
        )
        .route("/{portal}/logout", web::get().to(logout))
        .route("/{portal}/api/badges", web::get().to(badges))
        .route("/{portal}/{page}", web::get().to(portal_page));
}

fn see_other(location: impl Into<String>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((LOCATION, location.into()))
        .finish()
}

fn html_page(markup: Markup) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(markup.into_string())
}

fn session_cookie(config: &PortalConfig, token: &str) -> Cookie<'static> {
    Cookie::build(config.session_cookie.clone(), token.to_string())
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(config.session_ttl_minutes))
        .finish()
}

fn expired_cookie(config: &PortalConfig) -> Cookie<'static> {
    Cookie::build(config.session_cookie.clone(), "")
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .finish()
}

async fn index() -> HttpResponse {
    see_other(Role::Student.landing_path())
}

async fn health_check(db: web::Data<Database>) -> HttpResponse {
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "database": "ok",
        })),
        Err(e) => {
            tracing::warn!("Health check could not reach the database: {}", e);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "degraded",
                "database": "unavailable",
            }))
        }
    }
}

async fn login_form(portal: web::Path<String>, current: CurrentSession) -> Result<HttpResponse> {
    let role: Role = portal.parse()?;
    if current.require(role).is_ok() {
        return Ok(see_other(role.landing_path()));
    }
    Ok(html_page(layout::render_login(role, None, "")))
}

async fn login(
    portal: web::Path<String>,
    form: web::Form<LoginForm>,
    current: CurrentSession,
    db: web::Data<Database>,
    config: web::Data<PortalConfig>,
) -> Result<HttpResponse> {
    let role: Role = portal.parse()?;
    let form = form.into_inner();

    let Some(account) = db.verify_login(role, &form.identifier, &form.password).await? else {
        tracing::warn!("Failed {} login for {:?}", role, form.identifier);
        let message = format!("Invalid {} or password", role.identifier_label().to_lowercase());
        let page = layout::render_login(role, Some(&message), &form.identifier);
        return Ok(HttpResponse::Unauthorized()
            .content_type(ContentType::html())
            .body(page.into_string()));
    };

    // A fresh token on every sign-in.
    if let Some(old) = current.token() {
        if let Err(e) = db.delete_session(old).await {
            tracing::warn!("Could not drop previous session: {}", e);
        }
    }

    let session = db.create_session(&account, config.session_ttl()).await?;
    tracing::info!("{} {} signed in", role, account.id);

    Ok(HttpResponse::SeeOther()
        .cookie(session_cookie(&config, &session.token))
        .insert_header((LOCATION, role.landing_path()))
        .finish())
}

async fn logout(
    portal: web::Path<String>,
    current: CurrentSession,
    db: web::Data<Database>,
    config: web::Data<PortalConfig>,
) -> Result<HttpResponse> {
    let role: Role = portal.parse()?;

    // Only the portal that owns the session may end it.
    if let Some(session) = current.0.as_ref().filter(|s| s.role == role) {
        match db.delete_session(&session.token).await {
            Ok(_) => tracing::info!("Session closed from the {} portal", role),
            Err(e) => tracing::error!("Failed to delete session: {}", e),
        }
    }

    Ok(HttpResponse::SeeOther()
        .cookie(expired_cookie(&config))
        .insert_header((LOCATION, role.login_path()))
        .finish())
}

async fn badges(
    portal: web::Path<String>,
    current: CurrentSession,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let role: Role = portal.parse()?;
    let session = current.require(role)?;
    let counts = db.badge_counts(role, session.subject_id).await;
    Ok(HttpResponse::Ok().json(counts))
}

async fn portal_page(
    path: web::Path<(String, String)>,
    current: CurrentSession,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let (portal, page) = path.into_inner();
    let role: Role = portal.parse()?;
    let session = current.require(role)?;

    if nav::find_page(role, &page).is_none() {
        return Err(PortalError::NotFound {
            resource: role.page_path(&page),
        });
    }

    let chrome = Chrome {
        role,
        page: &page,
        session: &session,
        badges: db.badge_counts(role, session.subject_id).await,
    };

    let content = if page == LANDING_PAGE {
        layout::render_dashboard(&chrome)
    } else {
        layout::render_placeholder(&chrome)
    };

    Ok(html_page(layout::render_page(&chrome, content)))
}
