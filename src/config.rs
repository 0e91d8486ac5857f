use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub session_cookie: String,
    pub session_ttl_minutes: i64,
    pub secure_cookies: bool,
    pub sweep_interval_secs: u64,
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAdmin {
    pub username: String,
    pub password: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite://lms_portal.db?mode=rwc".to_string(),
            session_cookie: "lms_session".to_string(),
            session_ttl_minutes: 120,
            secure_cookies: false,
            sweep_interval_secs: 300,
            seed_admin: None,
        }
    }
}

impl PortalConfig {
    /// Defaults, overridden by `.env` and then the process environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("PORTAL_HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("PORTAL_PORT").or_else(|| lookup("PORT")) {
            config.port = port.parse()?;
        }

        if let Some(database_url) = lookup("DATABASE_URL") {
            config.database_url = database_url;
        }

        if let Some(cookie) = lookup("PORTAL_SESSION_COOKIE") {
            if cookie.trim().is_empty() {
                anyhow::bail!("PORTAL_SESSION_COOKIE must not be empty");
            }
            config.session_cookie = cookie;
        }

        if let Some(ttl) = lookup("PORTAL_SESSION_TTL_MINUTES") {
            config.session_ttl_minutes = ttl.parse()?;
            if config.session_ttl_minutes <= 0 {
                anyhow::bail!("PORTAL_SESSION_TTL_MINUTES must be positive");
            }
        }

        if let Some(secure) = lookup("PORTAL_SECURE_COOKIES") {
            config.secure_cookies = parse_flag(&secure)?;
        }

        if let Some(interval) = lookup("PORTAL_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = interval.parse()?;
        }

        if let (Some(username), Some(password)) = (
            lookup("PORTAL_ADMIN_USERNAME"),
            lookup("PORTAL_ADMIN_PASSWORD"),
        ) {
            config.seed_admin = Some(SeedAdmin { username, password });
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("invalid boolean flag: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = PortalConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.session_cookie, "lms_session");
        assert!(!config.secure_cookies);
        assert!(config.seed_admin.is_none());
    }

    #[test]
    fn port_falls_back_to_generic_variable() {
        let config = PortalConfig::from_lookup(lookup_from(&[("PORT", "9000")])).unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn seed_admin_needs_both_variables() {
        let config =
            PortalConfig::from_lookup(lookup_from(&[("PORTAL_ADMIN_USERNAME", "root")])).unwrap();
        assert!(config.seed_admin.is_none());

        let config = PortalConfig::from_lookup(lookup_from(&[
            ("PORTAL_ADMIN_USERNAME", "root"),
            ("PORTAL_ADMIN_PASSWORD", "hunter2"),
        ]))
        .unwrap();
        assert_eq!(config.seed_admin.unwrap().username, "root");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(PortalConfig::from_lookup(lookup_from(&[("PORTAL_PORT", "eighty")])).is_err());
        assert!(
            PortalConfig::from_lookup(lookup_from(&[("PORTAL_SESSION_TTL_MINUTES", "0")])).is_err()
        );
        assert!(PortalConfig::from_lookup(lookup_from(&[("PORTAL_SECURE_COOKIES", "maybe")])).is_err());
    }

    #[test]
    fn secure_flag_accepts_common_spellings() {
        let config =
            PortalConfig::from_lookup(lookup_from(&[("PORTAL_SECURE_COOKIES", "YES")])).unwrap();
        assert!(config.secure_cookies);
    }
}
