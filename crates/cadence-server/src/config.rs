use std::path::PathBuf;

use anyhow::{Context, bail};
use cadence_api::mailer::SmtpSettings;

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone, PartialEq)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_ttl_days: i64,
    pub client_url: String,
    /// `None` sends mail to the log.
    pub smtp: Option<SmtpSettings>,
    pub google: Option<GoogleCredentials>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("CADENCE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CADENCE_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = get("CADENCE_PORT")
            .unwrap_or_else(|| "3001".into())
            .parse()
            .context("CADENCE_PORT must be a port number")?;

        let jwt_ttl_days: i64 = match get("CADENCE_JWT_TTL_DAYS") {
            Some(v) => v.parse().context("CADENCE_JWT_TTL_DAYS must be a whole number")?,
            None => 7,
        };
        if jwt_ttl_days <= 0 {
            bail!("CADENCE_JWT_TTL_DAYS must be positive");
        }

        let google = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleCredentials {
                client_id,
                client_secret,
                callback_url: get("GOOGLE_CALLBACK_URL").unwrap_or_else(|| {
                    format!("http://localhost:{}/api/auth/google/callback", port)
                }),
            }),
            (None, None) => None,
            _ => bail!("GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set together"),
        };

        let smtp = match (get("EMAIL_USER"), get("EMAIL_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpSettings {
                host: get("EMAIL_HOST").context("EMAIL_HOST is required with EMAIL_USER")?,
                port: get("EMAIL_PORT")
                    .unwrap_or_else(|| "587".into())
                    .parse()
                    .context("EMAIL_PORT must be a port number")?,
                username,
                password,
                from: get("EMAIL_FROM").unwrap_or_else(|| "Cadence <no-reply@cadence.local>".into()),
            }),
            (None, None) => None,
            _ => bail!("EMAIL_USER and EMAIL_PASSWORD must be set together"),
        };

        Ok(Self {
            host: get("CADENCE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("CADENCE_DB_PATH").unwrap_or_else(|| "cadence.db".into()).into(),
            jwt_secret,
            jwt_ttl_days,
            client_url: get("CADENCE_CLIENT_URL").unwrap_or_else(|| "http://localhost:5173".into()),
            smtp,
            google,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_fill_everything_but_the_secret() {
        let config = load(&[("CADENCE_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.jwt_ttl_days, 7);
        assert_eq!(config.db_path, PathBuf::from("cadence.db"));
        assert_eq!(config.smtp, None);
        assert_eq!(config.google, None);
    }

    #[test]
    fn placeholder_secret_is_fatal() {
        assert!(load(&[]).is_err());
        assert!(load(&[("CADENCE_JWT_SECRET", "  ")]).is_err());
        assert!(load(&[("CADENCE_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(load(&[("CADENCE_JWT_SECRET", "s"), ("CADENCE_PORT", "http")]).is_err());
        assert!(load(&[("CADENCE_JWT_SECRET", "s"), ("CADENCE_JWT_TTL_DAYS", "0")]).is_err());
    }

    #[test]
    fn google_needs_both_halves() {
        let half = load(&[("CADENCE_JWT_SECRET", "s"), ("GOOGLE_CLIENT_ID", "id")]);
        assert!(half.is_err());

        let config = load(&[
            ("CADENCE_JWT_SECRET", "s"),
            ("CADENCE_PORT", "8080"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ])
        .unwrap();
        let google = config.google.unwrap();
        assert_eq!(google.callback_url, "http://localhost:8080/api/auth/google/callback");
    }

    #[test]
    fn smtp_settings_come_from_email_vars() {
        let config = load(&[
            ("CADENCE_JWT_SECRET", "s"),
            ("EMAIL_HOST", "smtp.gmail.com"),
            ("EMAIL_USER", "planner@gmail.com"),
            ("EMAIL_PASSWORD", "app-password"),
        ])
        .unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.username, "planner@gmail.com");
        assert_eq!(smtp.from, "Cadence <no-reply@cadence.local>");

        let no_host = load(&[
            ("CADENCE_JWT_SECRET", "s"),
            ("EMAIL_USER", "planner@gmail.com"),
            ("EMAIL_PASSWORD", "app-password"),
        ]);
        assert!(no_host.is_err());

        let half = load(&[("CADENCE_JWT_SECRET", "s"), ("EMAIL_USER", "planner@gmail.com")]);
        assert!(half.is_err());
    }
}
