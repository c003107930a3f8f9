use std::{env, path::PathBuf};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: Environment,
    pub media_root: PathBuf,
    pub snapshot_path: PathBuf,
    pub log_dir: PathBuf,
    pub client_origin: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid SERVER_PORT: {err}")))?;

        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let media_root =
            PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".into()));
        let snapshot_path =
            PathBuf::from(env::var("SNAPSHOT_PATH").unwrap_or_else(|_| "./data/images.json".into()));
        let log_dir = PathBuf::from(env::var("LOG_DIR").unwrap_or_else(|_| "./logs".into()));

        let client_origin = env::var("CLIENT_URL").ok().filter(|value| !value.is_empty());

        let smtp = Self::smtp_from_env()?;
        if environment == Environment::Production && smtp.is_none() {
            return Err(AppError::Config(
                "SMTP_HOST, SMTP_USER, SMTP_PASS and EMAIL_TO are required in production".into(),
            ));
        }

        Ok(Self {
            host,
            port,
            env: environment,
            media_root,
            snapshot_path,
            log_dir,
            client_origin,
            smtp,
        })
    }

    // SMTP is optional in development; if SMTP_HOST is set, the rest must be too.
    fn smtp_from_env() -> Result<Option<SmtpConfig>, AppError> {
        let host = match env::var("SMTP_HOST") {
            Ok(value) if !value.is_empty() => value,
            _ => return Ok(None),
        };

        let port: u16 = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".into())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid SMTP_PORT: {err}")))?;

        let username = env::var("SMTP_USER")
            .map_err(|_| AppError::Config("missing SMTP_USER".into()))?;
        let password = env::var("SMTP_PASS")
            .map_err(|_| AppError::Config("missing SMTP_PASS".into()))?;
        let to = env::var("EMAIL_TO").map_err(|_| AppError::Config("missing EMAIL_TO".into()))?;
        let from =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "noreply@theweddingshade.com".into());

        Ok(Some(SmtpConfig {
            host,
            port,
            username,
            password,
            from,
            to,
        }))
    }
}
