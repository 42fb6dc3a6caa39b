use std::{env, fmt, path::PathBuf, str::FromStr};
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub mail: Option<MailConfig>,
}

#[derive(Clone)]
pub struct MailConfig {
    pub user: String,
    pub password: String,
    pub smtp_host: String,
    pub recipient: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("smtp_host", &self.smtp_host)
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            data_dir: PathBuf::from(
                non_empty(&lookup, "APP_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            static_dir: PathBuf::from(
                non_empty(&lookup, "STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
            ),
            mail: mail_config(&lookup),
        }
    }
}

fn mail_config(lookup: &impl Fn(&str) -> Option<String>) -> Option<MailConfig> {
    let user = non_empty(lookup, "EMAIL_USER")?;
    let password = non_empty(lookup, "EMAIL_PASS")?;
    let smtp_host = non_empty(lookup, "SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
    let recipient = non_empty(lookup, "NOTIFY_EMAIL").unwrap_or_else(|| user.clone());

    Some(MailConfig {
        user,
        password,
        smtp_host,
        recipient,
    })
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    let Some(raw) = non_empty(lookup, key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    raw.parse().unwrap_or_else(|err| {
        warn!("invalid {key} value {raw:?}: {err}; using default: {default}");
        default
    })
}
