use crate::desk::DEFAULT_MAX_FORMS;
use log::warn;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_USERNAME: &str = "WorkStation1";
pub const DEFAULT_PASSWORD: &str = "Letmein1";
pub const DEFAULT_SESSION_HOURS: u64 = 24;
pub const DEFAULT_DRAFT_DIR: &str = "drafts";
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;

/// Runtime settings, read from `PRODLOG_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub submit_url: Option<String>,
    pub username: String,
    pub password: String,
    pub session_ttl: Duration,
    pub draft_dir: PathBuf,
    pub max_forms: usize,
    pub submit_on_add: bool,
    pub submit_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            submit_url: None,
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_HOURS * 3600),
            draft_dir: PathBuf::from(DEFAULT_DRAFT_DIR),
            max_forms: DEFAULT_MAX_FORMS,
            submit_on_add: true,
            submit_timeout: Duration::from_secs(DEFAULT_SUBMIT_TIMEOUT_SECS),
        }
    }
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("ignoring {}={:?}: not a valid value", name, value);
                default
            }
        },
        None => default,
    }
}

fn parse_flag(name: &str, raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            warn!("ignoring {}={:?}: expected true or false", name, v);
            default
        }
        None => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or malformed values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_addr: non_empty("PRODLOG_BIND").unwrap_or(defaults.bind_addr),
            submit_url: non_empty("PRODLOG_SUBMIT_URL").map(|v| v.trim().to_string()),
            username: non_empty("PRODLOG_USERNAME").unwrap_or(defaults.username),
            password: non_empty("PRODLOG_PASSWORD").unwrap_or(defaults.password),
            session_ttl: session_ttl(parse_or(
                "PRODLOG_SESSION_HOURS",
                non_empty("PRODLOG_SESSION_HOURS"),
                DEFAULT_SESSION_HOURS,
            )),
            draft_dir: non_empty("PRODLOG_DRAFT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.draft_dir),
            max_forms: parse_or(
                "PRODLOG_MAX_FORMS",
                non_empty("PRODLOG_MAX_FORMS"),
                DEFAULT_MAX_FORMS,
            )
            .max(1),
            submit_on_add: parse_flag("PRODLOG_SUBMIT_ON_ADD", non_empty("PRODLOG_SUBMIT_ON_ADD"), true),
            submit_timeout: Duration::from_secs(parse_or(
                "PRODLOG_SUBMIT_TIMEOUT_SECS",
                non_empty("PRODLOG_SUBMIT_TIMEOUT_SECS"),
                DEFAULT_SUBMIT_TIMEOUT_SECS,
            )),
        }
    }

    pub fn with_bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = bind_addr.into();
        self
    }

    pub fn with_submit_url(mut self, submit_url: impl Into<String>) -> Self {
        self.submit_url = Some(submit_url.into());
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_draft_dir(mut self, draft_dir: impl Into<PathBuf>) -> Self {
        self.draft_dir = draft_dir.into();
        self
    }

    pub fn with_max_forms(mut self, max_forms: usize) -> Self {
        self.max_forms = max_forms.max(1);
        self
    }

    pub fn with_submit_on_add(mut self, submit_on_add: bool) -> Self {
        self.submit_on_add = submit_on_add;
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }
}

fn session_ttl(hours: u64) -> Duration {
    match hours.checked_mul(3600) {
        Some(secs) => Duration::from_secs(secs),
        None => {
            warn!(
                "PRODLOG_SESSION_HOURS={} is too large, using {}",
                hours, DEFAULT_SESSION_HOURS
            );
            Duration::from_secs(DEFAULT_SESSION_HOURS * 3600)
        }
    }
}
