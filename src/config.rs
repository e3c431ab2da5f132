use serde::Deserialize;

const PLACEHOLDER_SECRET: &str = "CHANGE_THIS_SECRET_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Absolute origin used when building edit links, e.g. `https://approvals.example.com`.
    pub public_base_url: String,
    /// HMAC key for session cookies.
    pub session_secret: String,
    /// Lifetime of a login, in seconds. Default: 8 hours.
    pub session_ttl_secs: i64,
    pub credentials: Credentials,
    /// Projects offered on the request form.
    pub project_choices: Vec<String>,
    /// Units offered on the request form are 1..=unit_choices_max.
    pub unit_choices_max: u32,
    /// `json` switches the log formatter to JSON lines.
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub manager1_password: String,
    pub manager2_password: String,
    pub viewer_username: String,
    pub viewer_password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            manager1_password: "manager1".into(),
            manager2_password: "manager2".into(),
            viewer_username: "viewer".into(),
            viewer_password: "viewer123".into(),
        }
    }
}

impl Config {
    pub fn unit_choices(&self) -> Vec<String> {
        (1..=self.unit_choices_max).map(|n| n.to_string()).collect()
    }

    /// Settings suitable for tests: in-memory database, fixed secret.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: "sqlite::memory:".into(),
            public_base_url: "http://localhost:5000".into(),
            session_secret: "test-session-secret".into(),
            session_ttl_secs: 3600,
            credentials: Credentials::default(),
            project_choices: default_projects(),
            unit_choices_max: 300,
            log_format: "text".into(),
        }
    }
}

fn default_projects() -> Vec<String> {
    ["Project A", "Project B", "Project C", "Project D"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Comma-separated list, blanks dropped.
fn parse_choices(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let production = std::env::var("APP_ENV")
        .or_else(|_| std::env::var("RUST_ENV"))
        .map(|v| v == "production")
        .unwrap_or(false);

    let session_secret = env_or("SESSION_SECRET", PLACEHOLDER_SECRET);
    if session_secret == PLACEHOLDER_SECRET {
        if production {
            anyhow::bail!(
                "SESSION_SECRET is still the insecure placeholder. \
                 Set a long random value before running in production."
            );
        }
        eprintln!("⚠️  SESSION_SECRET is not set, using insecure placeholder.");
    }

    let defaults = Credentials::default();
    let credentials = Credentials {
        manager1_password: env_or("MANAGER1_PASSWORD", &defaults.manager1_password),
        manager2_password: env_or("MANAGER2_PASSWORD", &defaults.manager2_password),
        viewer_username: env_or("VIEWER_USERNAME", &defaults.viewer_username),
        viewer_password: env_or("VIEWER_PASSWORD", &defaults.viewer_password),
    };
    let default_passwords = credentials.manager1_password == defaults.manager1_password
        || credentials.manager2_password == defaults.manager2_password
        || credentials.viewer_password == defaults.viewer_password;
    if default_passwords {
        if production {
            anyhow::bail!(
                "manager/viewer passwords are still the built-in defaults. \
                 Set MANAGER1_PASSWORD, MANAGER2_PASSWORD and VIEWER_PASSWORD."
            );
        }
        eprintln!("⚠️  Using built-in manager/viewer passwords. Override them for production.");
    }

    let project_choices = std::env::var("PROJECT_CHOICES")
        .map(|v| parse_choices(&v))
        .ok()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(default_projects);

    let port: u16 = env_or("APP_PORT", "5000").parse().unwrap_or(5000);

    Ok(Config {
        port,
        database_url: env_or("DATABASE_URL", "sqlite://approval_requests.db"),
        public_base_url: env_or("PUBLIC_BASE_URL", &format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string(),
        session_secret,
        session_ttl_secs: std::env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8 * 3600),
        credentials,
        project_choices,
        unit_choices_max: std::env::var("UNIT_CHOICES_MAX")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300),
        log_format: env_or("LOG_FORMAT", "text"),
    })
}
