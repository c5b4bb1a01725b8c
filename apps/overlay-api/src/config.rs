use crate::stream::queue::SUBSCRIBER_QUEUE_CAPACITY;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_HELIX_URL: &str = "https://api.twitch.tv/helix";

/// Variables whose values are allowed CORS origins.
const CORS_ORIGIN_VARS: [&str; 4] = ["FRONTEND_URL", "OVERLAY_URL", "EXTENSION_URL", "DASHBOARD_URL"];

/// Overlay API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Extension client id on the streaming platform.
    pub client_id: String,
    /// Base64-encoded extension secret that signs extension JWTs and receipts.
    pub client_secret: String,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Origins allowed by CORS. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Base URL of the platform's user API.
    pub helix_url: String,
    /// App access token for the platform's user API.
    pub helix_token: Option<String>,
    /// Per-overlay outbound queue capacity.
    pub subscriber_queue_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            client_id: required_var(&var, "CLIENT_ID"),
            client_secret: required_var(&var, "CLIENT_SECRET"),
            database_url: database_url_from(&var),
            cors_origins: CORS_ORIGIN_VARS
                .iter()
                .filter_map(|name| var(*name))
                .map(|origin| origin.trim_end_matches('/').to_string())
                .collect(),
            port: var("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            helix_url: var("HELIX_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_HELIX_URL.to_string()),
            helix_token: var("HELIX_TOKEN"),
            subscriber_queue_capacity: var("SUBSCRIBER_QUEUE_CAPACITY")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(SUBSCRIBER_QUEUE_CAPACITY)
                .max(SUBSCRIBER_QUEUE_CAPACITY),
        }
    }
}

/// Resolve the database URL from the process environment.
///
/// `DATABASE_URL` wins; otherwise it is assembled from the `DB_*` variables.
pub fn database_url_from_env() -> String {
    database_url_from(&|name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
}

fn database_url_from(var: &impl Fn(&str) -> Option<String>) -> String {
    if let Some(url) = var("DATABASE_URL") {
        return url;
    }
    let host = required_var(var, "DB_HOST");
    let port = var("DB_PORT")
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_DB_PORT);
    let user = required_var(var, "DB_USER");
    let name = required_var(var, "DB_NAME");
    match var("DB_PASSWORD") {
        Some(password) => format!("postgres://{user}:{password}@{host}:{port}/{name}"),
        None => format!("postgres://{user}@{host}:{port}/{name}"),
    }
}

fn required_var(var: &impl Fn(&str) -> Option<String>, name: &str) -> String {
    var(name).unwrap_or_else(|| panic!("{name} env var is required"))
}
