use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub realtime_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub upstream_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend_url = env::var("BACKEND_URL")?;
        // The realtime channel lives at the backend origin unless overridden.
        let realtime_url =
            env::var("REALTIME_URL").unwrap_or_else(|_| derive_ws_url(&backend_url));
        let jwt_secret = env::var("JWT_SECRET")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let upstream_timeout = env::var("UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));
        Ok(Self {
            backend_url,
            realtime_url,
            jwt_secret,
            host,
            port,
            upstream_timeout,
        })
    }
}

fn derive_ws_url(backend_url: &str) -> String {
    if let Some(rest) = backend_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = backend_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        backend_url.to_string()
    }
}
