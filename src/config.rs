use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub listen: SocketAddr,
    pub expo_url: String,
    pub push_timeout: std::time::Duration,
    pub cooldown: time::Duration,
    pub batch_delay: time::Duration,
    /// `None` disables the in-process flush ticker; an external cron is then
    /// expected to hit the flush endpoint instead.
    pub flush_interval: Option<std::time::Duration>,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: ":memory:".into(),
            listen: ([127, 0, 0, 1], 0).into(),
            expo_url: "http://127.0.0.1:9/--/api/v2/push/send".to_string(),
            push_timeout: std::time::Duration::from_secs(1),
            cooldown: time::Duration::hours(4),
            batch_delay: time::Duration::minutes(10),
            flush_interval: None,
        }
    }
}
