// Bootstrap configuration, read once at startup. Grounded in
// control-plane::main's scattered env::var() reads, gathered here into one
// struct so main.rs stays a thin wiring sequence.

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_db_connections: u32,
    pub bind_addr: String,
    pub api_prefix: String,
    pub cors_allowed_origins: Vec<String>,
    pub embedding_cache_capacity: usize,
    pub drain_deadline_secs: u64,
    pub flush_deadline_secs: u64,
    pub audit_buffer_capacity: usize,
    pub audit_batch_size: usize,
    pub dlq_batch_size: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            max_db_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            api_prefix: std::env::var("API_PREFIX").unwrap_or_default(),
            cors_allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            embedding_cache_capacity: std::env::var("EMBEDDING_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            drain_deadline_secs: std::env::var("SHUTDOWN_DRAIN_DEADLINE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            flush_deadline_secs: std::env::var("SHUTDOWN_FLUSH_DEADLINE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            audit_buffer_capacity: std::env::var("AUDIT_BUFFER_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            audit_batch_size: std::env::var("AUDIT_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            dlq_batch_size: std::env::var("DLQ_REPLAY_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_split_and_trim() {
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example");
        std::env::set_var("DATABASE_URL", "postgres://localhost/test");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        std::env::remove_var("CORS_ALLOWED_ORIGINS");
        std::env::remove_var("DATABASE_URL");
    }
}
