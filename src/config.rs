use serde::Deserialize;

/// Which persistence backend serves the ledger.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .set_default("server_port", 8000)?
            .set_default("store_backend", "postgres")?
            .set_default("max_connections", 8)?
            .add_source(config::Environment::default())
            .build()?;
        let config: Config = config.try_deserialize()?;

        if config.store_backend == StoreBackend::Postgres && config.database_url.is_none() {
            return Err(config::ConfigError::NotFound("DATABASE_URL".into()));
        }
        Ok(config)
    }
}
