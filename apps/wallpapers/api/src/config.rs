use core_config::{AppInfo, FromEnv, app_info, env_optional, env_parse, server::ServerConfig};
use database::postgres::PostgresConfig;
use domain_wallpapers::{FeatureExtractorConfig, GeneratorConfig, QdrantConfig};

pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    pub qdrant: QdrantConfig,
    pub extractor: FeatureExtractorConfig,
    pub generator: GeneratorConfig,
    /// `ADMIN_API_KEY`; unset rejects every admin request
    pub admin_api_key: Option<String>,
    /// `IMAGES_BASE_URL`, prefixed to relative category images
    pub images_base_url: Option<String>,
    /// `RUN_MIGRATIONS` (true)
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // Required - will fail if not set
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080

        Ok(Self {
            app: app_info!(),
            database,
            server,
            environment,
            qdrant: QdrantConfig::from_env()?,
            extractor: FeatureExtractorConfig::from_env()?,
            generator: GeneratorConfig::from_env()?,
            admin_api_key: env_optional("ADMIN_API_KEY"),
            images_base_url: env_optional("IMAGES_BASE_URL"),
            run_migrations: env_parse("RUN_MIGRATIONS", "true")?,
        })
    }
}
