use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::database::DatabaseConfig;
use crate::error::{ApplicationError, ConfigLoadSnafu};
use crate::prelude::*;
use crate::service::DEFAULT_CERTIFICATE_ATTEMPTS;

/// Settings read from the environment, see `.env.example`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(rename = "host_address")]
    pub host: SocketAddr,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// HS256 secret shared with the identity provider.
    pub auth_secret: SecretString,

    /// JSON list of courses loaded into the catalog on startup.
    pub catalog_path: Option<PathBuf>,

    #[serde(default = "default_certificate_attempts")]
    pub certificate_attempts: usize,

    /// Present when `SURREAL_URL` is set.
    #[serde(flatten)]
    pub database: Option<DatabaseConfig>,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_filter() -> String {
    "info".to_owned()
}

fn default_certificate_attempts() -> usize {
    DEFAULT_CERTIFICATE_ATTEMPTS
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        envy::from_env::<Config>().context(ConfigLoadSnafu)
    }

    pub fn from_iter<I>(vars: I) -> Result<Config, ApplicationError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars).context(ConfigLoadSnafu)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret as _;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_memory() {
        let config = Config::from_iter(vars(&[
            ("HOST_ADDRESS", "127.0.0.1:8080"),
            ("AUTH_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.host.port(), 8080);
        assert_eq!(config.auth_secret.expose_secret(), "secret");
        assert_eq!(config.certificate_attempts, DEFAULT_CERTIFICATE_ATTEMPTS);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert!(config.catalog_path.is_none());
        assert!(config.database.is_none());
    }

    #[test]
    fn surreal_url_selects_the_database() {
        let config = Config::from_iter(vars(&[
            ("HOST_ADDRESS", "0.0.0.0:3000"),
            ("AUTH_SECRET", "secret"),
            ("CERTIFICATE_ATTEMPTS", "8"),
            ("SURREAL_URL", "http://localhost:8000"),
            ("SURREAL_USERNAME", "root"),
            ("SURREAL_PASSWORD", "root"),
        ]))
        .unwrap();

        assert_eq!(config.certificate_attempts, 8);
        let database = config.database.unwrap();
        assert_eq!(database.namespace, "learnpath");
        assert_eq!(database.credentials.unwrap().username, "root");
    }

    #[test]
    fn missing_secret_fails() {
        let error = Config::from_iter(vars(&[("HOST_ADDRESS", "127.0.0.1:8080")])).unwrap_err();
        assert!(matches!(error, ApplicationError::ConfigLoad { .. }));
    }
}
