use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Session-level options applied to every Postgres connection.
///
/// Pinning these keeps query results byte-stable across Postgres
/// installations with different defaults.
pub struct DefaultPgConnectionOptions;

impl DefaultPgConnectionOptions {
    /// Returns the options as key-value pairs suitable for sqlx.
    pub fn to_key_value_pairs() -> Vec<(String, String)> {
        vec![
            ("datestyle".to_owned(), "ISO".to_owned()),
            ("intervalstyle".to_owned(), "postgres".to_owned()),
            ("extra_float_digits".to_owned(), "3".to_owned()),
            ("client_encoding".to_owned(), "UTF8".to_owned()),
        ]
    }
}

/// Connection parameters for a Postgres database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PgConnectionConfig {
    /// Hostname or IP address of the Postgres server.
    pub host: String,
    /// Port the Postgres server listens on.
    pub port: u16,
    /// Database name to connect to.
    pub name: String,
    /// User to authenticate as.
    pub username: String,
    /// Password for the user. Redacted in debug output.
    pub password: Option<SerializableSecretString>,
    /// TLS settings for the connection.
    pub tls: TlsConfig,
}

/// TLS settings for Postgres connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TlsConfig {
    /// PEM-encoded trusted root certificates.
    pub trusted_root_certs: String,
    /// Whether TLS is required for the connection.
    pub enabled: bool,
}

impl TlsConfig {
    /// Validates the TLS settings.
    ///
    /// Enabling TLS without trusted root certificates is rejected because the
    /// resulting connection could not be verified.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

/// Conversion from [`PgConnectionConfig`] into driver connect options.
///
/// Centralizes connection parameters so every pool in the workspace is built
/// from the same configuration surface.
pub trait IntoConnectOptions<Output> {
    /// Builds connect options without selecting a database.
    ///
    /// Useful for administrative operations that run before the target
    /// database exists.
    fn without_db(&self) -> Output;

    /// Builds connect options for the configured database.
    fn with_db(&self) -> Output;
}

impl IntoConnectOptions<PgConnectOptions> for PgConnectionConfig {
    fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.tls.enabled {
            PgSslMode::VerifyFull
        } else {
            PgSslMode::Prefer
        };

        let mut options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .username(&self.username)
            .port(self.port)
            .ssl_mode(ssl_mode)
            .options(DefaultPgConnectionOptions::to_key_value_pairs());

        if self.tls.enabled {
            options = options
                .ssl_root_cert_from_pem(self.tls.trusted_root_certs.clone().into_bytes());
        }

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }

    fn with_db(&self) -> PgConnectOptions {
        let options: PgConnectOptions = self.without_db();
        options.database(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_without_certs_is_rejected() {
        let tls = TlsConfig {
            trusted_root_certs: String::new(),
            enabled: true,
        };
        assert!(tls.validate().is_err());
    }

    #[test]
    fn disabled_tls_needs_no_certs() {
        let tls = TlsConfig {
            trusted_root_certs: String::new(),
            enabled: false,
        };
        assert!(tls.validate().is_ok());
    }

    #[test]
    fn password_is_redacted_in_debug_output() {
        let config = PgConnectionConfig {
            host: "localhost".to_owned(),
            port: 5432,
            name: "feeds".to_owned(),
            username: "indexer".to_owned(),
            password: Some("hunter2".to_owned().into()),
            tls: TlsConfig {
                trusted_root_certs: String::new(),
                enabled: false,
            },
        };

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
