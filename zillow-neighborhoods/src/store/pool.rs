//! Connexion PostgreSQL de l'importeur
//!
//! L'import est séquentiel: une seule connexion est ouverte et vérifiée avant
//! de toucher à la table.

use std::time::Duration;

use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, warn};

/// Nom transmis au serveur (`pg_stat_activity.application_name`)
const APPLICATION_NAME: &str = "zillow-neighborhoods";

/// Mode TLS, valeurs de `PGSSLMODE`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    #[default]
    Disable,
    /// TLS tenté, connexion en clair si le serveur le refuse
    Prefer,
    /// TLS obligatoire, certificat vérifié contre les racines webpki
    Require,
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(SslMode::Disable),
            "allow" | "prefer" => Ok(SslMode::Prefer),
            "require" | "verify-ca" | "verify-full" | "on" | "true" | "yes" => {
                Ok(SslMode::Require)
            }
            _ => Err(format!(
                "Invalid SSL mode: {}. Use: disable, prefer, require, verify-full",
                s
            )),
        }
    }
}

/// Paramètres de connexion
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// URL complète (`DATABASE_URL`), prioritaire sur les champs séparés
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub ssl_mode: SslMode,
    pub connect_timeout: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".into(),
            port: 5432,
            dbname: "zillow".into(),
            user: "postgres".into(),
            password: None,
            ssl_mode: SslMode::Disable,
            connect_timeout: None,
        }
    }
}

impl DatabaseConfig {
    /// Charge la configuration depuis `DATABASE_URL` et les variables PG*
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Comme [`DatabaseConfig::from_env`], avec une source de variables arbitraire
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            url: lookup("DATABASE_URL").filter(|u| !u.is_empty()),
            host: lookup("PGHOST").unwrap_or(defaults.host),
            port: lookup("PGPORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            dbname: lookup("PGDATABASE").unwrap_or(defaults.dbname),
            user: lookup("PGUSER").unwrap_or(defaults.user),
            password: lookup("PGPASSWORD"),
            ssl_mode: lookup("PGSSLMODE")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            // Secondes, comme libpq; 0 = pas de limite
            connect_timeout: lookup("PGCONNECT_TIMEOUT")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Cible affichable, sans mot de passe
    pub fn target(&self) -> String {
        match &self.url {
            Some(_) => "DATABASE_URL".to_string(),
            None => format!("{}@{}:{}/{}", self.user, self.host, self.port, self.dbname),
        }
    }

    fn deadpool_config(&self) -> Config {
        let mut cfg = Config::new();
        match &self.url {
            Some(url) => cfg.url = Some(url.clone()),
            None => {
                cfg.host = Some(self.host.clone());
                cfg.port = Some(self.port);
                cfg.dbname = Some(self.dbname.clone());
                cfg.user = Some(self.user.clone());
                cfg.password = self.password.clone();
            }
        }
        cfg.application_name = Some(APPLICATION_NAME.into());
        cfg.connect_timeout = self.connect_timeout;
        cfg.pool = Some(PoolConfig::new(1));
        cfg
    }
}

fn make_tls_connector() -> MakeRustlsConnect {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    MakeRustlsConnect::new(config)
}

async fn open_plain(config: &DatabaseConfig) -> Result<Pool> {
    let pool = config
        .deadpool_config()
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .context("Failed to create database pool")?;
    test_connection(&pool).await?;
    Ok(pool)
}

async fn open_tls(config: &DatabaseConfig) -> Result<Pool> {
    let pool = config
        .deadpool_config()
        .create_pool(Some(Runtime::Tokio1), make_tls_connector())
        .context("Failed to create database pool with TLS")?;
    test_connection(&pool).await?;
    Ok(pool)
}

/// Ouvre et vérifie la connexion selon le mode TLS.
///
/// En mode `Prefer`, un échec TLS est retenté en clair.
pub async fn connect(config: &DatabaseConfig) -> Result<Pool> {
    debug!(target_db = %config.target(), ssl = ?config.ssl_mode, "Opening PostgreSQL connection");
    match config.ssl_mode {
        SslMode::Disable => open_plain(config).await,
        SslMode::Require => open_tls(config).await,
        SslMode::Prefer => match open_tls(config).await {
            Ok(pool) => Ok(pool),
            Err(e) => {
                warn!("TLS connection failed, retrying without TLS: {e:#}");
                open_plain(config).await
            }
        },
    }
}

/// Teste la connexion à la base
pub async fn test_connection(pool: &Pool) -> Result<()> {
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    client
        .execute("SELECT 1", &[])
        .await
        .context("Connection test failed")?;
    Ok(())
}
