use std::{env, io::Write};

use chrono::Duration;
use log::*;
use ptt_common::{helpers::env_flag, Secret};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_PTT_HOST: &str = "127.0.0.1";
const DEFAULT_PTT_PORT: u16 = 8360;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::hours(72);
const DEFAULT_JWT_EXPIRY: Duration = Duration::hours(24);
const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// The time before a token request that was never issued is cancelled.
    pub request_timeout: Duration,
    /// When true, `settle_ptt` joins `issue_ptt` and `accept_offer` behind the maker/checker gate.
    pub gate_settlement: bool,
    /// Run the embedded database migrations at startup.
    pub auto_migrate: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PTT_HOST.to_string(),
            port: DEFAULT_PTT_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            gate_settlement: false,
            auto_migrate: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PTT_HOST").ok().unwrap_or_else(|| DEFAULT_PTT_HOST.into());
        let port = env::var("PTT_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PTT_PORT. {e} Using the default, {DEFAULT_PTT_PORT}, instead."
                    );
                    DEFAULT_PTT_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PTT_PORT);
        let database_url = env::var("PTT_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ PTT_DATABASE_URL is not set. Please set it to the URL for the PTT database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = env_flag("PTT_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("PTT_USE_FORWARDED", false);
        let gate_settlement = env_flag("PTT_GATE_SETTLEMENT", false);
        if gate_settlement {
            info!("🪛️ Settlements require maker/checker approval");
        }
        let auto_migrate = env_flag("PTT_AUTO_MIGRATE", true);
        let request_timeout = configure_request_timeout();
        Self {
            host,
            port,
            database_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            request_timeout,
            gate_settlement,
            auto_migrate,
        }
    }
}

fn configure_request_timeout() -> Duration {
    env::var("PTT_REQUEST_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ PTT_REQUEST_TIMEOUT is not set. Using the default value of {} hrs.",
                DEFAULT_REQUEST_TIMEOUT.num_hours()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for PTT_REQUEST_TIMEOUT. {e}"))
                .and_then(|h| {
                    if h > 0 {
                        Ok(Duration::hours(h))
                    } else {
                        warn!("🪛️ PTT_REQUEST_TIMEOUT must be a positive number of hours.");
                        Err(())
                    }
                })
        })
        .ok()
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HMAC secret used to sign and verify access tokens (HS256).
    pub jwt_secret: Secret<String>,
    /// How long an access token stays valid after it is issued.
    pub token_expiry: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this, since every access token becomes invalid when the server restarts. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => match writeln!(f, "PTT_JWT_SECRET={secret}") {
                Ok(()) => warn!(
                    "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, you \
                     are doing it wrong! Set the PTT_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                    p.to_str().unwrap_or("???")
                ),
                Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret.");
            },
        }
        Self { jwt_secret: Secret::new(secret), token_expiry: DEFAULT_JWT_EXPIRY }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S, token_expiry: Duration) -> Self {
        Self { jwt_secret: Secret::new(secret.into()), token_expiry }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("PTT_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [PTT_JWT_SECRET]")))?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ServerError::ConfigurationError(format!(
                "PTT_JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} characters long"
            )));
        }
        let token_expiry = match env::var("PTT_JWT_EXPIRY_SECS") {
            Ok(s) => s
                .parse::<i64>()
                .ok()
                .filter(|v| *v > 0)
                .map(Duration::seconds)
                .ok_or_else(|| ServerError::ConfigurationError(format!("Invalid PTT_JWT_EXPIRY_SECS value: {s}")))?,
            Err(_) => DEFAULT_JWT_EXPIRY,
        };
        Ok(Self::new(secret, token_expiry))
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The subset of the server configuration that handlers may need. It carries no secrets.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
