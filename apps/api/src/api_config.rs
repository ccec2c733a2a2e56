use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use lendgate_application::MAX_ROLE_CACHE_TTL_SECONDS;
use lendgate_core::AppError;
use tracing_subscriber::EnvFilter;

const MIN_GATEWAY_SECRET_LENGTH: usize = 32;
const DEFAULT_ROLE_CACHE_TTL_SECONDS: u32 = 5;
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub database_max_connections: u32,
    pub frontend_url: String,
    pub gateway_shared_secret: String,
    pub api_host: String,
    pub api_port: u16,
    pub redis_url: Option<String>,
    pub role_cache_ttl_seconds: u32,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let database_max_connections = parse_optional_env(
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_DATABASE_MAX_CONNECTIONS,
        )?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let gateway_shared_secret =
            validate_gateway_secret(required_env("GATEWAY_SHARED_SECRET")?)?;

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let redis_url = env::var("REDIS_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let role_cache_ttl_seconds = validate_role_cache_ttl(parse_optional_env(
            "ROLE_CACHE_TTL_SECONDS",
            DEFAULT_ROLE_CACHE_TTL_SECONDS,
        )?)?;

        Ok(Self {
            migrate_only,
            database_url,
            database_max_connections,
            frontend_url,
            gateway_shared_secret,
            api_host,
            api_port,
            redis_url,
            role_cache_ttl_seconds,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_optional_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}

fn validate_gateway_secret(secret: String) -> Result<String, AppError> {
    if secret.len() < MIN_GATEWAY_SECRET_LENGTH {
        return Err(AppError::Validation(format!(
            "GATEWAY_SHARED_SECRET must be at least {MIN_GATEWAY_SECRET_LENGTH} characters"
        )));
    }

    Ok(secret)
}

fn validate_role_cache_ttl(ttl_seconds: u32) -> Result<u32, AppError> {
    if ttl_seconds > MAX_ROLE_CACHE_TTL_SECONDS {
        return Err(AppError::Validation(format!(
            "ROLE_CACHE_TTL_SECONDS must be at most {MAX_ROLE_CACHE_TTL_SECONDS}"
        )));
    }

    Ok(ttl_seconds)
}

#[cfg(test)]
mod tests {
    use lendgate_core::AppError;

    use super::{ApiConfig, validate_gateway_secret, validate_role_cache_ttl};

    #[test]
    fn short_gateway_secret_is_rejected() {
        assert!(matches!(
            validate_gateway_secret("too-short".to_owned()),
            Err(AppError::Validation(_))
        ));
        assert!(validate_gateway_secret("x".repeat(32)).is_ok());
    }

    #[test]
    fn role_cache_ttl_is_bounded() {
        assert!(matches!(validate_role_cache_ttl(30), Ok(30)));
        assert!(matches!(validate_role_cache_ttl(0), Ok(0)));
        assert!(matches!(
            validate_role_cache_ttl(31),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn socket_address_rejects_host_names() {
        let config = ApiConfig {
            migrate_only: false,
            database_url: "postgres://localhost/lendgate".to_owned(),
            database_max_connections: 10,
            frontend_url: "http://localhost:3000".to_owned(),
            gateway_shared_secret: "x".repeat(32),
            api_host: "localhost".to_owned(),
            api_port: 3001,
            redis_url: None,
            role_cache_ttl_seconds: 5,
        };
        assert!(matches!(config.socket_address(), Err(AppError::Internal(_))));

        let config = ApiConfig {
            api_host: "0.0.0.0".to_owned(),
            ..config
        };
        assert!(matches!(config.socket_address(), Ok(address) if address.port() == 3001));
    }
}
