use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

/// Application-level constants
pub const APP_NAME: &str = "RenalCare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_HOST: [u8; 4] = [127, 0, 0, 1];
const DEFAULT_PORT: u16 = 8001;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_ACCESS_TTL_MINUTES: i64 = 60;
const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

/// Accepted ranges for numeric settings. Out-of-range values fall back
/// to the default so token expiry arithmetic cannot overflow.
const ACCESS_TTL_MINUTES_RANGE: RangeInclusive<i64> = 1..=10_080;
const REFRESH_TTL_DAYS_RANGE: RangeInclusive<i64> = 1..=365;
const PBKDF2_ITERATIONS_RANGE: RangeInclusive<u32> = 1..=u32::MAX;

/// Get the application data directory.
/// ~/RenalCare/ on all platforms, falling back to the working directory
/// when no home directory can be determined (containers, CI).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default database file location.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("renalcare.db")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "renalcare_lib=info,renalcare=info,tower_http=info"
}

/// Initial admin account created at startup when absent.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub cors_origin: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub pbkdf2_iterations: u32,
    pub admin_seed: Option<AdminSeed>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((DEFAULT_HOST, DEFAULT_PORT)),
            database_path: default_database_path(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            access_token_ttl_minutes: DEFAULT_ACCESS_TTL_MINUTES,
            refresh_token_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
            pbkdf2_iterations: crate::crypto::PBKDF2_ITERATIONS,
            admin_seed: None,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from `RENALCARE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = parse_or_default(
            "RENALCARE_BIND",
            lookup("RENALCARE_BIND"),
            defaults.bind_addr,
        );
        let database_path = lookup("RENALCARE_DB")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);
        let cors_origin = lookup("RENALCARE_CORS_ORIGIN")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.cors_origin);
        let access_token_ttl_minutes = parse_in_range(
            "RENALCARE_ACCESS_TTL_MINUTES",
            lookup("RENALCARE_ACCESS_TTL_MINUTES"),
            defaults.access_token_ttl_minutes,
            ACCESS_TTL_MINUTES_RANGE,
        );
        let refresh_token_ttl_days = parse_in_range(
            "RENALCARE_REFRESH_TTL_DAYS",
            lookup("RENALCARE_REFRESH_TTL_DAYS"),
            defaults.refresh_token_ttl_days,
            REFRESH_TTL_DAYS_RANGE,
        );
        let pbkdf2_iterations = parse_in_range(
            "RENALCARE_PBKDF2_ITERATIONS",
            lookup("RENALCARE_PBKDF2_ITERATIONS"),
            defaults.pbkdf2_iterations,
            PBKDF2_ITERATIONS_RANGE,
        );

        let admin_seed = match (
            lookup("RENALCARE_ADMIN_EMAIL"),
            lookup("RENALCARE_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed { email, password })
            }
            _ => None,
        };

        Self {
            bind_addr,
            database_path,
            cors_origin,
            access_token_ttl_minutes,
            refresh_token_ttl_days,
            pbkdf2_iterations,
            admin_seed,
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match raw {
        None => default,
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, value, ?default, "Invalid config value, using default");
                default
            }
        },
    }
}

fn parse_in_range<T>(key: &str, raw: Option<String>, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd + Copy + std::fmt::Debug,
{
    let value = parse_or_default(key, raw, default);
    if range.contains(&value) {
        value
    } else {
        tracing::warn!(
            key,
            ?value,
            min = ?range.start(),
            max = ?range.end(),
            ?default,
            "Config value out of range, using default"
        );
        default
    }
}
