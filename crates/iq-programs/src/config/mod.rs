use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_MUNICIPALITY: &str = "Fort Collins";
const DEFAULT_GEOCODE_MIN_SCORE: f64 = 85.0;
const DEFAULT_RELEASED_STATUSES: &str = "released,out of warranty";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the enrollment service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub service_area: ServiceAreaConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        )?;

        let municipality =
            env::var("IQ_MUNICIPALITY").unwrap_or_else(|_| DEFAULT_MUNICIPALITY.to_string());
        let geocode_min_score = match env::var("IQ_GEOCODE_MIN_SCORE") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|score| score.is_finite() && *score >= 0.0)
                .ok_or(ConfigError::InvalidGeocodeScore { value: raw })?,
            Err(_) => DEFAULT_GEOCODE_MIN_SCORE,
        };
        let released_statuses = parse_status_list(
            &env::var("IQ_BROADBAND_RELEASED_STATUSES")
                .unwrap_or_else(|_| DEFAULT_RELEASED_STATUSES.to_string()),
        );

        let catalog_path = env::var("IQ_CATALOG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            service_area: ServiceAreaConfig {
                municipality,
                geocode_min_score,
                released_statuses,
            },
            catalog: CatalogConfig { path: catalog_path },
        })
    }
}

fn parse_status_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|status| status.trim().to_ascii_lowercase())
        .filter(|status| !status.is_empty())
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            other => Err(ConfigError::InvalidLogFormat {
                value: other.to_string(),
            }),
        }
    }
}

/// Knobs for the geocoder and broadband lookups that decide serviceability.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceAreaConfig {
    /// City name whose addresses are expected to fall inside the service area.
    pub municipality: String,
    /// Geocoder candidates must score strictly above this to count as a hit.
    pub geocode_min_score: f64,
    /// Lower-cased broadband inventory statuses that mean "service available".
    pub released_statuses: Vec<String>,
}

impl Default for ServiceAreaConfig {
    fn default() -> Self {
        Self {
            municipality: DEFAULT_MUNICIPALITY.to_string(),
            geocode_min_score: DEFAULT_GEOCODE_MIN_SCORE,
            released_statuses: parse_status_list(DEFAULT_RELEASED_STATUSES),
        }
    }
}

/// Where the assistance program catalog is seeded from.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat { value: String },
    InvalidGeocodeScore { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat { value } => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'pretty' (got '{value}')")
            }
            ConfigError::InvalidGeocodeScore { value } => write!(
                f,
                "IQ_GEOCODE_MIN_SCORE must be a non-negative number (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLogFormat { .. }
            | ConfigError::InvalidGeocodeScore { .. } => None,
        }
    }
}
