use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::optimizer::PackingConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "AFIT_PACKER_API_HOST";
    const PORT_VAR: &'static str = "AFIT_PACKER_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Configuration for the packing engine.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    packing: PackingConfig,
    max_units: u64,
}

impl OptimizerConfig {
    const WEIGHTED_VAR: &'static str = "AFIT_PACKER_WEIGHTED";
    const DIM_FACTOR_VAR: &'static str = "AFIT_PACKER_DIM_FACTOR";
    const EPSILON_VAR: &'static str = "AFIT_PACKER_EPSILON";
    const PARALLEL_TRIALS_VAR: &'static str = "AFIT_PACKER_PARALLEL_TRIALS";
    const TRIAL_LIMIT_VAR: &'static str = "AFIT_PACKER_TRIAL_LIMIT";
    const MAX_UNITS_VAR: &'static str = "AFIT_PACKER_MAX_UNITS";
    pub const DEFAULT_MAX_UNITS: u64 = 100_000;

    fn from_env() -> Self {
        let weighted = env_string(Self::WEIGHTED_VAR)
            .and_then(|raw| parse_bool(&raw, Self::WEIGHTED_VAR))
            .unwrap_or(PackingConfig::DEFAULT_WEIGHTED);

        let dim_factor = load_f64_with_warning(
            Self::DIM_FACTOR_VAR,
            PackingConfig::DEFAULT_DIM_FACTOR,
            |value| value > 0.0,
            "must be greater than 0",
        );

        let epsilon = load_f64_with_warning(
            Self::EPSILON_VAR,
            PackingConfig::DEFAULT_EPSILON,
            |value| value > 0.0 && value < 1.0,
            "must be between 0 and 1 (exclusive)",
        );

        let parallel_trials = env_string(Self::PARALLEL_TRIALS_VAR)
            .and_then(|raw| parse_bool(&raw, Self::PARALLEL_TRIALS_VAR))
            .unwrap_or(PackingConfig::DEFAULT_PARALLEL_TRIALS);

        let trial_limit = env_string(Self::TRIAL_LIMIT_VAR)
            .and_then(|raw| parse_trial_limit(&raw, Self::TRIAL_LIMIT_VAR));

        let packing = PackingConfig::builder()
            .weighted(weighted)
            .dim_factor(dim_factor)
            .epsilon(epsilon)
            .parallel_trials(parallel_trials)
            .trial_limit(trial_limit)
            .build();

        let max_units = env_string(Self::MAX_UNITS_VAR)
            .map(|raw| parse_max_units(&raw, Self::MAX_UNITS_VAR))
            .unwrap_or(Self::DEFAULT_MAX_UNITS);

        Self { packing, max_units }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }

    /// Upper bound for the total number of units in one request.
    pub fn max_units(&self) -> u64 {
        self.max_units
    }

    /// Replaces the unit limit.
    pub fn with_max_units(mut self, max_units: u64) -> Self {
        self.max_units = max_units;
        self
    }
}

/// Log filter directive for the tracing subscriber.
///
/// Read separately from [`AppConfig`] so the subscriber is installed before
/// any other configuration warning is emitted.
#[derive(Clone, Debug)]
pub struct LogConfig {
    filter: String,
}

impl LogConfig {
    const DEFAULT_FILTER: &'static str = "info";
    const FILTER_VAR: &'static str = "AFIT_PACKER_LOG";

    pub fn from_env() -> Self {
        Self {
            filter: env_string(Self::FILTER_VAR)
                .unwrap_or_else(|| Self::DEFAULT_FILTER.to_string()),
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Installs the global fmt subscriber. Calling it twice is a no-op.
    pub fn init_subscriber(&self) {
        let (filter, rejected) = match EnvFilter::try_new(&self.filter) {
            Ok(filter) => (filter, None),
            Err(err) => (EnvFilter::new(Self::DEFAULT_FILTER), Some(err)),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();

        if let Some(err) = rejected {
            warn!(
                "Could not parse {} ('{}'): {}. Using {}.",
                Self::FILTER_VAR,
                self.filter,
                err,
                Self::DEFAULT_FILTER
            );
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_trial_limit(raw: &str, var_name: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => {
            warn!("{} must be positive. Running all trials.", var_name);
            None
        }
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "Could not parse {} ('{}'): {}. Running all trials.",
                var_name, raw, err
            );
            None
        }
    }
}

fn parse_max_units(raw: &str, var_name: &str) -> u64 {
    let default = OptimizerConfig::DEFAULT_MAX_UNITS;
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            warn!("{} must be positive. Using {}.", var_name, default);
            default
        }
        Ok(value) => value,
        Err(err) => {
            warn!(
                "Could not parse {} ('{}'): {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn parse_f64_with_warning(
    var_name: &str,
    raw: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => value,
        Ok(_) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => parse_f64_with_warning(var_name, &raw, default, validator, invalid_hint),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        for raw in ["1", "true", "yes", "y", "on", "TRUE", "Yes", " on "] {
            assert_eq!(parse_bool(raw, "TEST_VAR"), Some(true), "{raw}");
        }
    }

    #[test]
    fn test_parse_bool_false_values() {
        for raw in ["0", "false", "no", "n", "off", "FALSE", "No", "  0  "] {
            assert_eq!(parse_bool(raw, "TEST_VAR"), Some(false), "{raw}");
        }
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_f64_falls_back_on_invalid_input() {
        let positive = |v: f64| v > 0.0;
        assert_eq!(parse_f64_with_warning("V", "5000", 1.0, positive, "hint"), 5000.0);
        assert_eq!(parse_f64_with_warning("V", "-2", 1.0, positive, "hint"), 1.0);
        assert_eq!(parse_f64_with_warning("V", "abc", 1.0, positive, "hint"), 1.0);
        assert_eq!(parse_f64_with_warning("V", "inf", 1.0, positive, "hint"), 1.0);
    }

    #[test]
    fn test_parse_trial_limit() {
        assert_eq!(parse_trial_limit("12", "V"), Some(12));
        assert_eq!(parse_trial_limit("0", "V"), None);
        assert_eq!(parse_trial_limit("many", "V"), None);
    }

    #[test]
    fn test_parse_max_units() {
        let default = OptimizerConfig::DEFAULT_MAX_UNITS;
        assert_eq!(parse_max_units("500", "V"), 500);
        assert_eq!(parse_max_units(" 7 ", "V"), 7);
        assert_eq!(parse_max_units("0", "V"), default);
        assert_eq!(parse_max_units("-3", "V"), default);
        assert_eq!(parse_max_units("lots", "V"), default);
    }
}
