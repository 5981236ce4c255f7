//! Engine configuration
//!
//! Layered as defaults, then an optional file, then `HRFLOW_*`
//! environment variables (`HRFLOW_<SECTION>__<KEY>`).

use hrflow_types::LeaveType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub leave: LeavePolicyConfig,

    #[serde(default)]
    pub onboarding: OnboardingConfig,

    #[serde(default)]
    pub tickets: TicketConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Leave entitlement policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeavePolicyConfig {
    /// Days granted per leave type when a balance row is first touched.
    /// Keys are leave type names (`annual`, `sick`, ...).
    #[serde(default = "default_entitlements")]
    pub default_entitlements: BTreeMap<String, u32>,
}

impl Default for LeavePolicyConfig {
    fn default() -> Self {
        Self {
            default_entitlements: default_entitlements(),
        }
    }
}

impl LeavePolicyConfig {
    /// Parsed entitlements. Unknown leave type names are an error.
    pub fn entitlements(&self) -> Result<BTreeMap<LeaveType, u32>, ConfigError> {
        self.default_entitlements
            .iter()
            .map(|(name, days)| {
                name.parse::<LeaveType>()
                    .map(|t| (t, *days))
                    .map_err(ConfigError::Invalid)
            })
            .collect()
    }

    pub fn with_entitlement(mut self, leave_type: LeaveType, days: u32) -> Self {
        self.default_entitlements
            .insert(leave_type.as_str().to_string(), days);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingConfig {
    #[serde(default = "default_min_credential_length")]
    pub min_credential_length: usize,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            min_credential_length: default_min_credential_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketConfig {
    /// Ratings are accepted in `1..=max_rating`
    #[serde(default = "default_max_rating")]
    pub max_rating: u8,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            max_rating: default_max_rating(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_entitlements() -> BTreeMap<String, u32> {
    [
        (LeaveType::Annual, 20),
        (LeaveType::Sick, 10),
        (LeaveType::Casual, 5),
        (LeaveType::Maternity, 90),
        (LeaveType::Paternity, 10),
    ]
    .into_iter()
    .map(|(t, days)| (t.as_str().to_string(), days))
    .collect()
}

fn default_min_credential_length() -> usize {
    8
}

fn default_max_rating() -> u8 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl EngineConfig {
    /// Load configuration from an optional file plus the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("HRFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: EngineConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.leave.entitlements()?;
        if self.tickets.max_rating == 0 {
            return Err(ConfigError::Invalid("tickets.max_rating must be at least 1".into()));
        }
        Ok(())
    }
}
