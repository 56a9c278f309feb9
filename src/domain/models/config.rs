use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Main configuration structure for hostwarden
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Global HA tunables, applied to every cluster without an override
    #[serde(default)]
    pub ha: HaConfig,

    /// Per-cluster overrides keyed by cluster id
    #[serde(default)]
    pub clusters: BTreeMap<String, HaOverrides>,

    /// Host-resident status agent
    #[serde(default)]
    pub agent: AgentConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ha: HaConfig::default(),
            clusters: BTreeMap::new(),
            agent: AgentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HA tunables. Durations are in seconds, ratios in `[0.0, 1.0]`.
///
/// Deserialized through [`HaOverrides`]: a missing or mistyped key takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "HaOverrides")]
pub struct HaConfig {
    /// Max wait for a single health probe
    pub health_check_timeout_secs: u64,

    /// Max wait for a single storage-activity probe
    pub activity_check_timeout_secs: u64,

    /// Pause between storage-activity probes
    pub activity_check_interval_secs: u64,

    /// Storage-activity probes per evaluation
    pub activity_check_max_attempts: u32,

    /// Fraction of probes that must report no activity before activity is considered absent
    pub activity_check_failure_ratio: f64,

    /// How long a host stays in health-checks-only mode after being found alive but isolated
    pub degraded_max_period_secs: u64,

    /// Max wait for a single recovery (reset) operation
    pub recover_timeout_secs: u64,

    /// Time to let a recovered host come back before acting again
    pub recover_wait_period_secs: u64,

    /// Recovery attempts before escalating to fencing
    pub recover_attempt_threshold: u32,

    /// Max wait for a fence (power-off) operation
    pub fence_timeout_secs: u64,

    /// Cluster-wide problematic fraction above which no host is fenced
    pub accepted_problematic_hosts_ratio: f64,

    /// Expected workloads tolerated when the agent reports zero running
    pub cautious_margin: u32,
}

const fn default_health_check_timeout_secs() -> u64 {
    10
}

const fn default_activity_check_timeout_secs() -> u64 {
    60
}

const fn default_activity_check_interval_secs() -> u64 {
    60
}

const fn default_activity_check_max_attempts() -> u32 {
    10
}

const fn default_activity_check_failure_ratio() -> f64 {
    0.7
}

const fn default_degraded_max_period_secs() -> u64 {
    300
}

const fn default_recover_timeout_secs() -> u64 {
    60
}

const fn default_recover_wait_period_secs() -> u64 {
    600
}

const fn default_recover_attempt_threshold() -> u32 {
    1
}

const fn default_fence_timeout_secs() -> u64 {
    60
}

const fn default_accepted_problematic_hosts_ratio() -> f64 {
    0.3
}

const fn default_cautious_margin() -> u32 {
    1
}

impl Default for HaConfig {
    fn default() -> Self {
        Self {
            health_check_timeout_secs: default_health_check_timeout_secs(),
            activity_check_timeout_secs: default_activity_check_timeout_secs(),
            activity_check_interval_secs: default_activity_check_interval_secs(),
            activity_check_max_attempts: default_activity_check_max_attempts(),
            activity_check_failure_ratio: default_activity_check_failure_ratio(),
            degraded_max_period_secs: default_degraded_max_period_secs(),
            recover_timeout_secs: default_recover_timeout_secs(),
            recover_wait_period_secs: default_recover_wait_period_secs(),
            recover_attempt_threshold: default_recover_attempt_threshold(),
            fence_timeout_secs: default_fence_timeout_secs(),
            accepted_problematic_hosts_ratio: default_accepted_problematic_hosts_ratio(),
            cautious_margin: default_cautious_margin(),
        }
    }
}

/// Cluster-scoped overrides. Unset fields inherit the global value.
///
/// A value of the wrong type is logged and treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HaOverrides {
    #[serde(default, deserialize_with = "lenient")]
    pub health_check_timeout_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub activity_check_timeout_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub activity_check_interval_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub activity_check_max_attempts: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub activity_check_failure_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub degraded_max_period_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub recover_timeout_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub recover_wait_period_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub recover_attempt_threshold: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub fence_timeout_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub accepted_problematic_hosts_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub cautious_margin: Option<u32>,
}

impl From<HaOverrides> for HaConfig {
    fn from(o: HaOverrides) -> Self {
        let d = Self::default();
        Self {
            health_check_timeout_secs: o
                .health_check_timeout_secs
                .unwrap_or(d.health_check_timeout_secs),
            activity_check_timeout_secs: o
                .activity_check_timeout_secs
                .unwrap_or(d.activity_check_timeout_secs),
            activity_check_interval_secs: o
                .activity_check_interval_secs
                .unwrap_or(d.activity_check_interval_secs),
            activity_check_max_attempts: o
                .activity_check_max_attempts
                .unwrap_or(d.activity_check_max_attempts),
            activity_check_failure_ratio: o
                .activity_check_failure_ratio
                .unwrap_or(d.activity_check_failure_ratio),
            degraded_max_period_secs: o
                .degraded_max_period_secs
                .unwrap_or(d.degraded_max_period_secs),
            recover_timeout_secs: o.recover_timeout_secs.unwrap_or(d.recover_timeout_secs),
            recover_wait_period_secs: o
                .recover_wait_period_secs
                .unwrap_or(d.recover_wait_period_secs),
            recover_attempt_threshold: o
                .recover_attempt_threshold
                .unwrap_or(d.recover_attempt_threshold),
            fence_timeout_secs: o.fence_timeout_secs.unwrap_or(d.fence_timeout_secs),
            accepted_problematic_hosts_ratio: o
                .accepted_problematic_hosts_ratio
                .unwrap_or(d.accepted_problematic_hosts_ratio),
            cautious_margin: o.cautious_margin.unwrap_or(d.cautious_margin),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(serde_json::Value),
}

/// Accept a well-typed value, otherwise warn and fall back to unset.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<Lenient<T>>::deserialize(deserializer)? {
        Some(Lenient::Valid(value)) => Ok(Some(value)),
        Some(Lenient::Invalid(raw)) => {
            warn!(
                value = %raw,
                expected = std::any::type_name::<T>(),
                "ignoring mistyped HA tunable, using default"
            );
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Host-resident status agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Whether the status web service is deployed on hosts
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Port the status web service listens on
    #[serde(default = "default_agent_port")]
    pub port: u16,

    /// URL scheme (http or https)
    #[serde(default = "default_agent_scheme")]
    pub scheme: String,

    /// Fixed delay before the single retry, in milliseconds
    #[serde(default = "default_agent_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_agent_port() -> u16 {
    8080
}

fn default_agent_scheme() -> String {
    "http".to_string()
}

const fn default_agent_retry_delay_ms() -> u64 {
    2000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_agent_port(),
            scheme: default_agent_scheme(),
            retry_delay_ms: default_agent_retry_delay_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Log file rotation: daily, hourly or never
    #[serde(default = "default_log_rotation")]
    pub rotation: String,

    /// Also log to stderr when writing files
    #[serde(default = "default_true")]
    pub console: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_log_rotation(),
            console: default_true(),
        }
    }
}
