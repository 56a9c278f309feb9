//! Cluster-scoped HA configuration lookup.
//!
//! Lookups never fail: an invalid cluster override falls back to the global
//! value, and an invalid global value falls back to the documented default.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

use crate::domain::models::{ClusterId, Config, HaConfig, HaOverrides};

/// Resolved HA tunables for one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct HaSettings {
    pub health_check_timeout: Duration,
    pub activity_check_timeout: Duration,
    pub activity_check_interval: Duration,
    pub activity_check_max_attempts: u32,
    pub activity_check_failure_ratio: f64,
    pub degraded_max_period: Duration,
    pub recover_timeout: Duration,
    pub recover_wait_period: Duration,
    pub recover_attempt_threshold: u32,
    pub fence_timeout: Duration,
    pub accepted_problematic_hosts_ratio: f64,
    pub cautious_margin: u32,
}

impl Default for HaSettings {
    fn default() -> Self {
        Self::from_config(&HaConfig::default())
    }
}

impl HaSettings {
    fn from_config(ha: &HaConfig) -> Self {
        Self {
            health_check_timeout: Duration::from_secs(ha.health_check_timeout_secs),
            activity_check_timeout: Duration::from_secs(ha.activity_check_timeout_secs),
            activity_check_interval: Duration::from_secs(ha.activity_check_interval_secs),
            activity_check_max_attempts: ha.activity_check_max_attempts,
            activity_check_failure_ratio: ha.activity_check_failure_ratio,
            degraded_max_period: Duration::from_secs(ha.degraded_max_period_secs),
            recover_timeout: Duration::from_secs(ha.recover_timeout_secs),
            recover_wait_period: Duration::from_secs(ha.recover_wait_period_secs),
            recover_attempt_threshold: ha.recover_attempt_threshold,
            fence_timeout: Duration::from_secs(ha.fence_timeout_secs),
            accepted_problematic_hosts_ratio: ha.accepted_problematic_hosts_ratio,
            cautious_margin: ha.cautious_margin,
        }
    }

    /// Inactive probes needed before storage activity is considered absent.
    pub fn inactive_quorum(&self) -> u32 {
        let needed = (self.activity_check_failure_ratio
            * f64::from(self.activity_check_max_attempts)
            - 1e-9)
            .ceil();
        // ratio is in (0, 1] so this is within 1..=max_attempts
        (needed as u32).clamp(1, self.activity_check_max_attempts)
    }
}

/// Explicit configuration lookup keyed by cluster.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    global: HaConfig,
    clusters: BTreeMap<ClusterId, HaOverrides>,
}

impl ConfigRegistry {
    /// Registry with global tunables only; invalid values are replaced by defaults.
    pub fn new(global: HaConfig) -> Self {
        Self {
            global: sanitize_global(global),
            clusters: BTreeMap::new(),
        }
    }

    /// Registry for the loaded configuration, including per-cluster overrides.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new(config.ha.clone());
        for (cluster, overrides) in &config.clusters {
            registry = registry.with_cluster(ClusterId::new(cluster.clone()), overrides.clone());
        }
        registry
    }

    /// Add or replace the overrides for one cluster.
    pub fn with_cluster(mut self, cluster_id: ClusterId, overrides: HaOverrides) -> Self {
        self.clusters.insert(cluster_id, overrides);
        self
    }

    /// Cluster ids that carry overrides.
    pub fn clusters(&self) -> impl Iterator<Item = &ClusterId> {
        self.clusters.keys()
    }

    /// Effective tunables for `cluster_id`, falling back to the global values.
    ///
    /// An override outside its valid range is logged and ignored.
    pub fn settings(&self, cluster_id: &ClusterId) -> HaSettings {
        let g = &self.global;
        let Some(o) = self.clusters.get(cluster_id) else {
            return HaSettings::from_config(g);
        };

        let resolved = HaConfig {
            health_check_timeout_secs: pick(
                cluster_id,
                "health_check_timeout_secs",
                o.health_check_timeout_secs,
                g.health_check_timeout_secs,
                positive_secs,
            ),
            activity_check_timeout_secs: pick(
                cluster_id,
                "activity_check_timeout_secs",
                o.activity_check_timeout_secs,
                g.activity_check_timeout_secs,
                positive_secs,
            ),
            activity_check_interval_secs: o
                .activity_check_interval_secs
                .unwrap_or(g.activity_check_interval_secs),
            activity_check_max_attempts: pick(
                cluster_id,
                "activity_check_max_attempts",
                o.activity_check_max_attempts,
                g.activity_check_max_attempts,
                |v| *v > 0,
            ),
            activity_check_failure_ratio: pick(
                cluster_id,
                "activity_check_failure_ratio",
                o.activity_check_failure_ratio,
                g.activity_check_failure_ratio,
                failure_ratio,
            ),
            degraded_max_period_secs: o
                .degraded_max_period_secs
                .unwrap_or(g.degraded_max_period_secs),
            recover_timeout_secs: pick(
                cluster_id,
                "recover_timeout_secs",
                o.recover_timeout_secs,
                g.recover_timeout_secs,
                positive_secs,
            ),
            recover_wait_period_secs: o
                .recover_wait_period_secs
                .unwrap_or(g.recover_wait_period_secs),
            recover_attempt_threshold: o
                .recover_attempt_threshold
                .unwrap_or(g.recover_attempt_threshold),
            fence_timeout_secs: pick(
                cluster_id,
                "fence_timeout_secs",
                o.fence_timeout_secs,
                g.fence_timeout_secs,
                positive_secs,
            ),
            accepted_problematic_hosts_ratio: pick(
                cluster_id,
                "accepted_problematic_hosts_ratio",
                o.accepted_problematic_hosts_ratio,
                g.accepted_problematic_hosts_ratio,
                unit_ratio,
            ),
            cautious_margin: o.cautious_margin.unwrap_or(g.cautious_margin),
        };

        HaSettings::from_config(&resolved)
    }
}

fn positive_secs(v: &u64) -> bool {
    *v > 0
}

fn unit_ratio(v: &f64) -> bool {
    (0.0..=1.0).contains(v)
}

fn failure_ratio(v: &f64) -> bool {
    *v > 0.0 && *v <= 1.0
}

fn pick<T, F>(cluster_id: &ClusterId, key: &str, value: Option<T>, fallback: T, valid: F) -> T
where
    T: Copy + std::fmt::Debug,
    F: Fn(&T) -> bool,
{
    match value {
        Some(v) if valid(&v) => v,
        Some(v) => {
            warn!(
                cluster_id = %cluster_id,
                key = key,
                value = ?v,
                fallback = ?fallback,
                "invalid cluster override, using global value"
            );
            fallback
        }
        None => fallback,
    }
}

fn sanitize_global(mut ha: HaConfig) -> HaConfig {
    let defaults = HaConfig::default();

    macro_rules! fallback_if {
        ($field:ident, $invalid:expr) => {
            if ($invalid)(&ha.$field) {
                warn!(
                    key = stringify!($field),
                    value = ?ha.$field,
                    default = ?defaults.$field,
                    "invalid HA setting, using default"
                );
                ha.$field = defaults.$field;
            }
        };
    }

    fallback_if!(health_check_timeout_secs, |v: &u64| *v == 0);
    fallback_if!(activity_check_timeout_secs, |v: &u64| *v == 0);
    fallback_if!(activity_check_max_attempts, |v: &u32| *v == 0);
    fallback_if!(activity_check_failure_ratio, |v: &f64| !failure_ratio(v));
    fallback_if!(recover_timeout_secs, |v: &u64| *v == 0);
    fallback_if!(fence_timeout_secs, |v: &u64| *v == 0);
    fallback_if!(accepted_problematic_hosts_ratio, |v: &f64| !unit_ratio(v));

    ha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_cluster_gets_global_defaults() {
        let registry = ConfigRegistry::default();
        let settings = registry.settings(&ClusterId::new("anything"));

        assert_eq!(settings, HaSettings::default());
        assert_eq!(settings.health_check_timeout, Duration::from_secs(10));
        assert_eq!(settings.recover_wait_period, Duration::from_secs(600));
    }

    #[test]
    fn test_cluster_override_wins() {
        let registry = ConfigRegistry::new(HaConfig::default()).with_cluster(
            ClusterId::new("c1"),
            HaOverrides {
                accepted_problematic_hosts_ratio: Some(0.5),
                recover_attempt_threshold: Some(2),
                ..Default::default()
            },
        );

        let c1 = registry.settings(&ClusterId::new("c1"));
        let c2 = registry.settings(&ClusterId::new("c2"));

        assert!((c1.accepted_problematic_hosts_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(c1.recover_attempt_threshold, 2);
        assert_eq!(c1.fence_timeout, Duration::from_secs(60));
        assert!((c2.accepted_problematic_hosts_ratio - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_override_falls_back_to_global() {
        let registry = ConfigRegistry::new(HaConfig::default()).with_cluster(
            ClusterId::new("c1"),
            HaOverrides {
                activity_check_failure_ratio: Some(1.5),
                activity_check_max_attempts: Some(0),
                fence_timeout_secs: Some(0),
                ..Default::default()
            },
        );

        let settings = registry.settings(&ClusterId::new("c1"));
        assert!((settings.activity_check_failure_ratio - 0.7).abs() < f64::EPSILON);
        assert_eq!(settings.activity_check_max_attempts, 10);
        assert_eq!(settings.fence_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_global_falls_back_to_default() {
        let registry = ConfigRegistry::new(HaConfig {
            accepted_problematic_hosts_ratio: -0.1,
            health_check_timeout_secs: 0,
            ..Default::default()
        });

        let settings = registry.settings(&ClusterId::new("c1"));
        assert!((settings.accepted_problematic_hosts_ratio - 0.3).abs() < f64::EPSILON);
        assert_eq!(settings.health_check_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_inactive_quorum() {
        let mut settings = HaSettings::default();
        assert_eq!(settings.inactive_quorum(), 7);

        settings.activity_check_max_attempts = 3;
        settings.activity_check_failure_ratio = 0.5;
        assert_eq!(settings.inactive_quorum(), 2);

        settings.activity_check_failure_ratio = 1.0;
        assert_eq!(settings.inactive_quorum(), 3);
    }
}
