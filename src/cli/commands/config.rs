//! Implementation of the `hostwarden config` commands.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::cli::output::{output, table, CommandOutput};
use crate::domain::models::{ClusterId, Config};
use crate::services::{ConfigRegistry, HaSettings};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective HA settings, globally or for one cluster
    Show {
        /// Cluster whose overrides should be applied
        #[arg(long)]
        cluster: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    pub cluster: Option<String>,
    pub overridden_clusters: Vec<String>,
    pub settings: Vec<SettingRow>,
}

#[derive(Debug, Serialize)]
pub struct SettingRow {
    pub key: &'static str,
    pub value: String,
}

fn settings_rows(s: &HaSettings) -> Vec<SettingRow> {
    let secs = |d: std::time::Duration| format!("{}s", d.as_secs());
    vec![
        ("health_check_timeout", secs(s.health_check_timeout)),
        ("activity_check_timeout", secs(s.activity_check_timeout)),
        ("activity_check_interval", secs(s.activity_check_interval)),
        ("activity_check_max_attempts", s.activity_check_max_attempts.to_string()),
        ("activity_check_failure_ratio", s.activity_check_failure_ratio.to_string()),
        ("inactive_quorum", s.inactive_quorum().to_string()),
        ("degraded_max_period", secs(s.degraded_max_period)),
        ("recover_timeout", secs(s.recover_timeout)),
        ("recover_wait_period", secs(s.recover_wait_period)),
        ("recover_attempt_threshold", s.recover_attempt_threshold.to_string()),
        ("fence_timeout", secs(s.fence_timeout)),
        ("accepted_problematic_hosts_ratio", s.accepted_problematic_hosts_ratio.to_string()),
        ("cautious_margin", s.cautious_margin.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| SettingRow { key, value })
    .collect()
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        let mut t = table(&["Setting", "Value"]);
        for row in &self.settings {
            t.add_row(vec![row.key.to_string(), row.value.clone()]);
        }
        let scope = self
            .cluster
            .as_deref()
            .map_or_else(|| "global".to_string(), |c| format!("cluster {c}"));
        let mut lines = vec![format!("Effective HA settings ({scope})"), t.to_string()];
        if !self.overridden_clusters.is_empty() {
            lines.push(format!(
                "Clusters with overrides: {}",
                self.overridden_clusters.join(", ")
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn show(config: &Config, cluster: Option<String>) -> ConfigShowOutput {
    let registry = ConfigRegistry::from_config(config);
    // a cluster without overrides resolves to the global values
    let cluster_id = ClusterId::new(cluster.clone().unwrap_or_default());
    ConfigShowOutput {
        settings: settings_rows(&registry.settings(&cluster_id)),
        overridden_clusters: registry.clusters().map(ToString::to_string).collect(),
        cluster,
    }
}

pub fn execute(command: ConfigCommands, config: &Config, json_mode: bool) -> Result<()> {
    match command {
        ConfigCommands::Show { cluster } => output(&show(config, cluster), json_mode),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::HaOverrides;

    #[test]
    fn test_show_applies_cluster_overrides() {
        let mut config = Config::default();
        config.clusters.insert(
            "rack-a".to_string(),
            HaOverrides {
                fence_timeout_secs: Some(20),
                ..Default::default()
            },
        );

        let global = show(&config, None);
        let rack = show(&config, Some("rack-a".to_string()));

        let fence = |o: &ConfigShowOutput| {
            o.settings
                .iter()
                .find(|r| r.key == "fence_timeout")
                .map(|r| r.value.clone())
        };
        assert_eq!(fence(&global).as_deref(), Some("60s"));
        assert_eq!(fence(&rack).as_deref(), Some("20s"));
        assert_eq!(rack.overridden_clusters, vec!["rack-a"]);
        assert!(rack.to_human().contains("cluster rack-a"));
    }
}
