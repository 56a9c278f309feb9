//! Implementation of the `hostwarden evaluate` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::{Action, ActionOutcome, Config, Evaluation, HostId};
use crate::infrastructure::agent::HttpAgentStatusProbe;
use crate::infrastructure::memory::{ClusterFixture, InMemoryCluster, OobmCall};
use crate::services::{Collaborators, ConfigRegistry, HaSupervisor};

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Cluster fixture (YAML) describing hosts, workloads, storage and peers
    #[arg(short, long)]
    pub fixture: PathBuf,

    /// Host(s) to evaluate (comma-separated)
    #[arg(long = "host", required = true, value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Evaluation cycles to run back to back
    #[arg(short, long, default_value = "1")]
    pub rounds: u32,

    /// Query the real status agent over HTTP instead of the fixture counts
    #[arg(long)]
    pub live_agent: bool,
}

#[derive(Debug, Serialize)]
pub struct RoundEvaluation {
    pub round: u32,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

#[derive(Debug, Serialize)]
pub struct EvaluateOutput {
    pub evaluations: Vec<RoundEvaluation>,
    pub errors: Vec<String>,
    pub power_operations: Vec<String>,
}

fn describe_action(action: &Action) -> String {
    match action {
        Action::None => "-".to_string(),
        Action::AwaitRecovery => "await recovery".to_string(),
        Action::Recover => "recover".to_string(),
        Action::Fence => "fence".to_string(),
        Action::Skipped { reason } => format!("skipped ({reason})"),
    }
}

fn describe_outcome(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::NotAttempted => "-".to_string(),
        ActionOutcome::Succeeded => "ok".to_string(),
        ActionOutcome::Failed { error } => format!("failed: {error}"),
    }
}

impl CommandOutput for EvaluateOutput {
    fn to_human(&self) -> String {
        let mut t = table(&["Round", "Host", "Verdict", "Action", "Outcome", "State", "Reasons"]);
        for row in &self.evaluations {
            let e = &row.evaluation;
            let verdict = if e.assessment.needs_attention {
                format!("{} (!)", e.verdict())
            } else {
                e.verdict().to_string()
            };
            t.add_row(vec![
                row.round.to_string(),
                e.host_id.to_string(),
                verdict,
                describe_action(&e.action),
                describe_outcome(&e.outcome),
                e.state.to_string(),
                e.assessment
                    .reasons
                    .iter()
                    .map(|r| truncate(r, 80))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ]);
        }

        let mut lines = vec![t.to_string()];
        for error in &self.errors {
            lines.push(format!("error: {error}"));
        }
        if !self.power_operations.is_empty() {
            lines.push(format!("Power operations: {}", self.power_operations.join(", ")));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: EvaluateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let fixture = ClusterFixture::load(&args.fixture)?;
    let cluster = Arc::new(InMemoryCluster::new(fixture));

    let mut collaborators = Collaborators::from_cluster(cluster.clone());
    if args.live_agent {
        let probe = HttpAgentStatusProbe::new(config.agent.clone())
            .context("Failed to create status agent client")?;
        collaborators = collaborators.with_agent_probe(Arc::new(probe));
    }

    let registry = Arc::new(ConfigRegistry::from_config(config));
    let supervisor = HaSupervisor::new(registry, &collaborators);
    let host_ids: Vec<HostId> = args.hosts.iter().map(HostId::new).collect();

    let mut evaluations = Vec::new();
    let mut errors = Vec::new();
    for round in 1..=args.rounds.max(1) {
        for result in supervisor.evaluate_many(&host_ids).await {
            match result {
                Ok(evaluation) => evaluations.push(RoundEvaluation { round, evaluation }),
                Err(err) => errors.push(format!("round {round}: {err}")),
            }
        }
    }

    let power_operations = cluster
        .oobm_calls()
        .await
        .into_iter()
        .map(|call| match call {
            OobmCall::Reset(host) => format!("reset {host}"),
            OobmCall::PowerOff(host) => format!("power-off {host}"),
        })
        .collect();

    output(
        &EvaluateOutput {
            evaluations,
            errors,
            power_operations,
        },
        json_mode,
    );
    Ok(())
}
