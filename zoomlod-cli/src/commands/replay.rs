//! `zoomlod replay`: drive the controller through a scenario file.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use zoomlod::fetch::CompletionHandler;
use zoomlod::{
    FeatureStore, LodConfig, Protocol, ReadRequest, ReadResponse, RequestHandle, UpdateOutcome,
    ViewportController,
};

use crate::error::CliError;
use crate::scenario::{to_features, to_rect, Scenario, StepView};

/// Arguments for `zoomlod replay`.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Print one JSON object per step instead of text
    #[arg(long)]
    json: bool,
}

/// Transport that records reads and completes them on request.
#[derive(Default)]
struct ReplayProtocol {
    pending: Vec<(RequestHandle, CompletionHandler)>,
    reads: usize,
    aborts: usize,
}

impl ReplayProtocol {
    /// Complete the most recent pending read. Returns false if none is pending.
    fn complete_latest(&mut self, response: ReadResponse) -> bool {
        match self.pending.pop() {
            Some((_, handler)) => {
                handler(response);
                true
            }
            None => false,
        }
    }
}

impl Protocol for ReplayProtocol {
    fn read(&mut self, request: ReadRequest) -> RequestHandle {
        self.reads += 1;
        let handle = RequestHandle::new(request.id.value());
        tracing::debug!(
            request = %request.id,
            params = ?request.params,
            bounds = ?request.filter.bounds,
            "Recorded read"
        );
        self.pending.push((handle.clone(), request.on_complete));
        handle
    }

    fn abort(&mut self, handle: &RequestHandle) {
        tracing::debug!(handle = handle.raw(), "Recorded abort");
        self.aborts += 1;
        self.pending.retain(|(h, _)| h != handle);
    }
}

/// Decision taken for one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub zoom: u8,
    pub level: String,
    pub fetched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<u64>,
    /// Fetch trigger or skip reason.
    pub reason: String,
    pub pending_reads: usize,
    pub features: usize,
}

/// Run the replay command.
pub fn run(config: LodConfig, args: ReplayArgs) -> Result<(), CliError> {
    let scenario = Scenario::load(&args.scenario)?;
    tracing::info!(
        path = %args.scenario.display(),
        steps = scenario.steps.len(),
        "Replaying scenario"
    );

    let (reports, summary) = replay(config, &scenario)?;

    for report in &reports {
        if args.json {
            println!(
                "{}",
                serde_json::to_string(report).map_err(CliError::Output)?
            );
        } else {
            println!("{}", format_report(report));
        }
    }
    if !args.json {
        println!(
            "{} steps, {} reads, {} aborted",
            reports.len(),
            summary.reads,
            summary.aborts
        );
    }
    Ok(())
}

/// Totals over a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub reads: usize,
    pub aborts: usize,
}

/// Replay `scenario` and report each decision.
pub fn replay(
    config: LodConfig,
    scenario: &Scenario,
) -> Result<(Vec<StepReport>, ReplaySummary), CliError> {
    let store = FeatureStore::with_features(to_features(&scenario.features));
    let mut controller = ViewportController::from_config(
        config,
        ReplayProtocol::default(),
        Arc::new(store.clone()),
    );

    let mut extent = None;
    let mut reports = Vec::with_capacity(scenario.steps.len());

    for (index, step) in scenario.steps.iter().enumerate() {
        let number = index + 1;
        if let Some(e) = step.extent {
            extent = Some(to_rect(e));
        }

        let view = StepView::new(step, extent, &store);
        let outcome = controller
            .update(&view, &step.options())
            .map_err(|error| CliError::Replay {
                step: number,
                error,
            })?;

        if let Some(response) = &step.response {
            let protocol = controller.fetch_mut().protocol_mut();
            if !protocol.complete_latest(response.to_response()) {
                tracing::warn!(step = number, "Response given but no read is pending");
            }
        }

        let (request, reason) = match outcome {
            UpdateOutcome::Fetched {
                request, trigger, ..
            } => (Some(request.value()), trigger.to_string()),
            UpdateOutcome::Skipped { reason, .. } => (None, reason.to_string()),
        };

        reports.push(StepReport {
            step: number,
            zoom: step.zoom,
            level: outcome.level().to_param(),
            fetched: outcome.fetched(),
            request,
            reason,
            pending_reads: controller.fetch().protocol().pending.len(),
            features: store.len(),
        });
    }

    let protocol = controller.fetch().protocol();
    let summary = ReplaySummary {
        reads: protocol.reads,
        aborts: protocol.aborts,
    };
    Ok((reports, summary))
}

fn format_report(report: &StepReport) -> String {
    let action = match report.request {
        Some(id) => format!("fetch #{} ({})", id, report.reason),
        None => format!("skip ({})", report.reason),
    };
    format!(
        "step {:>3}  zoom {:>2}  {}  {:<32}  pending {}  features {}",
        report.step, report.zoom, report.level, action, report.pending_reads, report.features
    )
}
