use crate::{
    exec::engine::{ExecutionEngine, ExecutionResult},
    foundation::error::{BatchError, BatchResult},
    host::SceneHost,
    plan::model::Plan,
    translate::translator::translate,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Log every command instead of calling the host.
    pub dry_run: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariationOutcome {
    Completed(ExecutionResult),
    Failed {
        variation: String,
        error: String,
    },
    /// Not attempted because the baseline scene could no longer be restored.
    Skipped {
        variation: String,
        reason: String,
    },
}

impl VariationOutcome {
    pub fn variation(&self) -> &str {
        match self {
            Self::Completed(r) => &r.variation,
            Self::Failed { variation, .. } | Self::Skipped { variation, .. } => variation,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Result of a whole plan run, in plan order.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunReport {
    pub simulated: bool,
    pub outcomes: Vec<VariationOutcome>,
}

impl RunReport {
    pub fn completed(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_completed())
            .map(VariationOutcome::variation)
    }

    pub fn not_completed(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_completed())
            .map(VariationOutcome::variation)
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(VariationOutcome::is_completed)
    }

    /// 0 when every variation completed, 2 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 2 }
    }
}

/// Render every variation of `plan` in order.
///
/// The baseline is loaded once up front and restored after each variation, so edits never
/// carry over. A failing variation is recorded and the run moves on; only a failure to
/// load or restore the baseline stops it. With `opts.dry_run` the host is never touched and
/// may be `None`.
#[tracing::instrument(skip_all, fields(variations = plan.variations.len(), dry_run = opts.dry_run))]
pub fn run_plan(
    plan: &Plan,
    host: Option<&mut dyn SceneHost>,
    opts: &RunOptions,
) -> BatchResult<RunReport> {
    let mut engine = match (opts.dry_run, host) {
        (true, _) => ExecutionEngine::dry_run(),
        (false, Some(host)) => ExecutionEngine::live(host, &plan.defaults.blend_path),
        (false, None) => {
            return Err(BatchError::host(
                "a live run needs a scene host; use dry-run to validate without one",
            ));
        }
    };
    let mut report = RunReport {
        simulated: engine.is_simulated(),
        outcomes: Vec::with_capacity(plan.variations.len()),
    };

    if plan.variations.is_empty() {
        tracing::warn!("no variations defined; nothing to render");
        return Ok(report);
    }

    engine.load_baseline()?;

    let total = plan.variations.len();
    let mut abort_reason: Option<String> = None;
    for (idx, variation) in plan.variations.iter().enumerate() {
        if let Some(reason) = &abort_reason {
            report.outcomes.push(VariationOutcome::Skipped {
                variation: variation.name.clone(),
                reason: reason.clone(),
            });
            continue;
        }
        if engine.is_dirty() {
            if let Err(e) = engine.restore_baseline() {
                tracing::error!(error = %e, "baseline could not be restored; skipping the rest");
                let reason = e.to_string();
                report.outcomes.push(VariationOutcome::Skipped {
                    variation: variation.name.clone(),
                    reason: reason.clone(),
                });
                abort_reason = Some(reason);
                continue;
            }
        }

        tracing::info!("=== variation {} ({}/{total}) ===", variation.name, idx + 1);
        if variation.is_noop() {
            tracing::debug!(variation = %variation.name, "no edits; rendering the baseline");
        }

        let commands = translate(variation, &plan.defaults);
        match engine.execute(&variation.name, &commands) {
            Ok(result) => report.outcomes.push(VariationOutcome::Completed(result)),
            Err(e) => {
                tracing::error!(variation = %variation.name, error = %e, "variation failed");
                report.outcomes.push(VariationOutcome::Failed {
                    variation: variation.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let failed: Vec<&str> = report.not_completed().collect();
    if failed.is_empty() {
        tracing::info!(rendered = total, "run complete");
    } else {
        tracing::warn!(
            completed = total - failed.len(),
            failed = ?failed,
            "run finished with failures"
        );
    }
    Ok(report)
}

#[cfg(test)]
#[path = "../../tests/unit/exec/runner.rs"]
mod tests;
