use std::path::{Path, PathBuf};

use crate::{
    exec::output::write_frame,
    foundation::error::{BatchError, BatchResult},
    host::SceneHost,
    translate::command::Command,
};

/// Per-variation lifecycle.
///
/// `Idle -> Mutating -> Rendering -> Written -> ReloadedBaseline`; `Failed` is reachable from
/// `Mutating` and `Rendering`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationState {
    Idle,
    Mutating,
    Rendering,
    Written,
    ReloadedBaseline,
    Failed,
}

impl VariationState {
    fn can_advance_to(self, next: Self) -> bool {
        use VariationState::*;
        matches!(
            (self, next),
            (Idle, Mutating)
                | (Mutating, Rendering)
                | (Rendering, Written)
                | (Written, ReloadedBaseline)
                | (Mutating, Failed)
                | (Rendering, Failed)
        )
    }
}

/// Outcome of executing one variation's commands.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ExecutionResult {
    pub variation: String,
    /// True when no host call was made.
    pub simulated: bool,
    pub state: VariationState,
    pub commands_applied: usize,
    /// Written file (live) or the file that would be written (dry-run).
    pub output: Option<PathBuf>,
    /// One human-readable line per command, in execution order.
    pub log: Vec<String>,
}

enum Target<'h> {
    Live {
        host: &'h mut dyn SceneHost,
        baseline: PathBuf,
    },
    DryRun,
}

/// Replays command sequences against a scene host, or only logs them in dry-run mode.
///
/// The engine owns the host borrow for its whole lifetime; nothing else may touch the scene
/// while it runs.
pub struct ExecutionEngine<'h> {
    target: Target<'h>,
    dirty: bool,
}

impl<'h> ExecutionEngine<'h> {
    /// Live engine. `baseline` is the scene file restored after every rendered variation.
    pub fn live(host: &'h mut dyn SceneHost, baseline: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::Live {
                host,
                baseline: baseline.into(),
            },
            dirty: false,
        }
    }

    pub fn dry_run() -> Self {
        Self {
            target: Target::DryRun,
            dirty: false,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.target, Target::DryRun)
    }

    /// True when the live scene may hold edits that a baseline reload has not cleared.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Load the baseline scene for the first time.
    pub fn load_baseline(&mut self) -> BatchResult<()> {
        match &mut self.target {
            Target::DryRun => Ok(()),
            Target::Live { host, baseline } => {
                host.load_scene(baseline.as_path()).map_err(|e| e.context("load baseline"))?;
                self.dirty = false;
                Ok(())
            }
        }
    }

    /// Throw away every edit by reloading the baseline scene.
    pub fn restore_baseline(&mut self) -> BatchResult<()> {
        match &mut self.target {
            Target::DryRun => Ok(()),
            Target::Live { host, baseline } => {
                if let Err(e) = host.reload(baseline.as_path()) {
                    // Scene state is unknown; the next variation must try again.
                    self.dirty = true;
                    return Err(e.context("reload baseline"));
                }
                self.dirty = false;
                Ok(())
            }
        }
    }

    /// Execute `commands` in order for `variation`.
    ///
    /// Stops at the first failing command. The error names the variation and the command.
    #[tracing::instrument(skip(self, commands), fields(simulated = self.is_simulated()))]
    pub fn execute(&mut self, variation: &str, commands: &[Command]) -> BatchResult<ExecutionResult> {
        let mut result = ExecutionResult {
            variation: variation.to_string(),
            simulated: self.is_simulated(),
            state: VariationState::Idle,
            commands_applied: 0,
            output: None,
            log: Vec::with_capacity(commands.len()),
        };
        advance(&mut result.state, VariationState::Mutating);

        for cmd in commands {
            let line = cmd.to_string();
            if let Command::Render { output, .. } = cmd {
                advance(&mut result.state, VariationState::Rendering);
                result.output = Some(output.clone());
            }

            match self.apply(cmd) {
                Ok(()) => {
                    if result.simulated {
                        tracing::info!("[dry-run] {line}");
                    } else {
                        tracing::debug!("{line}");
                    }
                    result.log.push(line);
                    result.commands_applied += 1;
                }
                Err(e) => {
                    advance(&mut result.state, VariationState::Failed);
                    tracing::warn!(variation, command = %line, error = %e, "command failed");
                    return Err(e.context(format!("variation '{variation}': {}", cmd.kind())));
                }
            }

            if cmd.is_render() {
                if result.simulated {
                    advance(&mut result.state, VariationState::Written);
                    advance(&mut result.state, VariationState::ReloadedBaseline);
                } else {
                    advance(&mut result.state, VariationState::Written);
                    self.restore_baseline()
                        .map_err(|e| e.context(format!("variation '{variation}'")))?;
                    advance(&mut result.state, VariationState::ReloadedBaseline);
                }
            }
        }

        Ok(result)
    }

    fn apply(&mut self, cmd: &Command) -> BatchResult<()> {
        let Target::Live { host, .. } = &mut self.target else {
            return Ok(());
        };
        if !cmd.is_render() {
            self.dirty = true;
        }
        match cmd {
            Command::MoveObject { object, delta } => {
                let handle = host.find_object(object)?;
                host.set_transform(handle, delta)
            }
            Command::SetNodeParam {
                material,
                node,
                param,
                value,
            } => {
                let handle = host.find_material_node(material, node)?;
                host.set_node_param(handle, param, value)
            }
            Command::SpawnPrimitive {
                primitive,
                location,
                params,
            } => host
                .spawn_primitive(*primitive, *location, params)
                .map(|_| ()),
            Command::ToggleLight { light, enabled } => host.set_light_enabled(light, *enabled),
            Command::SetObjectVisibility { object, visible } => {
                host.set_object_visible(object, *visible)
            }
            Command::SetCollectionVisibility {
                collection,
                visible,
            } => host.set_collection_visible(collection, *visible),
            Command::SetCamera { camera } => host.set_active_camera(camera),
            Command::ConfigureCamera {
                camera,
                location,
                rotation_euler,
                lens_mm,
            } => host.configure_camera(camera, *location, *rotation_euler, *lens_mm),
            Command::Render {
                output, settings, ..
            } => {
                let as_render = |e: BatchError| match e {
                    BatchError::HostInteraction(msg) => BatchError::render(msg),
                    other => other,
                };
                host.apply_render_settings(settings).map_err(as_render)?;
                let frame = host.render_frame().map_err(as_render)?;
                write_frame(&frame, output, settings)?;
                tracing::info!(path = %output.display(), "wrote frame");
                Ok(())
            }
        }
    }
}

fn advance(state: &mut VariationState, next: VariationState) {
    debug_assert!(
        state.can_advance_to(next),
        "invalid variation state transition {state:?} -> {next:?}"
    );
    *state = next;
}

/// One-shot form of [`ExecutionEngine::execute`].
///
/// `dry_run` wins over the host: when set, `host` is never called.
pub fn execute(
    variation: &str,
    commands: &[Command],
    host: &mut dyn SceneHost,
    baseline: &Path,
    dry_run: bool,
) -> BatchResult<ExecutionResult> {
    let mut engine = if dry_run {
        ExecutionEngine::dry_run()
    } else {
        ExecutionEngine::live(host, baseline)
    };
    engine.execute(variation, commands)
}

#[cfg(test)]
#[path = "../../tests/unit/exec/engine.rs"]
mod tests;
