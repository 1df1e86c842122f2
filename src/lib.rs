//! batchrender renders named variations of one scene from a declarative plan.
//!
//! # Pipeline overview
//!
//! 1. **Load**: `plan file -> Plan` ([`load_plan`]); every field is validated up front.
//! 2. **Translate**: `Variation -> Vec<Command>` ([`translate`]); pure and ordered.
//! 3. **Execute**: `Command`s are applied through a [`SceneHost`] ([`ExecutionEngine`]), or only
//!    logged in dry-run mode.
//! 4. **Restore**: the baseline scene is reloaded after every variation, so edits never compound.
//!
//! [`run_plan`] drives steps 2-4 for a whole plan.
#![forbid(unsafe_code)]

mod exec;
mod foundation;
mod host;
mod plan;
mod translate;

pub use exec::engine::{ExecutionEngine, ExecutionResult, VariationState, execute};
pub use exec::output::write_frame;
pub use exec::runner::{RunOptions, RunReport, VariationOutcome, run_plan};
pub use foundation::core::{NodeValue, Vec3, sanitize_file_stem};
pub use foundation::error::{BatchError, BatchResult};
pub use host::preview::{
    Collection, MAX_PREVIEW_PIXELS, Material, MaterialNode, ObjectKind, PreviewScene,
    SceneManifest, SceneObject,
};
pub use host::{InventoryEntry, NodeHandle, ObjectHandle, RenderedFrame, SceneHost};
pub use plan::loader::{
    LoadOptions, light_toggle_variations, load_plan, load_plan_with, plan_from_options,
    plan_to_yaml,
};
pub use plan::model::{
    CameraOverride, ColorMode, DEFAULT_CAMERA_NAME, DEFAULT_OUTPUT_DIR, DefaultSettings,
    EditCategory, FileFormat, MAX_RESOLUTION, NodeEdit, ObjectEdit, Plan, PrimitiveKind,
    RenderOverrides, RenderSettings, Spawn, TransformDelta, Variation, VisibilityToggle,
};
pub use translate::command::{Command, SpawnParams};
pub use translate::translator::translate;
