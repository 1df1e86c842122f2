use std::path::{Path, PathBuf};

use crate::{
    foundation::{
        core::sanitize_file_stem,
        error::{BatchError, BatchResult},
    },
    plan::model::{
        ColorMode, DEFAULT_CAMERA_NAME, DEFAULT_OUTPUT_DIR, DefaultSettings, EditCategory,
        FileFormat, Plan, RenderOverrides, Variation,
    },
};

/// Invocation-level overrides applied on top of a plan document.
///
/// Paths given here are resolved against the working directory, not the plan's directory.
/// Render fields replace the plan defaults and any per-variation override of the same field.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub blend_override: Option<PathBuf>,
    pub output_override: Option<PathBuf>,
    pub camera_name: Option<String>,
    pub render: RenderOverrides,
    /// Appended after the document's own variations.
    pub extra_variations: Vec<Variation>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanDocument {
    defaults: Option<DefaultsDocument>,
    variations: Option<Vec<Variation>>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultsDocument {
    blend_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    camera_name: Option<String>,
    engine: Option<String>,
    samples: Option<u32>,
    resolution_x: Option<u32>,
    resolution_y: Option<u32>,
    use_denoise: Option<bool>,
    file_format: Option<FileFormat>,
    color_mode: Option<ColorMode>,
    edit_order: Option<Vec<EditCategory>>,
}

/// Load and validate a plan document with no invocation overrides.
pub fn load_plan(path: impl AsRef<Path>) -> BatchResult<Plan> {
    load_plan_with(path, &LoadOptions::default())
}

#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_plan_with(path: impl AsRef<Path>, opts: &LoadOptions) -> BatchResult<Plan> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(BatchError::not_found(format!(
            "plan file does not exist: {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| BatchError::validation(format!("cannot read plan '{}': {e}", path.display())))?;
    let doc = parse_document(path, &text)?;

    let plan_dir = resolve_plan_dir(path)?;

    let Some(variations) = doc.variations else {
        return Err(BatchError::validation(format!(
            "{}: missing required key `variations`",
            path.display()
        )));
    };

    let defaults = doc.defaults.unwrap_or_default();
    build_plan(defaults, variations, &plan_dir, opts)
}

/// Build a plan purely from invocation options, for runs without a plan document.
///
/// Requires `opts.blend_override`; the variations come from `opts.extra_variations`.
pub fn plan_from_options(opts: &LoadOptions) -> BatchResult<Plan> {
    let cwd = std::env::current_dir().map_err(|e| BatchError::Other(e.into()))?;
    build_plan(DefaultsDocument::default(), Vec::new(), &cwd, opts)
}

/// Serialize a plan back into the document shape accepted by [`load_plan`].
pub fn plan_to_yaml(plan: &Plan) -> BatchResult<String> {
    serde_yaml::to_string(plan).map_err(|e| BatchError::serde(e.to_string()))
}

/// Variations that render a scene with `light_name` switched on, then off.
pub fn light_toggle_variations(light_name: &str) -> Vec<Variation> {
    let stem = sanitize_file_stem(light_name).replace(' ', "_");
    [true, false]
        .into_iter()
        .map(|on| Variation {
            name: format!("{stem}_{}", if on { "on" } else { "off" }),
            light_toggles: [(light_name.to_string(), on)].into_iter().collect(),
            ..Variation::default()
        })
        .collect()
}

fn parse_document(path: &Path, text: &str) -> BatchResult<PlanDocument> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let raw: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| BatchError::validation(format!("{}: {e}", path.display())))?;
        if !raw.is_object() {
            return Err(BatchError::validation(format!(
                "{}: top-level plan must be a mapping",
                path.display()
            )));
        }
        serde_json::from_value(raw)
            .map_err(|e| BatchError::validation(format!("{}: {e}", path.display())))
    } else {
        let raw: serde_yaml::Value = serde_yaml::from_str(text)
            .map_err(|e| BatchError::validation(format!("{}: {e}", path.display())))?;
        if !raw.is_mapping() {
            return Err(BatchError::validation(format!(
                "{}: top-level plan must be a mapping",
                path.display()
            )));
        }
        // Re-parse from text so errors carry line/column information.
        serde_yaml::from_str(text)
            .map_err(|e| BatchError::validation(format!("{}: {e}", path.display())))
    }
}

fn build_plan(
    doc: DefaultsDocument,
    mut variations: Vec<Variation>,
    plan_dir: &Path,
    opts: &LoadOptions,
) -> BatchResult<Plan> {
    let blend_path = match (&opts.blend_override, &doc.blend_path) {
        (Some(p), _) => absolute(p)?,
        (None, Some(p)) => plan_dir.join(p),
        (None, None) => {
            return Err(BatchError::validation(
                "defaults.blend_path is required (or pass a blend override)",
            ));
        }
    };
    if blend_path.as_os_str().is_empty() || !blend_path.is_file() {
        return Err(BatchError::not_found(format!(
            "blend file cannot be found: {}",
            blend_path.display()
        )));
    }

    let output_dir = match (&opts.output_override, &doc.output_dir) {
        (Some(p), _) => absolute(p)?,
        (None, Some(p)) => plan_dir.join(p),
        (None, None) => plan_dir.join(DEFAULT_OUTPUT_DIR),
    };

    let mut defaults = DefaultSettings {
        blend_path,
        output_dir,
        camera_name: doc
            .camera_name
            .unwrap_or_else(|| DEFAULT_CAMERA_NAME.to_string()),
        edit_order: doc
            .edit_order
            .unwrap_or_else(|| EditCategory::DEFAULT_ORDER.to_vec()),
        ..DefaultSettings::with_blend_path(PathBuf::new())
    };
    let fallback = defaults.render_settings();
    let doc_render = RenderOverrides {
        engine: doc.engine,
        samples: doc.samples,
        resolution_x: doc.resolution_x,
        resolution_y: doc.resolution_y,
        use_denoise: doc.use_denoise,
        file_format: doc.file_format,
        color_mode: doc.color_mode,
    };
    let resolved = opts.render.apply(&doc_render.apply(&fallback));
    defaults.engine = resolved.engine;
    defaults.samples = resolved.samples;
    defaults.resolution_x = resolved.resolution_x;
    defaults.resolution_y = resolved.resolution_y;
    defaults.use_denoise = resolved.use_denoise;
    defaults.file_format = resolved.file_format;
    defaults.color_mode = resolved.color_mode;
    if let Some(camera) = &opts.camera_name {
        defaults.camera_name = camera.clone();
    }

    variations.extend(opts.extra_variations.iter().cloned());
    for (idx, variation) in variations.iter_mut().enumerate() {
        if variation.name.trim().is_empty() {
            variation.name = format!("variation_{idx:03}");
        }
        if let Some(over) = variation.render.as_mut() {
            clear_forced_fields(over, &opts.render);
        }
        if variation.render.as_ref().is_some_and(RenderOverrides::is_empty) {
            variation.render = None;
        }
    }

    let plan = Plan {
        defaults,
        variations,
    };
    plan.validate()?;
    tracing::debug!(
        variations = plan.variations.len(),
        blend = %plan.defaults.blend_path.display(),
        "plan loaded"
    );
    Ok(plan)
}

fn clear_forced_fields(over: &mut RenderOverrides, forced: &RenderOverrides) {
    if forced.engine.is_some() {
        over.engine = None;
    }
    if forced.samples.is_some() {
        over.samples = None;
    }
    if forced.resolution_x.is_some() {
        over.resolution_x = None;
    }
    if forced.resolution_y.is_some() {
        over.resolution_y = None;
    }
    if forced.use_denoise.is_some() {
        over.use_denoise = None;
    }
    if forced.file_format.is_some() {
        over.file_format = None;
    }
    if forced.color_mode.is_some() {
        over.color_mode = None;
    }
}

fn resolve_plan_dir(path: &Path) -> BatchResult<PathBuf> {
    let canonical = std::fs::canonicalize(path).map_err(|e| {
        BatchError::validation(format!("cannot resolve plan path '{}': {e}", path.display()))
    })?;
    canonical.parent().map(Path::to_path_buf).ok_or_else(|| {
        BatchError::validation(format!("plan path '{}' has no parent directory", path.display()))
    })
}

fn absolute(path: &Path) -> BatchResult<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        BatchError::validation(format!("path '{}' is not well-formed: {e}", path.display()))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/plan/loader.rs"]
mod tests;
