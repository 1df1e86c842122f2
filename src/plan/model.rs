use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use crate::foundation::{
    core::{NodeValue, Vec3, sanitize_file_stem},
    error::{BatchError, BatchResult},
};

/// A full render plan: resolved defaults plus the ordered variations to render.
///
/// Constructed once per invocation by [`crate::load_plan`] and read-only afterwards.
/// Variation order is render order.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Plan {
    pub defaults: DefaultSettings,
    pub variations: Vec<Variation>,
}

/// Plan-wide settings, fully resolved (every fallback already applied).
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DefaultSettings {
    pub blend_path: PathBuf,
    pub output_dir: PathBuf,
    pub camera_name: String,
    pub engine: String,
    pub samples: u32,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub use_denoise: bool,
    pub file_format: FileFormat,
    pub color_mode: ColorMode,
    pub edit_order: Vec<EditCategory>,
}

pub const DEFAULT_OUTPUT_DIR: &str = "render_output";
pub const DEFAULT_CAMERA_NAME: &str = "Camera";

/// Largest accepted value for either render resolution axis.
pub const MAX_RESOLUTION: u32 = 65_536;

/// Render parameters handed to the host right before a frame is produced.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenderSettings {
    pub engine: String,
    pub samples: u32,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub use_denoise: bool,
    pub file_format: FileFormat,
    pub color_mode: ColorMode,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            engine: "CYCLES".to_string(),
            samples: 128,
            resolution_x: 1024,
            resolution_y: 1024,
            use_denoise: true,
            file_format: FileFormat::Png,
            color_mode: ColorMode::Rgb,
        }
    }
}

impl RenderSettings {
    pub fn validate(&self, context: &str) -> BatchResult<()> {
        if self.engine.trim().is_empty() {
            return Err(BatchError::validation(format!(
                "{context}.engine must be non-empty"
            )));
        }
        if self.samples == 0 {
            return Err(BatchError::validation(format!(
                "{context}.samples must be a positive integer"
            )));
        }
        if self.resolution_x == 0 || self.resolution_y == 0 {
            return Err(BatchError::validation(format!(
                "{context}.resolution_x/resolution_y must be positive integers"
            )));
        }
        if self.resolution_x > MAX_RESOLUTION || self.resolution_y > MAX_RESOLUTION {
            return Err(BatchError::validation(format!(
                "{context}.resolution_x/resolution_y must be at most {MAX_RESOLUTION}, got {}x{}",
                self.resolution_x, self.resolution_y
            )));
        }
        Ok(())
    }
}

/// Per-variation partial override of the plan's render settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_x: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_y: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_denoise: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_format: Option<FileFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<ColorMode>,
}

impl RenderOverrides {
    pub fn apply(&self, base: &RenderSettings) -> RenderSettings {
        RenderSettings {
            engine: self.engine.clone().unwrap_or_else(|| base.engine.clone()),
            samples: self.samples.unwrap_or(base.samples),
            resolution_x: self.resolution_x.unwrap_or(base.resolution_x),
            resolution_y: self.resolution_y.unwrap_or(base.resolution_y),
            use_denoise: self.use_denoise.unwrap_or(base.use_denoise),
            file_format: self.file_format.unwrap_or(base.file_format),
            color_mode: self.color_mode.unwrap_or(base.color_mode),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FileFormat {
    #[serde(rename = "PNG")]
    Png,
    #[serde(rename = "JPEG", alias = "JPG")]
    Jpeg,
    #[serde(rename = "TIFF")]
    Tiff,
    #[serde(rename = "OPEN_EXR", alias = "EXR")]
    OpenExr,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Tiff => "tiff",
            Self::OpenExr => "exr",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ColorMode {
    #[serde(rename = "BW")]
    Bw,
    #[serde(rename = "RGB")]
    Rgb,
    #[serde(rename = "RGBA")]
    Rgba,
}

/// Groups of scene edits. The translator emits whole groups in the plan's `edit_order`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EditCategory {
    Objects,
    Nodes,
    Spawns,
    Lights,
    Visibility,
    Camera,
}

impl EditCategory {
    /// Order used when a plan does not set `edit_order`.
    ///
    /// Node edits run before spawns, so a node edit can never reach a material that only a
    /// spawn in the same variation would assign. Plans that need that put `spawns` first.
    pub const DEFAULT_ORDER: [EditCategory; 6] = [
        EditCategory::Objects,
        EditCategory::Nodes,
        EditCategory::Spawns,
        EditCategory::Lights,
        EditCategory::Visibility,
        EditCategory::Camera,
    ];
}

/// One named set of scene edits producing exactly one output file.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variation {
    /// Empty names are replaced by `variation_NNN` at load time.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_edits: Vec<ObjectEdit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_edits: Vec<NodeEdit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spawns: Vec<Spawn>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub light_toggles: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visibility: Vec<VisibilityToggle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collection_visibility: Vec<VisibilityToggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderOverrides>,
}

impl Variation {
    /// True when rendering this variation would just reproduce the baseline.
    pub fn is_noop(&self) -> bool {
        self.object_edits.is_empty()
            && self.node_edits.is_empty()
            && self.spawns.is_empty()
            && self.light_toggles.is_empty()
            && self.visibility.is_empty()
            && self.collection_visibility.is_empty()
            && self.camera.is_none()
    }

    pub fn file_stem(&self) -> String {
        sanitize_file_stem(&self.name)
    }
}

/// Relative transform applied to an existing object.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformDelta {
    /// Added to the location.
    pub offset: Vec3,
    /// Added to the euler rotation (radians).
    pub rotation: Vec3,
    /// Multiplied into the scale.
    pub scale: Vec3,
}

impl Default for TransformDelta {
    fn default() -> Self {
        Self {
            offset: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectEdit {
    #[serde(alias = "name")]
    pub object: String,
    #[serde(default)]
    pub offset: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

impl ObjectEdit {
    pub fn delta(&self) -> TransformDelta {
        TransformDelta {
            offset: self.offset,
            rotation: self.rotation,
            scale: self.scale,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeEdit {
    pub material: String,
    pub node: String,
    #[serde(alias = "socket")]
    pub param: String,
    pub value: NodeValue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Cube,
    #[serde(alias = "sphere")]
    UvSphere,
    IcoSphere,
    Cylinder,
    Cone,
    Plane,
    Circle,
    Torus,
    Grid,
    Monkey,
}

impl PrimitiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::UvSphere => "uv_sphere",
            Self::IcoSphere => "ico_sphere",
            Self::Cylinder => "cylinder",
            Self::Cone => "cone",
            Self::Plane => "plane",
            Self::Circle => "circle",
            Self::Torus => "torus",
            Self::Grid => "grid",
            Self::Monkey => "monkey",
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Spawn {
    #[serde(default = "default_primitive")]
    pub primitive: PrimitiveKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisibilityToggle {
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
}

/// Camera change for one variation.
///
/// In a plan this is either a bare camera name (`camera: CamFront`) or a mapping with
/// `name`, `location`, `rotation_euler` and `lens_mm`, all optional.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "CameraDocument")]
pub struct CameraOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Vec3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_euler: Option<Vec3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens_mm: Option<f64>,
}

impl CameraOverride {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn has_transform(&self) -> bool {
        self.location.is_some() || self.rotation_euler.is_some() || self.lens_mm.is_some()
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum CameraDocument {
    Name(String),
    Fields(CameraFields),
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct CameraFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<Vec3>,
    #[serde(default)]
    rotation_euler: Option<Vec3>,
    #[serde(default)]
    lens_mm: Option<f64>,
}

impl From<CameraDocument> for CameraOverride {
    fn from(doc: CameraDocument) -> Self {
        match doc {
            CameraDocument::Name(name) => Self::named(name),
            CameraDocument::Fields(f) => Self {
                name: f.name,
                location: f.location,
                rotation_euler: f.rotation_euler,
                lens_mm: f.lens_mm,
            },
        }
    }
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

fn default_true() -> bool {
    true
}

fn default_primitive() -> PrimitiveKind {
    PrimitiveKind::Cube
}

impl DefaultSettings {
    /// Built-in fallbacks for everything except the baseline scene path.
    pub fn with_blend_path(blend_path: impl Into<PathBuf>) -> Self {
        let render = RenderSettings::default();
        Self {
            blend_path: blend_path.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            camera_name: DEFAULT_CAMERA_NAME.to_string(),
            engine: render.engine,
            samples: render.samples,
            resolution_x: render.resolution_x,
            resolution_y: render.resolution_y,
            use_denoise: render.use_denoise,
            file_format: render.file_format,
            color_mode: render.color_mode,
            edit_order: EditCategory::DEFAULT_ORDER.to_vec(),
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            engine: self.engine.clone(),
            samples: self.samples,
            resolution_x: self.resolution_x,
            resolution_y: self.resolution_y,
            use_denoise: self.use_denoise,
            file_format: self.file_format,
            color_mode: self.color_mode,
        }
    }

    /// Effective render settings for one variation.
    pub fn resolve_render(&self, variation: &Variation) -> RenderSettings {
        let base = self.render_settings();
        match &variation.render {
            Some(over) => over.apply(&base),
            None => base,
        }
    }

    /// Deterministic output file for a variation: `{output_dir}/{stem}.{ext}`.
    pub fn output_path(&self, variation: &Variation, settings: &RenderSettings) -> PathBuf {
        self.output_dir.join(format!(
            "{}.{}",
            variation.file_stem(),
            settings.file_format.extension()
        ))
    }
}

impl Plan {
    pub fn validate(&self) -> BatchResult<()> {
        self.defaults.render_settings().validate("defaults")?;
        validate_edit_order(&self.defaults.edit_order)?;
        if self.defaults.camera_name.trim().is_empty() {
            return Err(BatchError::validation("defaults.camera_name must be non-empty"));
        }
        require_path(&self.defaults.blend_path, "defaults.blend_path")?;
        require_path(&self.defaults.output_dir, "defaults.output_dir")?;

        let mut names = BTreeSet::new();
        let mut stems = BTreeMap::new();
        for (idx, variation) in self.variations.iter().enumerate() {
            let ctx = format!("variations[{idx}]");
            if variation.name.trim().is_empty() {
                return Err(BatchError::validation(format!("{ctx}.name must be non-empty")));
            }
            if !names.insert(variation.name.as_str()) {
                return Err(BatchError::validation(format!(
                    "{ctx}.name: duplicate variation name '{}'",
                    variation.name
                )));
            }
            if let Some(prev) = stems.insert(variation.file_stem(), variation.name.as_str()) {
                return Err(BatchError::validation(format!(
                    "{ctx}.name: '{}' and '{prev}' map to the same output file",
                    variation.name
                )));
            }
            variation.validate(&ctx)?;
            self.defaults
                .resolve_render(variation)
                .validate(&format!("{ctx}.render"))?;
        }
        Ok(())
    }
}

impl Variation {
    fn validate(&self, ctx: &str) -> BatchResult<()> {
        for (i, edit) in self.object_edits.iter().enumerate() {
            let at = format!("{ctx}.object_edits[{i}]");
            require_name(&edit.object, &format!("{at}.object"))?;
            let d = edit.delta();
            if !(d.offset.is_finite() && d.rotation.is_finite() && d.scale.is_finite()) {
                return Err(BatchError::validation(format!("{at}: non-finite transform")));
            }
        }
        for (i, edit) in self.node_edits.iter().enumerate() {
            let at = format!("{ctx}.node_edits[{i}]");
            require_name(&edit.material, &format!("{at}.material"))?;
            require_name(&edit.node, &format!("{at}.node"))?;
            require_name(&edit.param, &format!("{at}.param"))?;
            if !edit.value.is_finite() {
                return Err(BatchError::validation(format!("{at}.value must be finite")));
            }
        }
        for (i, spawn) in self.spawns.iter().enumerate() {
            let at = format!("{ctx}.spawns[{i}]");
            if let Some(name) = &spawn.name {
                require_name(name, &format!("{at}.name"))?;
            }
            if !(spawn.location.is_finite() && spawn.rotation.is_finite() && spawn.scale.is_finite())
            {
                return Err(BatchError::validation(format!("{at}: non-finite transform")));
            }
        }
        for light in self.light_toggles.keys() {
            require_name(light, &format!("{ctx}.light_toggles"))?;
        }
        for (i, t) in self.visibility.iter().enumerate() {
            require_name(&t.name, &format!("{ctx}.visibility[{i}].name"))?;
        }
        for (i, t) in self.collection_visibility.iter().enumerate() {
            require_name(&t.name, &format!("{ctx}.collection_visibility[{i}].name"))?;
        }
        if let Some(cam) = &self.camera {
            if let Some(name) = &cam.name {
                require_name(name, &format!("{ctx}.camera.name"))?;
            }
            if let Some(lens) = cam.lens_mm {
                if !(lens.is_finite() && lens > 0.0) {
                    return Err(BatchError::validation(format!(
                        "{ctx}.camera.lens_mm must be > 0"
                    )));
                }
            }
            let finite = cam.location.is_none_or(Vec3::is_finite)
                && cam.rotation_euler.is_none_or(Vec3::is_finite);
            if !finite {
                return Err(BatchError::validation(format!("{ctx}.camera: non-finite transform")));
            }
        }
        Ok(())
    }
}

pub fn validate_edit_order(order: &[EditCategory]) -> BatchResult<()> {
    let unique: BTreeSet<_> = order.iter().copied().collect();
    if order.len() != EditCategory::DEFAULT_ORDER.len()
        || unique.len() != EditCategory::DEFAULT_ORDER.len()
    {
        return Err(BatchError::validation(
            "defaults.edit_order must list each of objects, nodes, spawns, lights, visibility, camera exactly once",
        ));
    }
    Ok(())
}

fn require_name(value: &str, at: &str) -> BatchResult<()> {
    if value.trim().is_empty() {
        return Err(BatchError::validation(format!("{at} must be non-empty")));
    }
    Ok(())
}

fn require_path(path: &Path, at: &str) -> BatchResult<()> {
    if path.as_os_str().is_empty() {
        return Err(BatchError::validation(format!("{at} must be non-empty")));
    }
    if path.to_str().is_some_and(|s| s.contains('\0')) {
        return Err(BatchError::validation(format!("{at} contains a NUL byte")));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/plan/model.rs"]
mod tests;
