use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    foundation::{
        core::{NodeValue, Vec3},
        error::{BatchError, BatchResult},
    },
    host::{InventoryEntry, NodeHandle, ObjectHandle, RenderedFrame, SceneHost},
    plan::model::{PrimitiveKind, RenderSettings, TransformDelta},
    translate::command::SpawnParams,
};

/// Largest frame (in pixels) the preview rasterizer will allocate.
pub const MAX_PREVIEW_PIXELS: u64 = 1 << 26;

/// Scene description consumed by [`PreviewScene`].
///
/// Stored as JSON (`.json`) or YAML (anything else).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneManifest {
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub active_camera: Option<String>,
    #[serde(default = "default_world_color")]
    pub world_color: [f64; 3],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Mesh,
    Light,
    Camera,
    Empty,
}

impl ObjectKind {
    fn label(self) -> &'static str {
        match self {
            Self::Mesh => "MESH",
            Self::Light => "LIGHT",
            Self::Camera => "CAMERA",
            Self::Empty => "EMPTY",
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneObject {
    pub name: String,
    #[serde(default)]
    pub kind: ObjectKind,
    #[serde(default = "default_shape")]
    pub shape: PrimitiveKind,
    #[serde(default)]
    pub location: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    /// Lights only.
    #[serde(default = "default_energy")]
    pub energy: f64,
    /// Lights only.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cameras only.
    #[serde(default = "default_lens")]
    pub lens_mm: f64,
}

impl SceneObject {
    fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            shape: default_shape(),
            location: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            visible: true,
            collection: None,
            material: None,
            energy: default_energy(),
            enabled: true,
            lens_mm: default_lens(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<MaterialNode>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialNode {
    pub name: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, NodeValue>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Collection {
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_world_color() -> [f64; 3] {
    [0.05, 0.05, 0.08]
}

fn default_shape() -> PrimitiveKind {
    PrimitiveKind::Cube
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_true() -> bool {
    true
}

fn default_energy() -> f64 {
    1000.0
}

fn default_lens() -> f64 {
    50.0
}

impl SceneManifest {
    pub fn read(path: &Path) -> BatchResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read scene '{}'", path.display()))
            .map_err(|e| BatchError::host(format!("{e:#}")))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let manifest: Self = if is_json {
            serde_json::from_str(&text)
                .map_err(|e| BatchError::host(format!("{}: {e}", path.display())))?
        } else {
            serde_yaml::from_str(&text)
                .map_err(|e| BatchError::host(format!("{}: {e}", path.display())))?
        };
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> BatchResult<()> {
        let mut seen = std::collections::BTreeSet::new();
        for obj in &self.objects {
            if !seen.insert(obj.name.as_str()) {
                return Err(BatchError::host(format!(
                    "scene has duplicate object name '{}'",
                    obj.name
                )));
            }
        }
        Ok(())
    }
}

/// In-process scene host: holds a [`SceneManifest`] in memory and renders a flat,
/// top-down orthographic preview of it.
///
/// Deterministic: the same scene and settings always produce the same pixels.
#[derive(Debug, Default)]
pub struct PreviewScene {
    scene: SceneManifest,
    loaded_from: Option<PathBuf>,
    settings: RenderSettings,
    loads: usize,
}

impl PreviewScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host preloaded with an in-memory scene, for callers that never touch the filesystem.
    pub fn from_manifest(scene: SceneManifest) -> Self {
        Self {
            scene,
            ..Self::default()
        }
    }

    pub fn scene(&self) -> &SceneManifest {
        &self.scene
    }

    /// Number of successful `load_scene`/`reload` calls so far.
    pub fn load_count(&self) -> usize {
        self.loads
    }

    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    fn object_of_kind_mut(&mut self, name: &str, kind: ObjectKind) -> BatchResult<&mut SceneObject> {
        let obj = self
            .scene
            .objects
            .iter_mut()
            .find(|o| o.name == name)
            .ok_or_else(|| {
                BatchError::host(format!("{} '{name}' not found", kind.label().to_lowercase()))
            })?;
        if obj.kind != kind {
            return Err(BatchError::host(format!(
                "'{name}' is a {} object, expected {}",
                obj.kind.label(),
                kind.label()
            )));
        }
        Ok(obj)
    }

    /// Blender-style unique name: `Cube`, `Cube.001`, `Cube.002`, ...
    fn unique_name(&self, base: &str) -> String {
        let taken = |n: &str| self.scene.objects.iter().any(|o| o.name == n);
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}.{i:03}"))
            .find(|n| !taken(n))
            .unwrap_or_else(|| base.to_string())
    }

    fn collection_visible(&self, name: Option<&str>) -> bool {
        let Some(name) = name else {
            return true;
        };
        self.scene
            .collections
            .iter()
            .find(|c| c.name == name)
            .is_none_or(|c| c.visible)
    }

    fn base_color(&self, material: Option<&str>) -> [f64; 3] {
        const FALLBACK: [f64; 3] = [0.8, 0.8, 0.8];
        let Some(mat) = material.and_then(|m| self.scene.materials.iter().find(|x| x.name == m))
        else {
            return FALLBACK;
        };
        mat.nodes
            .iter()
            .find_map(|n| n.inputs.get("Base Color").or_else(|| n.inputs.get("Color")))
            .and_then(|v| match v {
                NodeValue::Vector(c) if c.len() >= 3 => Some([c[0], c[1], c[2]]),
                NodeValue::Scalar(s) => Some([*s, *s, *s]),
                _ => None,
            })
            .unwrap_or(FALLBACK)
    }

    fn exposure(&self) -> f64 {
        let light: f64 = self
            .scene
            .objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Light && o.enabled && o.visible)
            .filter(|o| self.collection_visible(o.collection.as_deref()))
            .map(|o| o.energy.max(0.0))
            .sum();
        (0.15 + light / 1000.0).min(1.5)
    }

    fn view_camera(&self) -> Option<&SceneObject> {
        let by_name = self
            .scene
            .active_camera
            .as_deref()
            .and_then(|n| self.scene.objects.iter().find(|o| o.name == n));
        by_name.or_else(|| {
            self.scene
                .objects
                .iter()
                .find(|o| o.kind == ObjectKind::Camera)
        })
    }
}

impl SceneHost for PreviewScene {
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    fn load_scene(&mut self, path: &Path) -> BatchResult<()> {
        self.scene = SceneManifest::read(path)?;
        self.loaded_from = Some(path.to_path_buf());
        self.loads += 1;
        tracing::debug!(objects = self.scene.objects.len(), "scene loaded");
        Ok(())
    }

    fn find_object(&self, name: &str) -> BatchResult<ObjectHandle> {
        self.scene
            .objects
            .iter()
            .position(|o| o.name == name)
            .map(ObjectHandle)
            .ok_or_else(|| BatchError::host(format!("object '{name}' not found")))
    }

    fn set_transform(&mut self, object: ObjectHandle, delta: &TransformDelta) -> BatchResult<()> {
        let obj = self
            .scene
            .objects
            .get_mut(object.0)
            .ok_or_else(|| BatchError::host(format!("stale object handle {}", object.0)))?;
        obj.location = obj.location.add(delta.offset);
        obj.rotation = obj.rotation.add(delta.rotation);
        obj.scale = obj.scale.mul(delta.scale);
        Ok(())
    }

    fn find_material_node(&self, material: &str, node: &str) -> BatchResult<NodeHandle> {
        let (mi, mat) = self
            .scene
            .materials
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == material)
            .ok_or_else(|| BatchError::host(format!("material '{material}' not found")))?;
        let ni = mat
            .nodes
            .iter()
            .position(|n| n.name == node)
            .ok_or_else(|| {
                BatchError::host(format!("node '{node}' missing in material '{material}'"))
            })?;
        Ok(NodeHandle {
            material: mi,
            node: ni,
        })
    }

    fn set_node_param(
        &mut self,
        node: NodeHandle,
        param: &str,
        value: &NodeValue,
    ) -> BatchResult<()> {
        let target = self
            .scene
            .materials
            .get_mut(node.material)
            .and_then(|m| m.nodes.get_mut(node.node))
            .ok_or_else(|| BatchError::host("stale material node handle"))?;
        let current = target.inputs.get_mut(param).ok_or_else(|| {
            BatchError::host(format!("parameter '{param}' missing on node '{}'", target.name))
        })?;
        let coerced = value.coerce_like(current).ok_or_else(|| {
            BatchError::host(format!(
                "value {value} does not fit parameter '{param}' (currently {current})"
            ))
        })?;
        *current = coerced;
        Ok(())
    }

    fn spawn_primitive(
        &mut self,
        primitive: PrimitiveKind,
        location: Vec3,
        params: &SpawnParams,
    ) -> BatchResult<ObjectHandle> {
        if let Some(material) = &params.material {
            if !self.scene.materials.iter().any(|m| &m.name == material) {
                return Err(BatchError::host(format!(
                    "material '{material}' not found for new {}",
                    primitive.as_str()
                )));
            }
        }
        let name = match &params.name {
            Some(n) => self.unique_name(n),
            None => {
                let base = primitive.as_str();
                let mut title = base[..1].to_uppercase();
                title.push_str(&base[1..]);
                self.unique_name(&title)
            }
        };
        let mut obj = SceneObject::new(name, ObjectKind::Mesh);
        obj.shape = primitive;
        obj.location = location;
        obj.rotation = params.rotation;
        obj.scale = params.scale;
        obj.material = params.material.clone();
        self.scene.objects.push(obj);
        Ok(ObjectHandle(self.scene.objects.len() - 1))
    }

    fn set_light_enabled(&mut self, name: &str, enabled: bool) -> BatchResult<()> {
        self.object_of_kind_mut(name, ObjectKind::Light)?.enabled = enabled;
        Ok(())
    }

    fn set_object_visible(&mut self, name: &str, visible: bool) -> BatchResult<()> {
        let handle = self.find_object(name)?;
        self.scene.objects[handle.0].visible = visible;
        Ok(())
    }

    fn set_collection_visible(&mut self, name: &str, visible: bool) -> BatchResult<()> {
        let coll = self
            .scene
            .collections
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| BatchError::host(format!("collection '{name}' not found")))?;
        coll.visible = visible;
        Ok(())
    }

    fn set_active_camera(&mut self, name: &str) -> BatchResult<()> {
        self.object_of_kind_mut(name, ObjectKind::Camera)?;
        self.scene.active_camera = Some(name.to_string());
        Ok(())
    }

    fn configure_camera(
        &mut self,
        name: &str,
        location: Option<Vec3>,
        rotation_euler: Option<Vec3>,
        lens_mm: Option<f64>,
    ) -> BatchResult<()> {
        let cam = self.object_of_kind_mut(name, ObjectKind::Camera)?;
        if let Some(v) = location {
            cam.location = v;
        }
        if let Some(v) = rotation_euler {
            cam.rotation = v;
        }
        if let Some(v) = lens_mm {
            cam.lens_mm = v;
        }
        Ok(())
    }

    fn apply_render_settings(&mut self, settings: &RenderSettings) -> BatchResult<()> {
        if settings.resolution_x == 0 || settings.resolution_y == 0 {
            return Err(BatchError::host("resolution must be > 0"));
        }
        self.settings = settings.clone();
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(w = self.settings.resolution_x, h = self.settings.resolution_y))]
    fn render_frame(&mut self) -> BatchResult<RenderedFrame> {
        let width = self.settings.resolution_x;
        let height = self.settings.resolution_y;
        let pixels = u64::from(width) * u64::from(height);
        if pixels > MAX_PREVIEW_PIXELS {
            return Err(BatchError::render(format!(
                "{width}x{height} exceeds the preview limit of {MAX_PREVIEW_PIXELS} pixels"
            )));
        }
        let len = usize::try_from(pixels * 4)
            .map_err(|_| BatchError::render("frame size overflows memory"))?;

        let (center, lens) = match self.view_camera() {
            Some(cam) => ((cam.location.x, cam.location.y), cam.lens_mm.max(1.0)),
            None => ((0.0, 0.0), default_lens()),
        };
        let half_w = 360.0 / lens;
        let px_per_unit = f64::from(width) / (2.0 * half_w);
        let half_h = f64::from(height) / px_per_unit / 2.0;
        let exposure = self.exposure();

        let to_px = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        let world = self.scene.world_color.map(|c| to_px(c * exposure));
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            BatchError::render(format!("cannot allocate a {width}x{height} frame: {e}"))
        })?;
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&[world[0], world[1], world[2], 255]);
        }

        let mut meshes: Vec<&SceneObject> = self
            .scene
            .objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Mesh && o.visible)
            .filter(|o| self.collection_visible(o.collection.as_deref()))
            .collect();
        // Painter's order: lowest first.
        meshes.sort_by(|a, b| a.location.z.total_cmp(&b.location.z));

        for obj in meshes {
            let color = self.base_color(obj.material.as_deref()).map(|c| to_px(c * exposure));
            let footprint = Footprint::of(obj);
            let radius = footprint.bounding_radius();

            let wx0 = obj.location.x - radius - (center.0 - half_w);
            let wx1 = obj.location.x + radius - (center.0 - half_w);
            let wy0 = (center.1 + half_h) - (obj.location.y + radius);
            let wy1 = (center.1 + half_h) - (obj.location.y - radius);
            let clamp_px = |v: f64, max: u32| (v * px_per_unit).floor().clamp(0.0, f64::from(max)) as u32;
            let (x0, x1) = (clamp_px(wx0, width), clamp_px(wx1 + 1.0 / px_per_unit, width));
            let (y0, y1) = (clamp_px(wy0, height), clamp_px(wy1 + 1.0 / px_per_unit, height));

            for py in y0..y1 {
                let wy = center.1 + half_h - (f64::from(py) + 0.5) / px_per_unit;
                for px in x0..x1 {
                    let wx = center.0 - half_w + (f64::from(px) + 0.5) / px_per_unit;
                    if footprint.contains(wx - obj.location.x, wy - obj.location.y) {
                        let i = (py as usize * width as usize + px as usize) * 4;
                        data[i..i + 3].copy_from_slice(&color);
                    }
                }
            }
        }

        Ok(RenderedFrame {
            width,
            height,
            data,
        })
    }

    fn inventory(&self, include_hidden: bool) -> BatchResult<Vec<InventoryEntry>> {
        let round = |v: Vec3| [v.x, v.y, v.z].map(|c| (c * 1e5).round() / 1e5);
        Ok(self
            .scene
            .objects
            .iter()
            .filter(|o| include_hidden || (o.visible && self.collection_visible(o.collection.as_deref())))
            .map(|o| InventoryEntry {
                name: o.name.clone(),
                kind: o.kind.label().to_string(),
                location: round(o.location),
                rotation: round(o.rotation),
                scale: round(o.scale),
                visible: o.visible,
            })
            .collect())
    }
}

/// 2D top-down silhouette of a mesh in object-local coordinates.
struct Footprint {
    round: bool,
    ring: bool,
    half_x: f64,
    half_y: f64,
    angle: f64,
}

impl Footprint {
    fn of(obj: &SceneObject) -> Self {
        let round = matches!(
            obj.shape,
            PrimitiveKind::UvSphere
                | PrimitiveKind::IcoSphere
                | PrimitiveKind::Cylinder
                | PrimitiveKind::Cone
                | PrimitiveKind::Circle
                | PrimitiveKind::Torus
        );
        Self {
            round,
            ring: obj.shape == PrimitiveKind::Torus,
            half_x: obj.scale.x.abs(),
            half_y: obj.scale.y.abs(),
            angle: obj.rotation.z,
        }
    }

    fn bounding_radius(&self) -> f64 {
        self.half_x.hypot(self.half_y)
    }

    fn contains(&self, dx: f64, dy: f64) -> bool {
        let (s, c) = (-self.angle).sin_cos();
        let lx = dx * c - dy * s;
        let ly = dx * s + dy * c;
        if self.half_x <= 0.0 || self.half_y <= 0.0 {
            return false;
        }
        if self.round {
            let r = (lx / self.half_x).powi(2) + (ly / self.half_y).powi(2);
            if self.ring {
                (0.25..=1.0).contains(&r)
            } else {
                r <= 1.0
            }
        } else {
            lx.abs() <= self.half_x && ly.abs() <= self.half_y
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/preview.rs"]
mod tests;
