//! Capability interface to a live scene.
//!
//! The engine never reaches into a global scene; every mutation goes through a [`SceneHost`]
//! value it was handed. [`preview::PreviewScene`] is the in-process implementation; adapters
//! for external 3D applications implement the same trait.

use std::path::Path;

use crate::{
    foundation::{
        core::{NodeValue, Vec3},
        error::BatchResult,
    },
    plan::model::{PrimitiveKind, RenderSettings, TransformDelta},
    translate::command::SpawnParams,
};

pub mod preview;

/// Opaque reference to an object in the currently loaded scene.
///
/// Only valid until the next `load_scene`/`reload`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub usize);

/// Opaque reference to a node inside a material's node tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub material: usize,
    pub node: usize,
}

/// Straight-alpha RGBA8 pixels returned by [`SceneHost::render_frame`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// One row of a scene inventory dump.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct InventoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
    pub visible: bool,
}

/// Operations the execution engine needs from a live scene.
///
/// Lookups that miss and host-side failures are reported as
/// [`crate::BatchError::HostInteraction`].
pub trait SceneHost {
    fn load_scene(&mut self, path: &Path) -> BatchResult<()>;

    /// Discard every edit and restore the scene stored at `path`.
    fn reload(&mut self, path: &Path) -> BatchResult<()> {
        self.load_scene(path)
    }

    fn find_object(&self, name: &str) -> BatchResult<ObjectHandle>;

    fn set_transform(&mut self, object: ObjectHandle, delta: &TransformDelta) -> BatchResult<()>;

    fn find_material_node(&self, material: &str, node: &str) -> BatchResult<NodeHandle>;

    fn set_node_param(
        &mut self,
        node: NodeHandle,
        param: &str,
        value: &NodeValue,
    ) -> BatchResult<()>;

    fn spawn_primitive(
        &mut self,
        primitive: PrimitiveKind,
        location: Vec3,
        params: &SpawnParams,
    ) -> BatchResult<ObjectHandle>;

    fn set_light_enabled(&mut self, name: &str, enabled: bool) -> BatchResult<()>;

    fn set_object_visible(&mut self, name: &str, visible: bool) -> BatchResult<()>;

    fn set_collection_visible(&mut self, name: &str, visible: bool) -> BatchResult<()>;

    fn set_active_camera(&mut self, name: &str) -> BatchResult<()>;

    fn configure_camera(
        &mut self,
        name: &str,
        location: Option<Vec3>,
        rotation_euler: Option<Vec3>,
        lens_mm: Option<f64>,
    ) -> BatchResult<()>;

    fn apply_render_settings(&mut self, settings: &RenderSettings) -> BatchResult<()>;

    /// Blocks until the frame is complete.
    fn render_frame(&mut self) -> BatchResult<RenderedFrame>;

    fn inventory(&self, include_hidden: bool) -> BatchResult<Vec<InventoryEntry>>;
}
