use std::{fmt, path::PathBuf};

use crate::{
    foundation::core::{NodeValue, Vec3},
    plan::model::{PrimitiveKind, RenderSettings, TransformDelta},
};

/// Optional attributes of a spawned primitive.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SpawnParams {
    pub name: Option<String>,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub material: Option<String>,
}

/// One abstract scene mutation, produced by [`crate::translate`] and consumed once by the engine.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    MoveObject {
        object: String,
        delta: TransformDelta,
    },
    SetNodeParam {
        material: String,
        node: String,
        param: String,
        value: NodeValue,
    },
    SpawnPrimitive {
        primitive: PrimitiveKind,
        location: Vec3,
        params: SpawnParams,
    },
    ToggleLight {
        light: String,
        enabled: bool,
    },
    SetObjectVisibility {
        object: String,
        visible: bool,
    },
    SetCollectionVisibility {
        collection: String,
        visible: bool,
    },
    SetCamera {
        camera: String,
    },
    ConfigureCamera {
        camera: String,
        location: Option<Vec3>,
        rotation_euler: Option<Vec3>,
        lens_mm: Option<f64>,
    },
    /// Always the final command of a variation.
    Render {
        variation: String,
        output: PathBuf,
        settings: RenderSettings,
    },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MoveObject { .. } => "MoveObject",
            Self::SetNodeParam { .. } => "SetNodeParam",
            Self::SpawnPrimitive { .. } => "SpawnPrimitive",
            Self::ToggleLight { .. } => "ToggleLight",
            Self::SetObjectVisibility { .. } => "SetObjectVisibility",
            Self::SetCollectionVisibility { .. } => "SetCollectionVisibility",
            Self::SetCamera { .. } => "SetCamera",
            Self::ConfigureCamera { .. } => "ConfigureCamera",
            Self::Render { .. } => "Render",
        }
    }

    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render { .. })
    }
}

fn on_off(flag: bool, on: &'static str, off: &'static str) -> &'static str {
    if flag { on } else { off }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.kind())?;
        match self {
            Self::MoveObject { object, delta } => write!(
                f,
                "'{object}' offset {} rotation {} scale {}",
                delta.offset, delta.rotation, delta.scale
            ),
            Self::SetNodeParam {
                material,
                node,
                param,
                value,
            } => write!(f, "{material}/{node}.{param} -> {value}"),
            Self::SpawnPrimitive {
                primitive,
                location,
                params,
            } => {
                write!(f, "{} at {location}", primitive.as_str())?;
                if let Some(name) = &params.name {
                    write!(f, " named '{name}'")?;
                }
                if let Some(material) = &params.material {
                    write!(f, " with material '{material}'")?;
                }
                Ok(())
            }
            Self::ToggleLight { light, enabled } => {
                write!(f, "'{light}' -> {}", on_off(*enabled, "on", "off"))
            }
            Self::SetObjectVisibility { object, visible } => {
                write!(f, "'{object}' -> {}", on_off(*visible, "visible", "hidden"))
            }
            Self::SetCollectionVisibility {
                collection,
                visible,
            } => write!(
                f,
                "'{collection}' -> {}",
                on_off(*visible, "visible", "hidden")
            ),
            Self::SetCamera { camera } => write!(f, "active camera '{camera}'"),
            Self::ConfigureCamera {
                camera,
                location,
                rotation_euler,
                lens_mm,
            } => {
                write!(f, "'{camera}'")?;
                if let Some(v) = location {
                    write!(f, " location {v}")?;
                }
                if let Some(v) = rotation_euler {
                    write!(f, " rotation {v}")?;
                }
                if let Some(v) = lens_mm {
                    write!(f, " lens {v}mm")?;
                }
                Ok(())
            }
            Self::Render {
                variation,
                output,
                settings,
            } => write!(
                f,
                "'{variation}' -> {} ({} {}x{} @ {} samples)",
                output.display(),
                settings.engine,
                settings.resolution_x,
                settings.resolution_y,
                settings.samples
            ),
        }
    }
}
