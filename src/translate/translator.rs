use crate::{
    plan::model::{DefaultSettings, EditCategory, Variation},
    translate::command::{Command, SpawnParams},
};

/// Map one variation to its ordered command sequence.
///
/// Pure: identical inputs always give identical output. Edit groups follow
/// `defaults.edit_order`; the `Render` command is always last.
pub fn translate(variation: &Variation, defaults: &DefaultSettings) -> Vec<Command> {
    let mut out = Vec::new();
    for category in &defaults.edit_order {
        emit_category(*category, variation, defaults, &mut out);
    }

    let settings = defaults.resolve_render(variation);
    out.push(Command::Render {
        variation: variation.name.clone(),
        output: defaults.output_path(variation, &settings),
        settings,
    });
    out
}

fn emit_category(
    category: EditCategory,
    v: &Variation,
    defaults: &DefaultSettings,
    out: &mut Vec<Command>,
) {
    match category {
        EditCategory::Objects => {
            out.extend(v.object_edits.iter().map(|e| Command::MoveObject {
                object: e.object.clone(),
                delta: e.delta(),
            }));
        }
        EditCategory::Nodes => {
            out.extend(v.node_edits.iter().map(|e| Command::SetNodeParam {
                material: e.material.clone(),
                node: e.node.clone(),
                param: e.param.clone(),
                value: e.value.clone(),
            }));
        }
        EditCategory::Spawns => {
            out.extend(v.spawns.iter().map(|s| Command::SpawnPrimitive {
                primitive: s.primitive,
                location: s.location,
                params: SpawnParams {
                    name: s.name.clone(),
                    rotation: s.rotation,
                    scale: s.scale,
                    material: s.material.clone(),
                },
            }));
        }
        EditCategory::Lights => {
            out.extend(
                v.light_toggles
                    .iter()
                    .map(|(light, enabled)| Command::ToggleLight {
                        light: light.clone(),
                        enabled: *enabled,
                    }),
            );
        }
        EditCategory::Visibility => {
            // Collections first so an object toggle inside a hidden collection still lands.
            out.extend(
                v.collection_visibility
                    .iter()
                    .map(|t| Command::SetCollectionVisibility {
                        collection: t.name.clone(),
                        visible: t.visible,
                    }),
            );
            out.extend(v.visibility.iter().map(|t| Command::SetObjectVisibility {
                object: t.name.clone(),
                visible: t.visible,
            }));
        }
        EditCategory::Camera => {
            let Some(cam) = &v.camera else {
                return;
            };
            if let Some(name) = &cam.name {
                out.push(Command::SetCamera {
                    camera: name.clone(),
                });
            }
            if cam.has_transform() {
                out.push(Command::ConfigureCamera {
                    camera: cam
                        .name
                        .clone()
                        .unwrap_or_else(|| defaults.camera_name.clone()),
                    location: cam.location,
                    rotation_euler: cam.rotation_euler,
                    lens_mm: cam.lens_mm,
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/translate/translator.rs"]
mod tests;
