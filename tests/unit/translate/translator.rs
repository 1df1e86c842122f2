use std::path::PathBuf;

use super::*;
use crate::{
    foundation::core::{NodeValue, Vec3},
    plan::model::{
        CameraOverride, NodeEdit, ObjectEdit, PrimitiveKind, RenderOverrides, Spawn,
        VisibilityToggle,
    },
};

fn defaults() -> DefaultSettings {
    let mut d = DefaultSettings::with_blend_path("/scenes/diorama.json");
    d.output_dir = PathBuf::from("/renders");
    d.samples = 16;
    d
}

fn busy_variation() -> Variation {
    Variation {
        name: "busy".to_string(),
        camera: Some(CameraOverride {
            name: None,
            location: Some(Vec3::new(0.0, -8.0, 2.0)),
            rotation_euler: None,
            lens_mm: Some(35.0),
        }),
        visibility: vec![VisibilityToggle {
            name: "Plant".to_string(),
            visible: false,
        }],
        collection_visibility: vec![VisibilityToggle {
            name: "Props".to_string(),
            visible: true,
        }],
        light_toggles: [("Key".to_string(), false), ("Fill".to_string(), true)]
            .into_iter()
            .collect(),
        spawns: vec![Spawn {
            primitive: PrimitiveKind::UvSphere,
            name: Some("Ball".to_string()),
            location: Vec3::new(1.0, 1.0, 0.5),
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            material: Some("Red".to_string()),
        }],
        node_edits: vec![NodeEdit {
            material: "Floor".to_string(),
            node: "BSDF".to_string(),
            param: "Roughness".to_string(),
            value: NodeValue::Scalar(0.1),
        }],
        object_edits: vec![ObjectEdit {
            object: "Cube".to_string(),
            offset: Vec3::new(0.0, 0.0, 1.0),
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }],
        render: None,
    }
}

fn kinds(cmds: &[Command]) -> Vec<&'static str> {
    cmds.iter().map(Command::kind).collect()
}

#[test]
fn default_order_groups_edits_and_ends_with_render() {
    let cmds = translate(&busy_variation(), &defaults());
    assert_eq!(
        kinds(&cmds),
        vec![
            "MoveObject",
            "SetNodeParam",
            "SpawnPrimitive",
            "ToggleLight",
            "ToggleLight",
            "SetCollectionVisibility",
            "SetObjectVisibility",
            "ConfigureCamera",
            "Render",
        ]
    );
    // light toggles are emitted in name order
    assert_eq!(
        cmds[3],
        Command::ToggleLight {
            light: "Fill".to_string(),
            enabled: true
        }
    );
}

#[test]
fn translate_is_pure() {
    let v = busy_variation();
    let d = defaults();
    assert_eq!(translate(&v, &d), translate(&v, &d));
}

#[test]
fn custom_edit_order_is_honored() {
    let mut d = defaults();
    d.edit_order = vec![
        EditCategory::Spawns,
        EditCategory::Nodes,
        EditCategory::Objects,
        EditCategory::Camera,
        EditCategory::Lights,
        EditCategory::Visibility,
    ];
    let cmds = translate(&busy_variation(), &d);
    assert_eq!(
        &kinds(&cmds)[..4],
        &["SpawnPrimitive", "SetNodeParam", "MoveObject", "ConfigureCamera"]
    );
    assert!(cmds.last().unwrap().is_render());
}

#[test]
fn camera_transform_targets_default_camera_when_unnamed() {
    let cmds = translate(&busy_variation(), &defaults());
    let Command::ConfigureCamera { camera, lens_mm, .. } = &cmds[7] else {
        panic!("expected ConfigureCamera, got {:?}", cmds[7]);
    };
    assert_eq!(camera, "Camera");
    assert_eq!(*lens_mm, Some(35.0));
}

#[test]
fn named_camera_only_switches_active_camera() {
    let v = Variation {
        name: "front".to_string(),
        camera: Some(CameraOverride::named("CamFront")),
        ..Variation::default()
    };
    let cmds = translate(&v, &defaults());
    assert_eq!(kinds(&cmds), vec!["SetCamera", "Render"]);
}

#[test]
fn render_command_carries_resolved_settings_and_output() {
    let mut v = busy_variation();
    v.render = Some(RenderOverrides {
        samples: Some(4),
        ..RenderOverrides::default()
    });
    let cmds = translate(&v, &defaults());
    let Some(Command::Render {
        variation,
        output,
        settings,
    }) = cmds.last()
    else {
        panic!("last command must be Render");
    };
    assert_eq!(variation, "busy");
    assert_eq!(output, &PathBuf::from("/renders/busy.png"));
    assert_eq!(settings.samples, 4);
}

#[test]
fn noop_variation_is_just_a_render() {
    let v = Variation {
        name: "baseline".to_string(),
        ..Variation::default()
    };
    let cmds = translate(&v, &defaults());
    assert_eq!(cmds.len(), 1);
    assert!(cmds[0].is_render());
}

#[test]
fn display_lines_are_human_readable() {
    let cmds = translate(&busy_variation(), &defaults());
    assert_eq!(
        cmds[1].to_string(),
        "SetNodeParam: Floor/BSDF.Roughness -> 0.1"
    );
    assert!(cmds[2].to_string().contains("uv_sphere"));
    assert!(cmds[2].to_string().contains("named 'Ball'"));
    assert_eq!(cmds[4].to_string(), "ToggleLight: 'Key' -> off");
    assert!(cmds.last().unwrap().to_string().starts_with("Render: 'busy'"));
}
