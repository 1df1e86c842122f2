use std::path::PathBuf;

use super::*;
use crate::{
    foundation::core::Vec3,
    host::preview::PreviewScene,
    plan::model::{DefaultSettings, ObjectEdit, Variation},
    translate::translator::translate,
};

fn fixture(name: &str) -> (PathBuf, DefaultSettings) {
    let dir = PathBuf::from("target").join("unit_engine").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let scene = dir.join("scene.yaml");
    std::fs::write(
        &scene,
        "objects:\n  - {name: Cube}\n  - {name: Camera, kind: camera, location: [0, 0, 10]}\n",
    )
    .unwrap();
    let mut defaults = DefaultSettings::with_blend_path(&scene);
    defaults.output_dir = dir.join("out");
    defaults.resolution_x = 32;
    defaults.resolution_y = 32;
    (scene, defaults)
}

fn lift(name: &str, object: &str) -> Variation {
    Variation {
        name: name.to_string(),
        object_edits: vec![ObjectEdit {
            object: object.to_string(),
            offset: Vec3::new(1.0, 0.0, 0.0),
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }],
        ..Variation::default()
    }
}

#[test]
fn dry_run_logs_every_command_and_is_simulated() {
    let (_, defaults) = fixture("dry_run");
    let cmds = translate(&lift("a", "Cube"), &defaults);
    let mut engine = ExecutionEngine::dry_run();
    let res = engine.execute("a", &cmds).unwrap();
    assert!(res.simulated);
    assert_eq!(res.commands_applied, 2);
    assert_eq!(res.log.len(), 2);
    assert!(res.log[1].starts_with("Render:"));
    assert!(!defaults.output_dir.exists());
}

#[test]
fn dry_run_flag_wins_over_live_host() {
    let (scene, defaults) = fixture("dry_run_flag");
    let mut host = PreviewScene::new();
    let cmds = translate(&lift("a", "Cube.999"), &defaults);
    let res = execute("a", &cmds, &mut host, &scene, true).unwrap();
    assert!(res.simulated);
    assert_eq!(host.load_count(), 0);
}

#[test]
fn live_run_writes_output_and_reloads_baseline() {
    let (scene, defaults) = fixture("live");
    let mut host = PreviewScene::new();
    let mut engine = ExecutionEngine::live(&mut host, &scene);
    engine.load_baseline().unwrap();

    let cmds = translate(&lift("moved", "Cube"), &defaults);
    let res = engine.execute("moved", &cmds).unwrap();
    assert!(!res.simulated);
    assert_eq!(res.state, VariationState::ReloadedBaseline);
    assert!(!engine.is_dirty());
    let out = res.output.unwrap();
    assert_eq!(out, defaults.output_dir.join("moved.png"));
    assert!(out.exists());

    drop(engine);
    assert_eq!(host.load_count(), 2);
    // Reload restored the unmoved cube.
    assert_eq!(host.scene().objects[0].location, Vec3::ZERO);
}

#[test]
fn missing_object_fails_with_variation_name() {
    let (scene, defaults) = fixture("missing_object");
    let mut host = PreviewScene::new();
    let mut engine = ExecutionEngine::live(&mut host, &scene);
    engine.load_baseline().unwrap();

    let cmds = translate(&lift("broken", "Cube.999"), &defaults);
    let err = engine.execute("broken", &cmds).unwrap_err();
    assert!(matches!(err, BatchError::HostInteraction(_)));
    let msg = err.to_string();
    assert!(msg.contains("variation 'broken'"));
    assert!(msg.contains("Cube.999"));
    assert!(engine.is_dirty());
    assert!(!defaults.output_dir.join("broken.png").exists());

    engine.restore_baseline().unwrap();
    assert!(!engine.is_dirty());
}

#[test]
fn state_transitions_are_guarded() {
    assert!(VariationState::Idle.can_advance_to(VariationState::Mutating));
    assert!(VariationState::Rendering.can_advance_to(VariationState::Failed));
    assert!(!VariationState::Idle.can_advance_to(VariationState::Written));
    assert!(!VariationState::Written.can_advance_to(VariationState::Failed));
}

#[test]
fn unwritable_output_is_render_error() {
    let (scene, mut defaults) = fixture("unwritable");
    // A regular file where the output directory should be.
    let blocker = defaults.output_dir.clone();
    std::fs::write(&blocker, b"not a dir").unwrap();
    defaults.output_dir = blocker.join("inner");

    let mut host = PreviewScene::new();
    let mut engine = ExecutionEngine::live(&mut host, &scene);
    engine.load_baseline().unwrap();
    let v = Variation {
        name: "x".to_string(),
        ..Variation::default()
    };
    let cmds = translate(&v, &defaults);
    assert!(matches!(
        engine.execute("x", &cmds).unwrap_err(),
        BatchError::Render(_)
    ));
}
