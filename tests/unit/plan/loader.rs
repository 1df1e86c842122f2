use super::*;
use crate::plan::model::NodeEdit;

fn fixture_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_loader").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("scene.json"), "{}").unwrap();
    dir
}

fn write_plan(dir: &Path, file: &str, body: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, body).unwrap();
    path
}

const BASIC: &str = r#"
defaults:
  blend_path: scene.json
  samples: 16
variations:
  - name: front
    camera: CamFront
  - object_edits:
      - {object: Cube, offset: [0, 0, 1]}
    node_edits:
      - {material: Floor, node: Principled BSDF, param: Roughness, value: 0.2}
"#;

#[test]
fn loads_and_resolves_defaults() {
    let dir = fixture_dir("resolves_defaults");
    let path = write_plan(&dir, "plan.yaml", BASIC);
    let plan = load_plan(&path).unwrap();

    assert_eq!(plan.defaults.samples, 16);
    assert_eq!(plan.defaults.resolution_x, 1024);
    assert_eq!(plan.defaults.camera_name, "Camera");
    assert_eq!(plan.defaults.edit_order, EditCategory::DEFAULT_ORDER.to_vec());
    assert!(plan.defaults.blend_path.is_absolute());
    assert!(plan.defaults.blend_path.ends_with("scene.json"));
    assert!(plan.defaults.output_dir.ends_with(DEFAULT_OUTPUT_DIR));

    assert_eq!(plan.variations.len(), 2);
    assert_eq!(plan.variations[0].name, "front");
    assert_eq!(plan.variations[1].name, "variation_001");
    assert_eq!(
        plan.variations[1].node_edits[0],
        NodeEdit {
            material: "Floor".to_string(),
            node: "Principled BSDF".to_string(),
            param: "Roughness".to_string(),
            value: crate::foundation::core::NodeValue::Scalar(0.2),
        }
    );
}

#[test]
fn reload_of_serialized_plan_is_identical() {
    let dir = fixture_dir("roundtrip");
    let path = write_plan(&dir, "plan.yaml", BASIC);
    let plan = load_plan(&path).unwrap();

    let text = plan_to_yaml(&plan).unwrap();
    let again_path = write_plan(&dir, "again.yaml", &text);
    let again = load_plan(&again_path).unwrap();
    assert_eq!(plan, again);
}

#[test]
fn missing_plan_file_is_not_found() {
    let err = load_plan("target/unit_loader/definitely_missing.yaml").unwrap_err();
    assert!(matches!(err, BatchError::NotFound(_)));
}

#[test]
fn missing_variations_key_is_validation_error() {
    let dir = fixture_dir("missing_variations");
    let path = write_plan(&dir, "plan.yaml", "defaults:\n  blend_path: scene.json\n");
    let err = load_plan(&path).unwrap_err();
    assert!(matches!(err, BatchError::Validation(_)));
    assert!(err.to_string().contains("variations"));
}

#[test]
fn non_mapping_document_is_rejected() {
    let dir = fixture_dir("non_mapping");
    let path = write_plan(&dir, "plan.yaml", "- just\n- a list\n");
    let err = load_plan(&path).unwrap_err();
    assert!(err.to_string().contains("must be a mapping"));
}

#[test]
fn duplicate_names_fail_before_execution() {
    let dir = fixture_dir("duplicates");
    let path = write_plan(
        &dir,
        "plan.yaml",
        "defaults: {blend_path: scene.json}\nvariations:\n  - name: A\n  - name: A\n",
    );
    let err = load_plan(&path).unwrap_err();
    assert!(matches!(err, BatchError::Validation(_)));
}

#[test]
fn negative_and_zero_numbers_are_rejected() {
    let dir = fixture_dir("numbers");
    let neg = write_plan(
        &dir,
        "neg.yaml",
        "defaults: {blend_path: scene.json, samples: -4}\nvariations: []\n",
    );
    let err = load_plan(&neg).unwrap_err();
    assert!(matches!(err, BatchError::Validation(_)));
    assert!(err.to_string().contains("samples"));

    let zero = write_plan(
        &dir,
        "zero.yaml",
        "defaults: {blend_path: scene.json, resolution_x: 0}\nvariations: []\n",
    );
    assert!(matches!(
        load_plan(&zero).unwrap_err(),
        BatchError::Validation(_)
    ));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = fixture_dir("unknown_keys");
    let path = write_plan(
        &dir,
        "plan.yaml",
        "defaults: {blend_path: scene.json, sampels: 4}\nvariations: []\n",
    );
    let err = load_plan(&path).unwrap_err();
    assert!(err.to_string().contains("sampels"));
}

#[test]
fn missing_blend_file_is_not_found() {
    let dir = fixture_dir("missing_blend");
    let path = write_plan(
        &dir,
        "plan.yaml",
        "defaults: {blend_path: nope.blend}\nvariations: []\n",
    );
    assert!(matches!(
        load_plan(&path).unwrap_err(),
        BatchError::NotFound(_)
    ));
}

#[test]
fn missing_blend_path_is_validation_error() {
    let dir = fixture_dir("no_blend_key");
    let path = write_plan(&dir, "plan.yaml", "variations: []\n");
    assert!(matches!(
        load_plan(&path).unwrap_err(),
        BatchError::Validation(_)
    ));
}

#[test]
fn cli_render_overrides_win_over_document_and_variations() {
    let dir = fixture_dir("cli_overrides");
    let path = write_plan(
        &dir,
        "plan.yaml",
        "defaults: {blend_path: scene.json, samples: 64}\nvariations:\n  - name: a\n    render: {samples: 512, engine: EEVEE}\n",
    );
    let opts = LoadOptions {
        output_override: Some(dir.join("out")),
        render: RenderOverrides {
            samples: Some(8),
            ..RenderOverrides::default()
        },
        ..LoadOptions::default()
    };
    let plan = load_plan_with(&path, &opts).unwrap();
    assert_eq!(plan.defaults.samples, 8);
    let settings = plan.defaults.resolve_render(&plan.variations[0]);
    assert_eq!(settings.samples, 8);
    assert_eq!(settings.engine, "EEVEE");
    assert!(plan.defaults.output_dir.ends_with("out"));
    assert!(plan.defaults.output_dir.is_absolute());
}

#[test]
fn json_plans_are_accepted() {
    let dir = fixture_dir("json_plan");
    let path = write_plan(
        &dir,
        "plan.json",
        r#"{"defaults": {"blend_path": "scene.json"}, "variations": [{"name": "x", "light_toggles": {"Key": false}}]}"#,
    );
    let plan = load_plan(&path).unwrap();
    assert_eq!(plan.variations[0].light_toggles.get("Key"), Some(&false));
}

#[test]
fn light_toggle_preset_builds_on_off_pair() {
    let vs = light_toggle_variations("Laser Grid.001");
    assert_eq!(vs.len(), 2);
    assert_eq!(vs[0].name, "Laser_Grid.001_on");
    assert_eq!(vs[1].name, "Laser_Grid.001_off");
    assert_eq!(vs[0].light_toggles.get("Laser Grid.001"), Some(&true));
    assert_eq!(vs[1].light_toggles.get("Laser Grid.001"), Some(&false));
}

#[test]
fn plan_from_options_requires_blend() {
    assert!(matches!(
        plan_from_options(&LoadOptions::default()).unwrap_err(),
        BatchError::Validation(_)
    ));

    let dir = fixture_dir("from_options");
    let opts = LoadOptions {
        blend_override: Some(dir.join("scene.json")),
        extra_variations: light_toggle_variations("Key"),
        ..LoadOptions::default()
    };
    let plan = plan_from_options(&opts).unwrap();
    assert_eq!(plan.variations.len(), 2);
}

#[test]
fn overrides_emptied_by_cli_flags_are_dropped() {
    let dir = fixture_dir("emptied_overrides");
    let path = write_plan(
        &dir,
        "plan.yaml",
        "defaults: {blend_path: scene.json}\nvariations:\n  - name: a\n    render: {samples: 512}\n  - name: b\n    render: {samples: 4, engine: EEVEE}\n",
    );
    let opts = LoadOptions {
        render: RenderOverrides {
            samples: Some(8),
            ..RenderOverrides::default()
        },
        ..LoadOptions::default()
    };
    let plan = load_plan_with(&path, &opts).unwrap();
    assert_eq!(plan.variations[0].render, None);
    assert_eq!(
        plan.variations[1].render,
        Some(RenderOverrides {
            engine: Some("EEVEE".to_string()),
            ..RenderOverrides::default()
        })
    );
}

#[test]
fn plan_dir_is_the_canonical_parent() {
    let dir = fixture_dir("plan_dir");
    let path = write_plan(&dir, "plan.yaml", BASIC);
    assert_eq!(
        resolve_plan_dir(&path).unwrap(),
        std::fs::canonicalize(&dir).unwrap()
    );

    let err = resolve_plan_dir(&dir.join("gone.yaml")).unwrap_err();
    assert!(matches!(err, BatchError::Validation(_)));
    assert!(err.to_string().contains("cannot resolve plan path"));
}
