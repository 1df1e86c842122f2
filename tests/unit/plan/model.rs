use super::*;

fn basic_plan() -> Plan {
    Plan {
        defaults: DefaultSettings::with_blend_path("/scenes/diorama.json"),
        variations: vec![
            Variation {
                name: "front".to_string(),
                camera: Some(CameraOverride::named("CamFront")),
                ..Variation::default()
            },
            Variation {
                name: "lifted".to_string(),
                object_edits: vec![ObjectEdit {
                    object: "Cube".to_string(),
                    offset: Vec3::new(0.0, 0.0, 1.0),
                    rotation: Vec3::ZERO,
                    scale: Vec3::ONE,
                }],
                ..Variation::default()
            },
        ],
    }
}

#[test]
fn basic_plan_validates() {
    basic_plan().validate().unwrap();
}

#[test]
fn validate_rejects_duplicate_names() {
    let mut plan = basic_plan();
    plan.variations[1].name = "front".to_string();
    let err = plan.validate().unwrap_err();
    assert!(matches!(err, BatchError::Validation(_)));
    assert!(err.to_string().contains("duplicate variation name 'front'"));
}

#[test]
fn validate_rejects_colliding_file_stems() {
    let mut plan = basic_plan();
    plan.variations[0].name = "a/b".to_string();
    plan.variations[1].name = "a_b".to_string();
    let err = plan.validate().unwrap_err();
    assert!(err.to_string().contains("same output file"));
}

#[test]
fn validate_rejects_zero_samples_in_override() {
    let mut plan = basic_plan();
    plan.variations[0].render = Some(RenderOverrides {
        samples: Some(0),
        ..RenderOverrides::default()
    });
    let err = plan.validate().unwrap_err();
    assert!(err.to_string().contains("variations[0].render.samples"));
}

#[test]
fn validate_caps_resolution() {
    let mut plan = basic_plan();
    plan.defaults.resolution_x = 200_000;
    plan.defaults.resolution_y = 200_000;
    let err = plan.validate().unwrap_err();
    assert!(matches!(err, BatchError::Validation(_)));
    assert!(err.to_string().contains("at most 65536"));

    let mut plan = basic_plan();
    plan.defaults.resolution_x = MAX_RESOLUTION;
    plan.validate().unwrap();
    plan.variations[1].render = Some(RenderOverrides {
        resolution_y: Some(MAX_RESOLUTION + 1),
        ..RenderOverrides::default()
    });
    assert!(plan.validate().is_err());
}

#[test]
fn validate_rejects_incomplete_edit_order() {
    let mut plan = basic_plan();
    plan.defaults.edit_order = vec![EditCategory::Objects, EditCategory::Objects];
    assert!(plan.validate().is_err());
}

#[test]
fn validate_rejects_non_positive_lens() {
    let mut plan = basic_plan();
    plan.variations[0].camera = Some(CameraOverride {
        lens_mm: Some(0.0),
        ..CameraOverride::default()
    });
    assert!(plan.validate().is_err());
}

#[test]
fn output_path_uses_sanitized_stem_and_format_extension() {
    let plan = basic_plan();
    let mut v = plan.variations[0].clone();
    v.name = "shot: wide".to_string();
    v.render = Some(RenderOverrides {
        file_format: Some(FileFormat::OpenExr),
        ..RenderOverrides::default()
    });
    let settings = plan.defaults.resolve_render(&v);
    let path = plan.defaults.output_path(&v, &settings);
    assert_eq!(path, PathBuf::from("render_output").join("shot_ wide.exr"));
}

#[test]
fn render_overrides_only_replace_given_fields() {
    let base = RenderSettings::default();
    let over = RenderOverrides {
        samples: Some(16),
        color_mode: Some(ColorMode::Rgba),
        ..RenderOverrides::default()
    };
    let merged = over.apply(&base);
    assert_eq!(merged.samples, 16);
    assert_eq!(merged.color_mode, ColorMode::Rgba);
    assert_eq!(merged.engine, base.engine);
    assert_eq!(merged.resolution_x, base.resolution_x);
}

#[test]
fn camera_accepts_bare_name_or_mapping() {
    let v: Variation = serde_yaml::from_str("name: a\ncamera: CamFront\n").unwrap();
    assert_eq!(v.camera, Some(CameraOverride::named("CamFront")));

    let v: Variation =
        serde_yaml::from_str("name: b\ncamera: {location: [1, 2, 3], lens_mm: 50}\n").unwrap();
    let cam = v.camera.unwrap();
    assert_eq!(cam.name, None);
    assert_eq!(cam.location, Some(Vec3::new(1.0, 2.0, 3.0)));
    assert_eq!(cam.lens_mm, Some(50.0));
}

#[test]
fn variation_rejects_unknown_fields() {
    let res: Result<Variation, _> = serde_yaml::from_str("name: a\nobject_edit: []\n");
    assert!(res.is_err());
}

#[test]
fn node_edit_accepts_socket_alias() {
    let e: NodeEdit =
        serde_yaml::from_str("{material: M, node: N, socket: Strength, value: 2}").unwrap();
    assert_eq!(e.param, "Strength");
    assert_eq!(e.value, NodeValue::Scalar(2.0));
}

#[test]
fn file_format_aliases() {
    let f: FileFormat = serde_yaml::from_str("JPG").unwrap();
    assert_eq!(f, FileFormat::Jpeg);
    let f: FileFormat = serde_yaml::from_str("EXR").unwrap();
    assert_eq!(f, FileFormat::OpenExr);
    assert_eq!(serde_yaml::to_string(&FileFormat::OpenExr).unwrap().trim(), "OPEN_EXR");
}

#[test]
fn noop_detection() {
    let plan = basic_plan();
    assert!(!plan.variations[0].is_noop());
    assert!(Variation::default().is_noop());
}
