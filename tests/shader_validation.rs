//! WGSL validation.
//!
//! Every shader source is parsed and validated with naga so a typo fails
//! here instead of at pipeline creation on someone's GPU.

use choreo::shaders;
use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

fn validate(source: &str, label: &str) -> naga::Module {
    let module = match wgsl::parse_str(source) {
        Ok(module) => module,
        Err(err) => panic!("{} shader failed to parse:\n{}", label, err.emit_to_string(source)),
    };
    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    if let Err(err) = validator.validate(&module) {
        panic!("{} shader failed validation: {:?}", label, err);
    }
    module
}

fn entry_points(module: &naga::Module) -> Vec<&str> {
    module.entry_points.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn test_point_shader_is_valid() {
    let module = validate(&shaders::point_shader(), "point");
    let entries = entry_points(&module);
    assert!(entries.contains(&"vs_point"));
    assert!(entries.contains(&"fs_point"));
}

#[test]
fn test_line_shader_is_valid() {
    let module = validate(&shaders::line_shader(), "line");
    let entries = entry_points(&module);
    assert!(entries.contains(&"vs_line"));
    assert!(entries.contains(&"fs_line"));
}

#[test]
fn test_post_shader_is_valid() {
    let module = validate(shaders::post_shader(), "post");
    let entries = entry_points(&module);
    for name in ["vs_fullscreen", "fs_trail", "fs_bright", "fs_blur", "fs_composite"] {
        assert!(entries.contains(&name), "missing entry point {}", name);
    }
}

#[test]
fn test_scene_uniforms_match_rust_layout() {
    let module = validate(&shaders::point_shader(), "point");
    let (_, ty) = module
        .types
        .iter()
        .find(|(_, ty)| ty.name.as_deref() == Some("SceneUniforms"))
        .expect("SceneUniforms struct");
    match &ty.inner {
        naga::TypeInner::Struct { span, .. } => assert_eq!(*span, 112),
        other => panic!("unexpected type {:?}", other),
    }
}
