// SPDX-License-Identifier: MPL-2.0

//! Validation of the luminance quad program

use edge_camera::render::LUMA_QUAD_WGSL;

fn parse() -> naga::Module {
    naga::front::wgsl::parse_str(LUMA_QUAD_WGSL).unwrap_or_else(|e| {
        panic!("{}", e.emit_to_string(LUMA_QUAD_WGSL));
    })
}

#[test]
fn test_shader_validates() {
    let module = parse();
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .unwrap();
}

#[test]
fn test_shader_entry_points() {
    let module = parse();
    let stages: Vec<(&str, naga::ShaderStage)> = module
        .entry_points
        .iter()
        .map(|ep| (ep.name.as_str(), ep.stage))
        .collect();
    assert!(stages.contains(&("vs_main", naga::ShaderStage::Vertex)));
    assert!(stages.contains(&("fs_main", naga::ShaderStage::Fragment)));
}

#[test]
fn test_shader_rejects_garbage() {
    assert!(naga::front::wgsl::parse_str("fn broken( {").is_err());
}
