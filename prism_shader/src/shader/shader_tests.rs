//! Unit tests for shader.rs
//!
//! Drives `Shader` against the mock device and asserts on both the registry
//! state and the backend command log.

use std::sync::Arc;
use glam::Mat4;
use crate::backend::mock_device::*;
use crate::backend::{Program, ProgramReflection, RenderPass, Texture};
use crate::config::Config;
use crate::error::Error;
use crate::shader::{BlendMode, BufferType, DrawState, PrimitiveType, Shader, INDICES};
use crate::types::{NdArray, VariableType};

const VS: &str = "vertex source";
const FS: &str = "fragment source";

fn render_pass() -> Arc<dyn RenderPass> {
    Arc::new(MockRenderPass)
}

fn create(device: &MockDevice) -> Shader {
    Shader::new(device, render_pass(), "test", VS, FS, BlendMode::None).unwrap()
}

fn positions(count: usize) -> Vec<[f32; 2]> {
    (0..count).map(|i| [i as f32, 0.0]).collect()
}

/// Shader over `position_only_reflection` with `count` vertices bound
fn bound_points(device: &MockDevice, count: usize) -> Shader {
    let mut shader = create(device);
    shader.set_uniform("position", &positions(count)).unwrap();
    shader
}

fn bind_quad(shader: &mut Shader) {
    shader.set_uniform("position", &vec![[0.0f32, 0.0, 0.0]; 4]).unwrap();
    shader.set_uniform("mvp", &Mat4::IDENTITY).unwrap();
    shader.set_texture("image", Arc::new(MockTexture::new("checker", 4, 4))).unwrap();
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[test]
fn test_registry_built_from_reflection() {
    let device = MockDevice::new(quad_reflection());
    let shader = create(&device);

    assert_eq!(shader.buffer_count(), 5);
    assert_eq!(shader.buffer("position").unwrap().buffer_type(), BufferType::VertexBuffer);
    assert_eq!(shader.buffer("mvp").unwrap().buffer_type(), BufferType::UniformBuffer);
    assert_eq!(shader.buffer("image").unwrap().buffer_type(), BufferType::FragmentTexture);
    assert_eq!(shader.buffer("image_sampler").unwrap().buffer_type(), BufferType::FragmentSampler);
    assert_eq!(shader.buffer(INDICES).unwrap().buffer_type(), BufferType::IndexBuffer);
    assert!(shader.buffers().all(|(_, buffer)| !buffer.is_bound()));
}

#[test]
fn test_accessors() {
    let device = MockDevice::new(quad_reflection());
    let shader = Shader::new(&device, render_pass(), "quad", VS, FS, BlendMode::AlphaBlend).unwrap();

    assert_eq!(shader.name(), "quad");
    assert_eq!(shader.blend_mode(), BlendMode::AlphaBlend);
    assert_eq!(shader.backend(), crate::backend::Backend::OpenGl);
    assert_eq!(shader.state(), DrawState::Inactive);
    assert!(!shader.is_active());
    assert_eq!(shader.config().label, "mock");
    assert!(shader.render_pass().as_any().downcast_ref::<MockRenderPass>().is_some());
}

#[test]
fn test_program_downcasts_to_backend_type() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 3);

    let program = shader.program().as_any().downcast_ref::<MockProgram>().unwrap();
    assert!(!program.is_active());
    assert_eq!(program.reflection().parameters().len(), 1);

    shader.begin().unwrap();
    let program = shader.program().as_any().downcast_ref::<MockProgram>().unwrap();
    assert!(program.is_active());
    shader.end().unwrap();
}

#[test]
fn test_declared_indices_parameter_is_rejected() {
    let mut reflection = position_only_reflection();
    reflection.push(parameter(INDICES, BufferType::FragmentBuffer, 1, None));
    let device = MockDevice::new(reflection);

    match Shader::new(&device, render_pass(), "clash", VS, FS, BlendMode::None) {
        Err(Error::CompilationFailed(msg)) => assert!(msg.contains("reserved")),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("construction should fail"),
    }
}

#[test]
fn test_compile_failure_is_reported() {
    let device = MockDevice::failing("undeclared identifier 'colour'");
    match Shader::new(&device, render_pass(), "broken", VS, FS, BlendMode::None) {
        Err(Error::CompilationFailed(msg)) => assert!(msg.contains("colour")),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("construction should fail"),
    }
}

// ============================================================================
// SET_BUFFER / SET_UNIFORM
// ============================================================================

#[test]
fn test_rebinding_keeps_one_entry_with_latest_metadata() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = create(&device);
    let before = shader.buffer_count();

    shader.set_buffer("position", VariableType::Float32, 2, [3, 2, 1], &[0u8; 24]).unwrap();
    shader.set_buffer("position", VariableType::Float32, 2, [5, 2, 1], &[0u8; 40]).unwrap();

    assert_eq!(shader.buffer_count(), before);
    let buffer = shader.buffer("position").unwrap();
    assert_eq!(buffer.shape(), [5, 2, 1]);
    assert_eq!(buffer.size(), 40);
    assert_eq!(buffer.ndim(), Some(2));
}

#[test]
fn test_unknown_parameter_leaves_registry_untouched() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);
    shader.set_uniform("mvp", &Mat4::IDENTITY).unwrap();
    let before: Vec<String> = {
        let mut entries: Vec<String> = shader.buffers().map(|(n, b)| format!("{}={}", n, b)).collect();
        entries.sort();
        entries
    };

    match shader.set_uniform("nonexistent", &1.0f32) {
        Err(Error::UnknownParameter(name)) => assert_eq!(name, "nonexistent"),
        other => panic!("expected UnknownParameter, got {:?}", other),
    }
    assert!(matches!(
        shader.set_buffer("nonexistent", VariableType::UInt8, 1, [1, 1, 1], &[0]),
        Err(Error::UnknownParameter(_))
    ));

    let mut after: Vec<String> = shader.buffers().map(|(n, b)| format!("{}={}", n, b)).collect();
    after.sort();
    assert_eq!(before, after);
    assert!(shader.buffer("nonexistent").is_none());
}

#[test]
fn test_oversized_shape_is_rejected() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = create(&device);

    match shader.set_buffer("position", VariableType::Float32, 2, [usize::MAX, 2, 1], &[0u8; 8]) {
        Err(Error::InvalidShape(msg)) => assert!(msg.contains("overflows")),
        other => panic!("expected InvalidShape, got {:?}", other),
    }
    assert!(!shader.buffer("position").unwrap().is_bound());
}

#[test]
fn test_mat4_uniform_metadata() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);
    shader.set_uniform("mvp", &Mat4::from_scale(glam::Vec3::splat(2.0))).unwrap();

    let buffer = shader.buffer("mvp").unwrap();
    assert_eq!(buffer.ndim(), Some(2));
    assert_eq!(buffer.shape(), [4, 4, 1]);
    assert_eq!(buffer.size(), 16 * 4);
    assert_eq!(buffer.dtype(), VariableType::Float32);
    assert!(buffer.is_dirty());
    assert!(buffer.is_consistent());
}

#[test]
fn test_set_buffer_shape_validation() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = create(&device);

    assert!(matches!(
        shader.set_buffer("position", VariableType::Float32, 4, [1, 1, 1], &[0u8; 4]),
        Err(Error::InvalidShape(_))
    ));
    assert!(matches!(
        shader.set_buffer("position", VariableType::Invalid, 1, [2, 1, 1], &[0u8; 2]),
        Err(Error::InvalidShape(_))
    ));
    assert!(matches!(
        shader.set_buffer("position", VariableType::Float32, 2, [3, 2, 1], &[0u8; 20]),
        Err(Error::InvalidShape(_))
    ));
    assert!(!shader.buffer("position").unwrap().is_bound());
}

#[test]
fn test_shape_entries_past_ndim_are_normalised() {
    let device = MockDevice::new(position_only_reflection())
        .with_config(Config::default().with_validate_types(false));
    let mut shader = create(&device);
    shader.set_buffer("position", VariableType::Float32, 1, [6, 9, 9], &[0u8; 24]).unwrap();
    assert_eq!(shader.buffer("position").unwrap().shape(), [6, 1, 1]);
}

#[test]
fn test_declared_type_is_enforced() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);

    // mat4 declared, double matrix supplied
    match shader.set_uniform("mvp", &glam::DMat4::IDENTITY) {
        Err(Error::TypeMismatch(msg)) => assert!(msg.contains("float32")),
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
    // mat4 declared, mat3 supplied
    assert!(matches!(
        shader.set_uniform("mvp", &glam::Mat3::IDENTITY),
        Err(Error::TypeMismatch(_))
    ));
    // vec3 attribute declared, two components per vertex supplied
    assert!(matches!(
        shader.set_uniform("position", &positions(3)),
        Err(Error::TypeMismatch(_))
    ));
    assert!(!shader.buffer("mvp").unwrap().is_bound());
}

#[test]
fn test_type_validation_can_be_disabled() {
    let device = MockDevice::new(quad_reflection())
        .with_config(Config::default().with_validate_types(false));
    let mut shader = create(&device);
    shader.set_uniform("mvp", &glam::Mat3::IDENTITY).unwrap();
    assert_eq!(shader.buffer("mvp").unwrap().shape(), [3, 3, 1]);
}

#[test]
fn test_texture_slot_rejects_data() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);
    assert!(matches!(shader.set_uniform("image", &1i32), Err(Error::TypeMismatch(_))));
}

#[test]
fn test_ndarray_depth_four_fails_before_registry() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = create(&device);
    let bytes = [0u8; 16];
    let value = NdArray::new(VariableType::UInt8, &[2, 2, 2, 2], &bytes);
    assert!(matches!(shader.set_uniform("position", &value), Err(Error::InvalidShape(_))));
    assert!(!shader.buffer("position").unwrap().is_bound());
}

// ============================================================================
// SET_TEXTURE
// ============================================================================

#[test]
fn test_set_texture_also_fills_sampler() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);
    shader.set_texture("image", Arc::new(MockTexture::new("checker", 4, 4))).unwrap();

    assert!(shader.buffer("image").unwrap().texture().is_some());
    assert!(shader.buffer("image_sampler").unwrap().texture().is_some());
}

#[test]
fn test_set_texture_rejects_data_slot_and_unknown_name() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);
    let texture = Arc::new(MockTexture::new("checker", 4, 4));

    assert!(matches!(shader.set_texture("mvp", texture.clone()), Err(Error::TypeMismatch(_))));
    assert!(matches!(shader.set_texture("missing", texture), Err(Error::UnknownParameter(_))));
}

#[test]
fn test_texture_is_shared_not_copied() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);
    let texture: Arc<dyn crate::backend::Texture> = Arc::new(MockTexture::new("shared", 2, 2));
    shader.set_texture("image", texture.clone()).unwrap();
    assert!(Arc::ptr_eq(shader.buffer("image").unwrap().texture().unwrap(), &texture));
}

// ============================================================================
// DRAW PROTOCOL
// ============================================================================

#[test]
fn test_end_before_begin_fails() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 3);
    assert!(matches!(shader.end(), Err(Error::StateViolation(_))));
}

#[test]
fn test_double_begin_fails() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 3);
    shader.begin().unwrap();
    assert!(matches!(shader.begin(), Err(Error::StateViolation(_))));
    assert!(shader.is_active());
    shader.end().unwrap();
}

#[test]
fn test_draw_outside_pass_fails() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 3);
    assert!(matches!(
        shader.draw_array(PrimitiveType::Triangle, 0, 3, false),
        Err(Error::StateViolation(_))
    ));
}

#[test]
fn test_begin_requires_every_declared_parameter() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);
    shader.set_uniform("mvp", &Mat4::IDENTITY).unwrap();

    match shader.begin() {
        Err(Error::MissingBinding(msg)) => {
            assert!(msg.contains("position"));
            assert!(msg.contains("image"));
            assert!(!msg.contains(INDICES));
        }
        other => panic!("expected MissingBinding, got {:?}", other),
    }
    assert!(!shader.is_active());
}

#[test]
fn test_triangle_count_must_be_multiple_of_three() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 9);
    shader.begin().unwrap();
    device.clear_commands();

    match shader.draw_array(PrimitiveType::Triangle, 0, 7, false) {
        Err(Error::TopologyMismatch { primitive, count }) => {
            assert_eq!(primitive, PrimitiveType::Triangle);
            assert_eq!(count, 7);
        }
        other => panic!("expected TopologyMismatch, got {:?}", other),
    }
    assert!(device.commands().is_empty());

    shader.draw_array(PrimitiveType::Triangle, 0, 9, false).unwrap();
    assert_eq!(device.commands(), vec!["draw(Triangle, 0, 9, indexed=false)".to_string()]);
    shader.end().unwrap();
}

#[test]
fn test_line_count_must_be_even_strips_are_free() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 9);
    shader.begin().unwrap();

    assert!(matches!(
        shader.draw_array(PrimitiveType::Line, 0, 3, false),
        Err(Error::TopologyMismatch { .. })
    ));
    shader.draw_array(PrimitiveType::Line, 0, 4, false).unwrap();
    shader.draw_array(PrimitiveType::LineStrip, 0, 5, false).unwrap();
    shader.draw_array(PrimitiveType::TriangleStrip, 0, 7, false).unwrap();
    shader.draw_array(PrimitiveType::Point, 0, 1, false).unwrap();
    shader.end().unwrap();
}

#[test]
fn test_indexed_draw_requires_indices() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 4);
    shader.begin().unwrap();
    assert!(matches!(
        shader.draw_array(PrimitiveType::Triangle, 0, 6, true),
        Err(Error::MissingBinding(_))
    ));
    shader.end().unwrap();

    shader.set_uniform(INDICES, &[0u32, 1, 2, 2, 3, 0]).unwrap();
    shader.begin().unwrap();
    device.clear_commands();
    shader.draw_array(PrimitiveType::Triangle, 0, 6, true).unwrap();
    assert_eq!(device.commands(), vec!["draw(Triangle, 0, 6, indexed=true)".to_string()]);
    shader.end().unwrap();
}

#[test]
fn test_indexed_draw_requires_u32_indices() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 4);
    shader.set_uniform(INDICES, &[0u16, 1, 2]).unwrap();
    shader.begin().unwrap();
    assert!(matches!(
        shader.draw_array(PrimitiveType::Triangle, 0, 3, true),
        Err(Error::TypeMismatch(_))
    ));
    shader.end().unwrap();
}

#[test]
fn test_parameters_cannot_change_inside_pass() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 3);
    shader.set_uniform(INDICES, &[0u32, 1, 2]).unwrap();
    shader.begin().unwrap();
    shader.draw_array(PrimitiveType::Triangle, 0, 3, false).unwrap();

    assert!(matches!(shader.set_uniform("position", &positions(9)), Err(Error::StateViolation(_))));
    assert!(matches!(
        shader.set_buffer(INDICES, VariableType::UInt32, 1, [3, 1, 1], &[0u8; 12]),
        Err(Error::StateViolation(_))
    ));
    let position = shader.buffer("position").unwrap();
    assert!(position.has_resource());
    assert_eq!(position.shape(), [3, 2, 1]);
    assert!(!shader.buffer(INDICES).unwrap().is_dirty());

    // The range is still checked against what was uploaded
    assert!(matches!(
        shader.draw_array(PrimitiveType::Triangle, 0, 9, false),
        Err(Error::InvalidRange(_))
    ));
    shader.draw_array(PrimitiveType::Triangle, 0, 3, true).unwrap();
    shader.end().unwrap();
    assert!(!device.commands().iter().any(|command| command.contains(", 9, ")));

    shader.set_uniform("position", &positions(9)).unwrap();
    shader.begin().unwrap();
    shader.draw_array(PrimitiveType::Triangle, 0, 9, false).unwrap();
    shader.end().unwrap();
    assert!(device.commands().contains(&"allocate(position, 72)".to_string()));
}

#[test]
fn test_texture_cannot_change_inside_pass() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);
    bind_quad(&mut shader);
    shader.begin().unwrap();

    let replacement = Arc::new(MockTexture::new("noise", 2, 2));
    assert!(matches!(shader.set_texture("image", replacement), Err(Error::StateViolation(_))));
    let texture = shader.buffer("image").unwrap().texture().unwrap();
    assert_eq!(texture.size(), (4, 4));
    shader.end().unwrap();
}

#[test]
fn test_draw_range_is_checked() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 6);
    shader.set_uniform(INDICES, &[0u32, 1, 2]).unwrap();
    shader.begin().unwrap();

    assert!(matches!(
        shader.draw_array(PrimitiveType::Triangle, 3, 6, false),
        Err(Error::InvalidRange(_))
    ));
    assert!(matches!(
        shader.draw_array(PrimitiveType::Triangle, 0, 6, true),
        Err(Error::InvalidRange(_))
    ));
    assert!(matches!(
        shader.draw_array(PrimitiveType::Point, usize::MAX, 1, false),
        Err(Error::InvalidRange(_))
    ));
    shader.draw_array(PrimitiveType::Triangle, 3, 3, false).unwrap();
    shader.end().unwrap();
}

#[test]
fn test_zero_count_draws_nothing() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 3);
    shader.begin().unwrap();
    device.clear_commands();
    shader.draw_array(PrimitiveType::Triangle, 0, 0, false).unwrap();
    assert!(device.commands().is_empty());
    shader.end().unwrap();
}

#[test]
fn test_begin_uploads_then_binds_and_clears_dirty() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = Shader::new(&device, render_pass(), "quad", VS, FS, BlendMode::AlphaBlend).unwrap();
    bind_quad(&mut shader);
    device.clear_commands();

    shader.begin().unwrap();
    assert_eq!(device.commands(), vec![
        "activate(AlphaBlend)".to_string(),
        "bind_texture(image, 0, checker)".to_string(),
        "bind_texture(image_sampler, 0, checker)".to_string(),
        "allocate(mvp, 64)".to_string(),
        "bind(mvp, 1, dirty=true)".to_string(),
        "allocate(position, 48)".to_string(),
        "bind(position, 0, dirty=true)".to_string(),
    ]);
    assert!(shader.buffers().all(|(_, buffer)| !buffer.is_dirty()));
    assert!(shader.buffer("mvp").unwrap().has_resource());
    shader.end().unwrap();
    assert_eq!(device.commands().last().map(String::as_str), Some("deactivate"));
}

#[test]
fn test_clean_records_are_not_uploaded_again() {
    let device = MockDevice::new(quad_reflection());
    let mut shader = create(&device);
    bind_quad(&mut shader);
    shader.begin().unwrap();
    shader.end().unwrap();

    shader.set_uniform("mvp", &Mat4::from_scale(glam::Vec3::splat(0.5))).unwrap();
    device.clear_commands();
    shader.begin().unwrap();
    shader.end().unwrap();

    let commands = device.commands();
    assert!(commands.contains(&"update(mvp, 64)".to_string()));
    assert!(commands.contains(&"bind(mvp, 1, dirty=true)".to_string()));
    assert!(commands.contains(&"bind(position, 0, dirty=false)".to_string()));
    assert!(!commands.iter().any(|c| c.starts_with("allocate")));
    assert!(!commands.iter().any(|c| c.starts_with("update(position")));
}

#[test]
fn test_resized_record_is_reallocated() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 3);
    shader.begin().unwrap();
    shader.end().unwrap();

    shader.set_uniform("position", &positions(6)).unwrap();
    device.clear_commands();
    shader.begin().unwrap();
    assert!(device.commands().contains(&"allocate(position, 48)".to_string()));
    shader.end().unwrap();
}

// ============================================================================
// SCOPE GUARD
// ============================================================================

#[test]
fn test_scope_ends_pass_on_drop() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 3);
    {
        let mut pass = shader.scope().unwrap();
        assert!(pass.shader().is_active());
        pass.draw_array(PrimitiveType::Triangle, 0, 3, false).unwrap();
    }
    assert!(!shader.is_active());
    assert_eq!(device.commands().last().map(String::as_str), Some("deactivate"));
}

#[test]
fn test_scope_finish_reports_end() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = bound_points(&device, 3);
    let pass = shader.scope().unwrap();
    pass.finish().unwrap();
    assert!(!shader.is_active());

    let deactivations = device.commands().iter().filter(|c| *c == "deactivate").count();
    assert_eq!(deactivations, 1);
}

#[test]
fn test_scope_propagates_begin_failure() {
    let device = MockDevice::new(position_only_reflection());
    let mut shader = create(&device);
    assert!(matches!(shader.scope(), Err(Error::MissingBinding(_))));
}

#[test]
fn test_empty_interface_only_has_indices() {
    let device = MockDevice::new(ProgramReflection::new());
    let mut shader = create(&device);
    assert_eq!(shader.buffer_count(), 1);
    shader.begin().unwrap();
    shader.draw_array(PrimitiveType::Triangle, 0, 3, false).unwrap();
    shader.end().unwrap();
}
