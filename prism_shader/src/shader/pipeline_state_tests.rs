//! Unit tests for pipeline_state.rs

use glam::Vec4;
use crate::shader::{BlendMode, PrimitiveType};

// ============================================================================
// PRIMITIVE TYPE
// ============================================================================

#[test]
fn test_list_topologies_need_whole_primitives() {
    assert!(PrimitiveType::Triangle.accepts_count(9));
    assert!(!PrimitiveType::Triangle.accepts_count(7));
    assert!(PrimitiveType::Line.accepts_count(4));
    assert!(!PrimitiveType::Line.accepts_count(3));
}

#[test]
fn test_strips_and_points_are_unconstrained() {
    for count in [1, 2, 5, 7, 11] {
        assert!(PrimitiveType::Point.accepts_count(count));
        assert!(PrimitiveType::LineStrip.accepts_count(count));
        assert!(PrimitiveType::TriangleStrip.accepts_count(count));
    }
}

#[test]
fn test_zero_count_is_accepted_everywhere() {
    assert!(PrimitiveType::Triangle.accepts_count(0));
    assert!(PrimitiveType::Line.accepts_count(0));
}

// ============================================================================
// BLEND MODE
// ============================================================================

#[test]
fn test_default_blend_mode_is_none() {
    assert_eq!(BlendMode::default(), BlendMode::None);
}

#[test]
fn test_no_blending_replaces_destination() {
    let new = Vec4::new(0.2, 0.4, 0.6, 0.5);
    let old = Vec4::new(1.0, 1.0, 1.0, 1.0);
    assert_eq!(BlendMode::None.blend(new, old), new);
}

#[test]
fn test_alpha_blend_at_half_alpha() {
    let new = Vec4::new(1.0, 0.0, 0.0, 0.5);
    let old = Vec4::new(0.0, 0.0, 1.0, 1.0);
    let out = BlendMode::AlphaBlend.blend(new, old);
    let expected = new * 0.5 + old * 0.5;
    assert!((out - expected).abs().max_element() < 1e-6);
    assert!((out.x - 0.5).abs() < 1e-6);
    assert!((out.z - 0.5).abs() < 1e-6);
}

#[test]
fn test_alpha_blend_extremes() {
    let new = Vec4::new(0.3, 0.6, 0.9, 1.0);
    let old = Vec4::new(0.1, 0.1, 0.1, 1.0);
    assert_eq!(BlendMode::AlphaBlend.blend(new, old), new);

    let transparent = Vec4::new(0.3, 0.6, 0.9, 0.0);
    assert_eq!(BlendMode::AlphaBlend.blend(transparent, old), old);
}
