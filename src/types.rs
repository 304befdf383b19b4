//! Plain data types shared between the renderer and its callers.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use crate::buffer::{AttributeType, VertexLayout};
use crate::texture::Texture;

/// A mesh vertex for the deferred 3D pass.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex3D {
    /// Object-space position.
    pub position: [f32; 3],
    /// Object-space normal.
    pub normal: [f32; 3],
    /// Texture coordinate.
    pub uv: [f32; 2],
}

impl Vertex3D {
    /// `vec3 position, vec3 normal, vec2 uv` at locations 0..3.
    #[must_use]
    pub fn layout() -> VertexLayout {
        VertexLayout::new()
            .with(AttributeType::Vec3)
            .with(AttributeType::Vec3)
            .with(AttributeType::Vec2)
    }
}

/// A vertex for flat geometry: the unit quad and the fullscreen quad.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex2D {
    /// Position.
    pub position: [f32; 2],
    /// Texture coordinate.
    pub uv: [f32; 2],
}

impl Vertex2D {
    /// `vec2 position, vec2 uv` at locations 0..2.
    #[must_use]
    pub fn layout() -> VertexLayout {
        VertexLayout::new()
            .with(AttributeType::Vec2)
            .with(AttributeType::Vec2)
    }
}

/// Surface description for [`Renderer::draw_model`](crate::Renderer::draw_model).
///
/// The albedo color is multiplied with the albedo texture; without a
/// texture the renderer binds a 1×1 white one.
#[derive(Debug, Clone)]
pub struct Material {
    /// Base color.
    pub albedo: Vec4,
    /// Optional albedo texture, shared between materials.
    pub albedo_texture: Option<Arc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vec4::ONE,
            albedo_texture: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layouts_match_struct_sizes() {
        assert_eq!(Vertex3D::layout().stride(), std::mem::size_of::<Vertex3D>());
        assert_eq!(Vertex2D::layout().stride(), std::mem::size_of::<Vertex2D>());
    }

    #[test]
    fn vertex3d_field_offsets_match_layout() {
        let offsets = Vertex3D::layout().offsets();
        assert_eq!(offsets[1], std::mem::offset_of!(Vertex3D, normal));
        assert_eq!(offsets[2], std::mem::offset_of!(Vertex3D, uv));
    }

    #[test]
    fn default_material_is_untextured_white() {
        let material = Material::default();
        assert_eq!(material.albedo, Vec4::ONE);
        assert!(material.albedo_texture.is_none());
    }
}
