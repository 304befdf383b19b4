//! Indexed meshes and the renderer's built-in geometry.

use std::path::Path;

use bytemuck::Pod;
use glow::HasContext;

use crate::buffer::{Buffer, BufferKind, BufferUsage, VertexArray, VertexLayout};
use crate::error::Result;
use crate::rollback::Rollback;
use crate::types::{Vertex2D, Vertex3D};

/// Two triangles covering a quad whose corners are listed
/// top-left, bottom-left, bottom-right, top-right.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Quad covering all of clip space, used to composite layers.
pub const FULLSCREEN_QUAD: [Vertex2D; 4] = [
    Vertex2D { position: [-1.0, 1.0], uv: [0.0, 1.0] },
    Vertex2D { position: [-1.0, -1.0], uv: [0.0, 0.0] },
    Vertex2D { position: [1.0, -1.0], uv: [1.0, 0.0] },
    Vertex2D { position: [1.0, 1.0], uv: [1.0, 1.0] },
];

/// Unit quad centred on the origin, scaled by the sprite transform.
pub const UNIT_QUAD: [Vertex2D; 4] = [
    Vertex2D { position: [-0.5, 0.5], uv: [0.0, 1.0] },
    Vertex2D { position: [-0.5, -0.5], uv: [0.0, 0.0] },
    Vertex2D { position: [0.5, -0.5], uv: [1.0, 0.0] },
    Vertex2D { position: [0.5, 0.5], uv: [1.0, 1.0] },
];

/// Corners of the skybox cube.
pub const SKYBOX_CUBE: [[f32; 3]; 8] = [
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, -1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
];

/// Triangles of the skybox cube, wound to face inward.
pub const SKYBOX_INDICES: [u32; 36] = [
    1, 2, 6, 6, 5, 1, //
    0, 4, 7, 7, 3, 0, //
    4, 5, 6, 6, 7, 4, //
    0, 3, 2, 2, 1, 0, //
    0, 1, 5, 5, 4, 0, //
    3, 7, 6, 6, 2, 3,
];

/// Interleave flat position/normal/uv arrays into [`Vertex3D`]s.
///
/// The vertex count is taken from `positions`. Normals or UVs that are
/// missing (or too short) are filled with zeros.
#[must_use]
pub fn interleave_mesh(positions: &[f32], normals: &[f32], uvs: &[f32]) -> Vec<Vertex3D> {
    let count = positions.len() / 3;
    let has_normals = normals.len() >= count * 3;
    let has_uvs = uvs.len() >= count * 2;

    (0..count)
        .map(|i| Vertex3D {
            position: [positions[3 * i], positions[3 * i + 1], positions[3 * i + 2]],
            normal: if has_normals {
                [normals[3 * i], normals[3 * i + 1], normals[3 * i + 2]]
            } else {
                [0.0; 3]
            },
            uv: if has_uvs {
                [uvs[2 * i], uvs[2 * i + 1]]
            } else {
                [0.0; 2]
            },
        })
        .collect()
}

/// A VAO with its vertex and index buffers.
#[derive(Debug)]
pub struct Model {
    vao: VertexArray,
    vbo: Buffer,
    ebo: Buffer,
    index_count: i32,
}

impl Model {
    /// Upload interleaved vertices and indices.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if any of the GL objects cannot be created. Objects created
    /// before the failure are deleted.
    pub unsafe fn from_vertices<V: Pod>(
        gl: &glow::Context,
        vertices: &[V],
        indices: &[u32],
        layout: &VertexLayout,
    ) -> Result<Self> {
        let mut rollback = Rollback::new(gl);
        let vao = unsafe { VertexArray::new(gl) }?;
        rollback.push(&vao);
        let vbo = unsafe { rollback.check(Buffer::new(gl, BufferKind::Vertex)) }?;
        rollback.push(&vbo);
        let ebo = unsafe { rollback.check(Buffer::new(gl, BufferKind::Index)) }?;

        unsafe {
            vao.bind(gl);
            vbo.bind(gl);
            vbo.data(gl, bytemuck::cast_slice(vertices), BufferUsage::Static);
            ebo.bind(gl);
            ebo.data(gl, bytemuck::cast_slice(indices), BufferUsage::Static);
            layout.apply(gl);
            VertexArray::unbind(gl);
            vbo.unbind(gl);
        }

        log::debug!(
            "created model with {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );
        Ok(Self {
            vao,
            vbo,
            ebo,
            index_count: i32::try_from(indices.len()).unwrap_or(i32::MAX),
        })
    }

    /// Load a Wavefront OBJ file. All meshes in the file are merged into one
    /// model; materials are ignored.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be loaded or the upload fails.
    pub unsafe fn load_obj(gl: &glow::Context, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..tobj::LoadOptions::default()
        };
        let (models, _materials) = tobj::load_obj(path, &options)?;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for model in &models {
            let mesh = &model.mesh;
            let base = u32::try_from(vertices.len()).unwrap_or(u32::MAX);
            vertices.extend(interleave_mesh(&mesh.positions, &mesh.normals, &mesh.texcoords));
            indices.extend(mesh.indices.iter().map(|i| base + i));
        }

        log::debug!(
            "loaded {} ({} meshes, {} triangles)",
            path.display(),
            models.len(),
            indices.len() / 3
        );
        unsafe { Self::from_vertices(gl, &vertices, &indices, &Vertex3D::layout()) }
    }

    /// Number of indices drawn by [`draw`](Self::draw).
    #[must_use]
    pub fn index_count(&self) -> i32 {
        self.index_count
    }

    /// Draw all triangles with whatever program is bound.
    ///
    /// # Safety
    ///
    /// Requires the context this model was created with to be current.
    pub unsafe fn draw(&self, gl: &glow::Context) {
        unsafe {
            self.vao.bind(gl);
            gl.draw_elements(glow::TRIANGLES, self.index_count, glow::UNSIGNED_INT, 0);
            VertexArray::unbind(gl);
        }
    }

    /// Delete the VAO and buffers.
    ///
    /// # Safety
    ///
    /// Must be called with the context this model was created with, at most
    /// once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe {
            self.vao.destroy(gl);
            self.vbo.destroy(gl);
            self.ebo.destroy(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleave_combines_attributes() {
        let positions = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let normals = [0.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let uvs = [0.25, 0.5, 0.75, 1.0];
        let vertices = interleave_mesh(&positions, &normals, &uvs);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[1].position, [3.0, 4.0, 5.0]);
        assert_eq!(vertices[1].normal, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[1].uv, [0.75, 1.0]);
    }

    #[test]
    fn interleave_zero_fills_missing_attributes() {
        let vertices = interleave_mesh(&[1.0, 2.0, 3.0], &[], &[]);
        assert_eq!(vertices.len(), 1);
        assert_eq!(vertices[0].normal, [0.0; 3]);
        assert_eq!(vertices[0].uv, [0.0; 2]);
    }

    #[test]
    fn interleave_ignores_short_attribute_arrays() {
        let vertices = interleave_mesh(&[0.0; 6], &[1.0, 1.0, 1.0], &[0.5]);
        assert_eq!(vertices[0].normal, [0.0; 3]);
        assert_eq!(vertices[0].uv, [0.0; 2]);
    }

    #[test]
    fn quad_indices_cover_two_triangles() {
        assert_eq!(QUAD_INDICES.len(), 6);
        assert!(QUAD_INDICES.iter().all(|&i| i < 4));
    }

    #[test]
    fn fullscreen_quad_spans_clip_space() {
        for v in FULLSCREEN_QUAD {
            assert!(v.position.iter().all(|c| c.abs() == 1.0));
            // UVs follow positions so the layer is not flipped.
            assert_eq!(v.uv[0], (v.position[0] + 1.0) / 2.0);
            assert_eq!(v.uv[1], (v.position[1] + 1.0) / 2.0);
        }
    }

    #[test]
    fn unit_quad_is_one_unit_wide() {
        let xs: Vec<f32> = UNIT_QUAD.iter().map(|v| v.position[0]).collect();
        let min = xs.iter().copied().fold(f32::INFINITY, f32::min);
        let max = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!((max - min - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn skybox_indices_reference_every_corner() {
        assert_eq!(SKYBOX_INDICES.len(), 36);
        for corner in 0..8u32 {
            assert!(SKYBOX_INDICES.contains(&corner));
        }
        assert!(SKYBOX_INDICES.iter().all(|&i| (i as usize) < SKYBOX_CUBE.len()));
    }
}
