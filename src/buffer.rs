//! GL buffer objects, vertex arrays, and vertex attribute layouts.

use glow::HasContext;

use crate::error::{GfxError, Result};

/// Which bind point a [`Buffer`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// `GL_ARRAY_BUFFER`.
    Vertex,
    /// `GL_ELEMENT_ARRAY_BUFFER`.
    Index,
}

impl BufferKind {
    fn target(self) -> u32 {
        match self {
            Self::Vertex => glow::ARRAY_BUFFER,
            Self::Index => glow::ELEMENT_ARRAY_BUFFER,
        }
    }
}

/// Update frequency hint passed to `glBufferData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    Static,
    /// Rewritten often, drawn many times.
    Dynamic,
    /// Rewritten every draw.
    Stream,
}

impl BufferUsage {
    fn gl(self) -> u32 {
        match self {
            Self::Static => glow::STATIC_DRAW,
            Self::Dynamic => glow::DYNAMIC_DRAW,
            Self::Stream => glow::STREAM_DRAW,
        }
    }
}

/// A vertex or index buffer.
#[derive(Debug)]
pub struct Buffer {
    raw: glow::Buffer,
    kind: BufferKind,
}

impl Buffer {
    /// Create an empty buffer.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the driver cannot create the buffer.
    pub unsafe fn new(gl: &glow::Context, kind: BufferKind) -> Result<Self> {
        let raw = unsafe { gl.create_buffer() }.map_err(GfxError::Gl)?;
        Ok(Self { raw, kind })
    }

    /// The buffer's bind point.
    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Bind to this buffer's target.
    ///
    /// # Safety
    ///
    /// Requires the context this buffer was created with to be current.
    pub unsafe fn bind(&self, gl: &glow::Context) {
        unsafe { gl.bind_buffer(self.kind.target(), Some(self.raw)) };
    }

    /// Unbind this buffer's target.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    pub unsafe fn unbind(&self, gl: &glow::Context) {
        unsafe { gl.bind_buffer(self.kind.target(), None) };
    }

    /// Replace the buffer's storage with `bytes`. The buffer must be bound.
    ///
    /// # Safety
    ///
    /// Requires the context this buffer was created with to be current.
    pub unsafe fn data(&self, gl: &glow::Context, bytes: &[u8], usage: BufferUsage) {
        unsafe { gl.buffer_data_u8_slice(self.kind.target(), bytes, usage.gl()) };
    }

    /// Allocate `size` bytes of uninitialized storage. The buffer must be
    /// bound.
    ///
    /// # Safety
    ///
    /// Requires the context this buffer was created with to be current.
    pub unsafe fn allocate(&self, gl: &glow::Context, size: usize, usage: BufferUsage) {
        let size = i32::try_from(size).unwrap_or(i32::MAX);
        unsafe { gl.buffer_data_size(self.kind.target(), size, usage.gl()) };
    }

    /// Overwrite part of the storage starting at `offset` bytes. The buffer
    /// must be bound and large enough.
    ///
    /// # Safety
    ///
    /// Requires the context this buffer was created with to be current.
    pub unsafe fn sub_data(&self, gl: &glow::Context, offset: usize, bytes: &[u8]) {
        let offset = i32::try_from(offset).unwrap_or(i32::MAX);
        unsafe { gl.buffer_sub_data_u8_slice(self.kind.target(), offset, bytes) };
    }

    /// Delete the buffer.
    ///
    /// # Safety
    ///
    /// Must be called with the context this buffer was created with, at most
    /// once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_buffer(self.raw) };
    }
}

/// Shape of one float vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// `float`
    Float,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
}

impl AttributeType {
    /// Number of `f32` components.
    #[must_use]
    pub fn components(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        self.components() * std::mem::size_of::<f32>()
    }
}

/// An interleaved vertex format. Attribute `i` is bound to shader
/// location `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    attributes: Vec<AttributeType>,
}

impl VertexLayout {
    /// An empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute at the next location.
    #[must_use]
    pub fn with(mut self, attribute: AttributeType) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// The attributes in location order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeType] {
        &self.attributes
    }

    /// Bytes between consecutive vertices.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.attributes.iter().map(|a| a.size()).sum()
    }

    /// Byte offset of each attribute within a vertex.
    #[must_use]
    pub fn offsets(&self) -> Vec<usize> {
        self.attributes
            .iter()
            .scan(0, |offset, a| {
                let current = *offset;
                *offset += a.size();
                Some(current)
            })
            .collect()
    }

    /// Enable and describe every attribute on the bound VAO/VBO.
    ///
    /// # Safety
    ///
    /// Requires a current context with the target vertex array and vertex
    /// buffer bound.
    pub unsafe fn apply(&self, gl: &glow::Context) {
        let stride = i32::try_from(self.stride()).unwrap_or(i32::MAX);
        for (index, (attribute, offset)) in self.attributes.iter().zip(self.offsets()).enumerate() {
            #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            unsafe {
                gl.enable_vertex_attrib_array(index as u32);
                gl.vertex_attrib_pointer_f32(
                    index as u32,
                    attribute.components() as i32,
                    glow::FLOAT,
                    false,
                    stride,
                    offset as i32,
                );
            }
        }
    }
}

/// A vertex array object.
#[derive(Debug)]
pub struct VertexArray {
    raw: glow::VertexArray,
}

impl VertexArray {
    /// Create a vertex array.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the driver cannot create the object.
    pub unsafe fn new(gl: &glow::Context) -> Result<Self> {
        let raw = unsafe { gl.create_vertex_array() }.map_err(GfxError::Gl)?;
        Ok(Self { raw })
    }

    /// Bind this vertex array.
    ///
    /// # Safety
    ///
    /// Requires the context this vertex array was created with to be current.
    pub unsafe fn bind(&self, gl: &glow::Context) {
        unsafe { gl.bind_vertex_array(Some(self.raw)) };
    }

    /// Unbind whatever vertex array is bound.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    pub unsafe fn unbind(gl: &glow::Context) {
        unsafe { gl.bind_vertex_array(None) };
    }

    /// Delete the vertex array.
    ///
    /// # Safety
    ///
    /// Must be called with the context this vertex array was created with,
    /// at most once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_vertex_array(self.raw) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_sizes() {
        assert_eq!(AttributeType::Float.size(), 4);
        assert_eq!(AttributeType::Vec2.size(), 8);
        assert_eq!(AttributeType::Vec3.size(), 12);
        assert_eq!(AttributeType::Vec4.size(), 16);
    }

    #[test]
    fn mesh_layout_stride_and_offsets() {
        let layout = VertexLayout::new()
            .with(AttributeType::Vec3)
            .with(AttributeType::Vec3)
            .with(AttributeType::Vec2);
        assert_eq!(layout.stride(), 32);
        assert_eq!(layout.offsets(), vec![0, 12, 24]);
    }

    #[test]
    fn empty_layout_has_zero_stride() {
        let layout = VertexLayout::new();
        assert_eq!(layout.stride(), 0);
        assert!(layout.offsets().is_empty());
    }

    #[test]
    fn attributes_keep_insertion_order() {
        let layout = VertexLayout::new()
            .with(AttributeType::Vec4)
            .with(AttributeType::Float);
        assert_eq!(
            layout.attributes(),
            &[AttributeType::Vec4, AttributeType::Float]
        );
        assert_eq!(layout.offsets(), vec![0, 16]);
    }

    #[test]
    fn buffer_targets() {
        assert_eq!(BufferKind::Vertex.target(), glow::ARRAY_BUFFER);
        assert_eq!(BufferKind::Index.target(), glow::ELEMENT_ARRAY_BUFFER);
        assert_eq!(BufferUsage::Dynamic.gl(), glow::DYNAMIC_DRAW);
    }
}
