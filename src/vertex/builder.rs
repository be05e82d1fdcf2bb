use super::VertexBuffer;
use crate::render::Renderer;
use bytemuck::NoUninit;
use std::marker::PhantomData;
use wgpu::util::DeviceExt;

/// Builder struct for a static VertexBuffer
/// The buffer is read with `Vertex::layout`
pub struct VertexBufferBuilder<'a, T: NoUninit> {
    label: Option<&'a str>,
    data: Vec<T>,
}

impl<T: NoUninit> Default for VertexBufferBuilder<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: NoUninit> VertexBufferBuilder<'a, T> {
    pub fn new() -> Self {
        Self {
            label: None,
            data: vec![],
        }
    }

    /// Creates the VertexBuffer
    /// This includes calls to the GPU; the buffer is never written again
    pub fn build(self, renderer: &Renderer) -> VertexBuffer<T> {
        let Self { label, data } = self;

        let buffer = renderer
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label,
                contents: bytemuck::cast_slice(data.as_slice()),
                usage: wgpu::BufferUsages::VERTEX,
            });

        VertexBuffer {
            buffer,
            vertices: PhantomData,
        }
    }

    /// Sets the vertices of the buffer.
    /// Will override any previously set vertices.
    pub fn with_vertices(mut self, vertices: &[T]) -> Self {
        self.data.clear();
        self.data.extend_from_slice(vertices);
        self
    }

    /// Sets the label of the VertexBuffer, overriding any previous value
    pub fn with_label(mut self, label: Option<&'a str>) -> Self {
        self.label = label;
        self
    }
}
