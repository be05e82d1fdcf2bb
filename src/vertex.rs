use crate::render::Renderer;
use bytemuck::{NoUninit, Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use wgpu::util::DeviceExt;
use wgpu::RenderPass;

pub mod builder;
pub use builder::VertexBufferBuilder;

/// A bare 3D position, passed straight through to clip space
#[derive(Clone, Copy, PartialEq, Debug, Default, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
#[serde(transparent)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
        }
    }

    /// The single vertex layout every pipeline reads positions with
    pub const fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Static vertex storage, written once at creation
pub struct VertexBuffer<T: NoUninit> {
    buffer: wgpu::Buffer,
    vertices: PhantomData<T>,
}

/// Static index storage, written once at creation
pub struct IndexBuffer<T: num_traits::PrimInt + NoUninit> {
    buffer: wgpu::Buffer,
    format: wgpu::IndexFormat,
    indices: PhantomData<T>,
}

impl<T: num_traits::PrimInt + NoUninit> IndexBuffer<T> {
    pub fn new(
        renderer: &Renderer,
        indices: &[T],
        format: wgpu::IndexFormat,
        label: Option<&str>,
    ) -> Self {
        let buffer = renderer
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label,
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            buffer,
            format,
            indices: PhantomData,
        }
    }

    pub fn bind(&self, render_pass: &mut RenderPass<'_>) {
        render_pass.set_index_buffer(self.buffer.slice(..), self.format);
    }
}

impl<T: NoUninit> VertexBuffer<T> {
    pub fn bind(&self, render_pass: &mut RenderPass<'_>, slot: u32) {
        render_pass.set_vertex_buffer(slot, self.buffer.slice(..));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vertex_is_three_packed_floats() {
        assert_eq!(12, std::mem::size_of::<Vertex>());
        assert_eq!(
            &[1.0f32, -1.0, 0.5],
            bytemuck::cast_slice::<Vertex, f32>(&[Vertex::new(1.0, -1.0, 0.5)])
        );
    }

    #[test]
    fn vertex_attribute_matches_shader_input() {
        let [attribute] = Vertex::ATTRIBUTES;
        assert_eq!(0, attribute.shader_location);
        assert_eq!(0, attribute.offset);
        assert_eq!(wgpu::VertexFormat::Float32x3, attribute.format);
    }

    #[test]
    fn vertex_layout_steps_one_position_per_vertex() {
        let layout = Vertex::layout();
        assert_eq!(12, layout.array_stride);
        assert_eq!(wgpu::VertexStepMode::Vertex, layout.step_mode);
        assert_eq!(&Vertex::ATTRIBUTES[..], layout.attributes);
    }
}
