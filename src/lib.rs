use thiserror::Error;

pub mod animation;
pub mod app;
pub mod cli;
pub mod display;
pub mod frame;
pub mod geometry;
pub mod platform;
pub mod render;
pub mod scene;
pub mod uniform;
pub mod vertex;

#[derive(Clone, Debug, Error)]
pub enum GraphicsInitError {
    #[error("failed to find adapter for WGPU instance")]
    NoAdapter,
    #[error("WGPU failed to request device: {0}")]
    NoDevice(#[from] wgpu::RequestDeviceError),
    #[error("WGPU failed to create surface: {0}")]
    NoSurface(#[from] wgpu::CreateSurfaceError),
    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,
}

pub mod prelude {
    pub use crate::animation::{Channel, ChannelAnimation, Color, ColorPolicy, Wave};
    pub use crate::frame::{
        render_frame, ColorCursor, DrawSink, FrameClock, FrameRenderer, LoopState, ProgramError,
        ShaderProgram, ShaderSources, ShaderStage,
    };
    pub use crate::geometry::{
        GeometryDesc, GeometryError, GeometryLayout, GeometryStore, TriangleRegion,
    };
    pub use crate::render::{
        BindGroupLayoutBuilder, RenderPipeline, RenderPipelineBuilder, Renderer, ShaderBuilder,
    };
    pub use crate::scene::{Scene, SceneError};
    pub use crate::uniform::{Slots, Uniform, UniformBuilder};
    pub use crate::vertex::{IndexBuffer, Vertex, VertexBuffer, VertexBufferBuilder};

    pub use bytemuck;
    pub use wgpu;
}

pub use app::run;
pub use platform::block_on;
