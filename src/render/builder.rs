use super::{RenderPipeline, Renderer, Shader};
use std::{borrow::Cow, marker::PhantomData};

mod sealed {
    pub trait Sealed {}
}

pub trait BuilderState: sealed::Sealed {}

impl<T: sealed::Sealed> BuilderState for T {}

// Builder struct for a single GLSL shader stage
// GLSL stages always use "main" as their entry point.
// Must add a source and stage to build.
pub struct ShaderBuilder<'a, S: BuilderState> {
    label: Option<&'a str>,
    source: Option<(Cow<'a, str>, wgpu::naga::ShaderStage)>,
    state: PhantomData<S>,
}

// Builder for a BindGroupLayout
pub struct BindGroupLayoutBuilder<'a> {
    label: Option<&'a str>,
    entries: Vec<wgpu::BindGroupLayoutEntry>,
}

// Builder struct for a rendering pipeline
// Requires adding a vertex shader
pub struct RenderPipelineBuilder<'a, S: BuilderState> {
    vertex_shader: Option<&'a Shader>,
    fragment_shader: Option<&'a Shader>,
    pipeline_layout_label: Option<&'a str>,
    pipeline_label: Option<&'a str>,
    bind_group_layouts: Vec<&'a wgpu::BindGroupLayout>,
    buffers: Vec<wgpu::VertexBufferLayout<'a>>,
    targets: Vec<Option<wgpu::ColorTargetState>>,
    primitive: wgpu::PrimitiveState,
    state: PhantomData<S>,
}

pub struct BuilderInit;
pub struct BuilderComplete;

impl sealed::Sealed for BuilderInit {}
impl sealed::Sealed for BuilderComplete {}

const GLSL_ENTRY_POINT: &str = "main";

impl Default for ShaderBuilder<'_, BuilderInit> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ShaderBuilder<'a, BuilderInit> {
    pub fn new() -> Self {
        Self {
            label: None,
            source: None,
            state: PhantomData,
        }
    }

    pub fn with_glsl(
        self,
        source: impl Into<Cow<'a, str>>,
        stage: wgpu::naga::ShaderStage,
    ) -> ShaderBuilder<'a, BuilderComplete> {
        ShaderBuilder {
            label: self.label,
            source: Some((source.into(), stage)),
            state: PhantomData,
        }
    }
}

impl ShaderBuilder<'_, BuilderComplete> {
    /// Use a Renderer to compile the stage
    /// Errors carry the compiler's diagnostic text
    pub fn build(self, renderer: &Renderer) -> Result<Shader, wgpu::Error> {
        let Self {
            label,
            source,
            state: _,
        } = self;
        let (source, stage) = unsafe { source.unwrap_unchecked() };

        let module = renderer.checked(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label,
                source: wgpu::ShaderSource::Glsl {
                    shader: source,
                    stage,
                    defines: Default::default(),
                },
            })
        })?;

        Ok(Shader {
            module,
            stage,
            entry_point: GLSL_ENTRY_POINT,
        })
    }
}

impl<'a, S: BuilderState> ShaderBuilder<'a, S> {
    pub fn with_label(mut self, label: Option<&'a str>) -> Self {
        self.label = label;
        self
    }
}

impl Default for BindGroupLayoutBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> BindGroupLayoutBuilder<'a> {
    pub fn new() -> Self {
        Self {
            label: None,
            entries: vec![],
        }
    }

    pub fn with_label(mut self, label: Option<&'a str>) -> Self {
        self.label = label;
        self
    }

    /// Appends a BindGroupLayoutEntry to the BindGroupLayout
    pub fn with_entry(mut self, entry: wgpu::BindGroupLayoutEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn build(self, renderer: &Renderer) -> wgpu::BindGroupLayout {
        renderer
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: self.label,
                entries: self.entries.as_slice(),
            })
    }
}

impl Default for RenderPipelineBuilder<'_, BuilderInit> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RenderPipelineBuilder<'a, BuilderInit> {
    pub fn new() -> Self {
        Self {
            vertex_shader: None,
            fragment_shader: None,
            pipeline_layout_label: None,
            pipeline_label: None,
            bind_group_layouts: vec![],
            buffers: vec![],
            targets: vec![],
            primitive: wgpu::PrimitiveState::default(),
            state: PhantomData,
        }
    }

    /// Adds the vertex stage to the pipeline
    pub fn with_vertex_shader(
        self,
        shader: &'a Shader,
    ) -> RenderPipelineBuilder<'a, BuilderComplete> {
        let Self {
            vertex_shader: _,
            fragment_shader,
            pipeline_layout_label,
            pipeline_label,
            bind_group_layouts,
            buffers,
            targets,
            primitive,
            state: _,
        } = self;

        RenderPipelineBuilder {
            vertex_shader: Some(shader),
            fragment_shader,
            pipeline_layout_label,
            pipeline_label,
            bind_group_layouts,
            buffers,
            targets,
            primitive,
            state: PhantomData,
        }
    }
}

impl RenderPipelineBuilder<'_, BuilderComplete> {
    /// Use a Renderer to link the completed pipeline.
    /// If a fragment stage is set and no color targets are given,
    /// the surface format is used as the only target
    pub fn build(self, renderer: &Renderer) -> Result<RenderPipeline, wgpu::Error> {
        let Self {
            vertex_shader,
            fragment_shader,
            pipeline_layout_label,
            pipeline_label,
            bind_group_layouts,
            buffers,
            mut targets,
            primitive,
            state: _,
        } = self;

        let vertex_shader = unsafe { vertex_shader.unwrap_unchecked() };

        if fragment_shader.is_some() && targets.is_empty() {
            targets.push(Some(wgpu::ColorTargetState {
                format: renderer.format(),
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            }));
        }

        let vertex_state = wgpu::VertexState {
            module: &vertex_shader.module,
            entry_point: Some(vertex_shader.entry_point),
            buffers: buffers.as_slice(),
            compilation_options: Default::default(),
        };

        let fragment_state = fragment_shader.map(|shader| wgpu::FragmentState {
            module: &shader.module,
            entry_point: Some(shader.entry_point),
            targets: targets.as_slice(),
            compilation_options: Default::default(),
        });

        renderer.checked(|device| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: pipeline_layout_label,
                bind_group_layouts: bind_group_layouts.as_slice(),
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: pipeline_label,
                layout: Some(&layout),
                vertex: vertex_state,
                fragment: fragment_state,
                primitive,
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            RenderPipeline { layout, pipeline }
        })
    }
}

impl<'a, S: BuilderState> RenderPipelineBuilder<'a, S> {
    /// Sets the fragment stage. Will override any current fragment stage set.
    pub fn with_fragment_shader(mut self, shader: &'a Shader) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    pub fn with_layout_label(mut self, label: Option<&'a str>) -> Self {
        self.pipeline_layout_label = label;
        self
    }

    pub fn with_pipeline_label(mut self, label: Option<&'a str>) -> Self {
        self.pipeline_label = label;
        self
    }

    /// Append a BindGroupLayout to the pipeline
    pub fn with_bind_group_layout(mut self, layout: &'a wgpu::BindGroupLayout) -> Self {
        self.bind_group_layouts.push(layout);
        self
    }

    /// Append a vertex buffer layout to the vertex stage
    pub fn with_buffer(mut self, buffer: wgpu::VertexBufferLayout<'a>) -> Self {
        self.buffers.push(buffer);
        self
    }
}
