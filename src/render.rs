use crate::block_on;

mod builder;
pub use builder::{BindGroupLayoutBuilder, RenderPipelineBuilder, ShaderBuilder};

/// Device, queue and the window surface everything is drawn into
#[derive(Debug)]
pub struct Renderer {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

/// A single compiled shader stage
#[derive(Debug)]
pub struct Shader {
    pub module: wgpu::ShaderModule,
    pub stage: wgpu::naga::ShaderStage,
    pub entry_point: &'static str,
}

#[derive(Debug)]
pub struct RenderPipeline {
    pub layout: wgpu::PipelineLayout,
    pub pipeline: wgpu::RenderPipeline,
}

impl Renderer {
    /// Run `op` inside validation and out-of-memory error scopes
    /// Returns the first error the device reported while `op` ran
    pub fn checked<T>(&self, op: impl FnOnce(&wgpu::Device) -> T) -> Result<T, wgpu::Error> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = op(&self.device);

        let validation = block_on(self.device.pop_error_scope());
        let out_of_memory = block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn reconfigure(&self) {
        log::info!("tricolor::render::Renderer::reconfigure: Reconfiguring surface");
        self.surface.configure(&self.device, &self.config);
    }
}
