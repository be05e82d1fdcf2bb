use crate::{render::Renderer, GraphicsInitError};
use std::sync::Arc;
use winit::window::Window;

pub async fn init(window: Arc<Window>) -> Result<Renderer, GraphicsInitError> {
    log::debug!("tricolor::display::init: Initializing display");

    let mut size = window.inner_size();
    // wgpu minimum surface size is 4x4
    size.width = size.width.max(4);
    size.height = size.height.max(4);

    log::debug!("tricolor::display::init: Creating surface");
    let instance = wgpu::Instance::default();
    let surface = instance.create_surface(window)?;
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .ok_or(GraphicsInitError::NoAdapter)?;

    log::debug!("tricolor::display::init: Requesting rendering device");
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                ..Default::default()
            },
            None,
        )
        .await?;

    log::debug!("tricolor::display::init: Adding wgpu error handler");
    fn unhandled_error(error: wgpu::Error) {
        log::error!("tricolor::display: wgpu unhandled error: {error:?}");
    }
    device.on_uncaptured_error(Box::new(unhandled_error));

    let swapchain_capabilities = surface.get_capabilities(&adapter);
    // The uniform color is written to the framebuffer as is, so prefer a linear format
    let swapchain_format = swapchain_capabilities
        .formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .or_else(|| swapchain_capabilities.formats.first().copied())
        .ok_or(GraphicsInitError::NoSurfaceFormat)?;
    let alpha_mode = swapchain_capabilities
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: swapchain_format,
        width: size.width,
        height: size.height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };

    log::debug!("tricolor::display::init: configuring surface");
    surface.configure(&device, &config);

    log::info!("surface configured");

    Ok(Renderer {
        instance,
        adapter,
        device,
        queue,
        surface,
        config,
    })
}
