use crate::{
    cli::Arguments,
    frame::{FrameClock, FrameError, FrameRenderer, LoopState, ProgramError, ShaderSources},
    geometry::{GeometryError, GeometryStore},
    platform::{block_on, init_platform},
    render::Renderer,
    scene::{Scene, SceneError},
    GraphicsInitError,
};
use clap::Parser;
use std::sync::Arc;
use thiserror::Error;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    error::{EventLoopError, OsError},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

/// Everything that stops the program before the first frame
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load scene: {0}")]
    Scene(#[from] SceneError),
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] OsError),
    #[error("failed to initialize graphics: {0}")]
    Graphics(#[from] GraphicsInitError),
    #[error("failed to build geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Program(#[from] ProgramError),
}

impl StartupError {
    /// Window and graphics failures exit negative, everything else with 1
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::EventLoop(_) | StartupError::Window(_) | StartupError::Graphics(_) => {
                -1
            }
            StartupError::Scene(_) | StartupError::Geometry(_) | StartupError::Program(_) => 1,
        }
    }
}

struct AppWindow {
    window: Arc<Window>,
    renderer: Renderer,
    geometry: GeometryStore,
    frame_renderer: FrameRenderer,
    clock: FrameClock,
}

impl AppWindow {
    fn new(window: Window, scene: &Scene, sources: &ShaderSources) -> Result<Self, StartupError> {
        let window = Arc::new(window);
        let renderer = block_on(crate::display::init(window.clone()))?;
        let clock = FrameClock::start();

        let geometry = GeometryStore::build(&renderer, scene.geometry_desc())?;
        let frame_renderer =
            FrameRenderer::init(&renderer, sources, &geometry, scene.color_policy())?;

        Ok(Self {
            window,
            renderer,
            geometry,
            frame_renderer,
            clock,
        })
    }

    fn redraw(&mut self) {
        let elapsed = self.clock.elapsed_seconds();

        match self
            .frame_renderer
            .render(&self.renderer, &self.geometry, elapsed)
        {
            Ok(()) => {}
            Err(FrameError::Surface(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost)) => {
                log::warn!("tricolor::app::AppWindow::redraw: surface lost, skipping frame");
                self.renderer.reconfigure();
            }
            Err(e) => log::warn!("tricolor::app::AppWindow::redraw: {e}"),
        }
    }
}

pub struct App {
    scene: Scene,
    sources: ShaderSources,
    state: LoopState,
    window: Option<AppWindow>,
    failure: Option<StartupError>,
}

impl App {
    pub fn new(scene: Scene, sources: ShaderSources) -> Self {
        Self {
            scene,
            sources,
            state: LoopState::default(),
            window: None,
            failure: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Process exit code once the event loop has returned
    pub fn exit_code(&self) -> i32 {
        self.failure.as_ref().map_or(0, StartupError::exit_code)
    }

    fn window_attributes(&self) -> WindowAttributes {
        Window::default_attributes()
            .with_title(self.scene.window.title.as_str())
            .with_inner_size(PhysicalSize::new(
                self.scene.window.width,
                self.scene.window.height,
            ))
            .with_resizable(false)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: StartupError) {
        log::error!("tricolor::app::App: {error}");
        self.failure = Some(error);
        self.state = LoopState::Closing;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || !self.state.should_render() {
            return;
        }

        log::debug!("tricolor::app::App::resumed: Creating window");
        let window = match event_loop.create_window(self.window_attributes()) {
            Ok(window) => window,
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match AppWindow::new(window, &self.scene, &self.sources) {
            Ok(app_window) => {
                log::info!("tricolor::app::App::resumed: Entering frame loop");
                app_window.window.request_redraw();
                self.window = Some(app_window);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let close_requested = matches!(event, WindowEvent::CloseRequested);
        self.state = self.state.advance(close_requested);

        if !self.state.should_render() {
            log::info!("tricolor::app::App::window_event: Exit requested");
            event_loop.exit();
            return;
        }

        if let WindowEvent::RedrawRequested = event {
            if let Some(app_window) = self.window.as_mut() {
                app_window.redraw();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if !self.state.should_render() {
            return;
        }

        if let Some(app_window) = self.window.as_ref() {
            app_window.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.window.take().is_some() {
            log::info!("tricolor::app::App::exiting: Released geometry and shader program");
        }
    }
}

/// Parse the command line, open the window and run until it is closed
/// Returns the process exit code
pub fn run() -> i32 {
    init_platform();

    let args = Arguments::parse();
    match run_with(&args) {
        Ok(code) => code,
        Err(e) => {
            log::error!("tricolor::app::run: {e}");
            e.exit_code()
        }
    }
}

fn run_with(args: &Arguments) -> Result<i32, StartupError> {
    let scene = args.scene()?;
    let sources = args.shader_sources()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(scene, sources);
    event_loop.run_app(&mut app)?;

    Ok(app.exit_code())
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test_case(StartupError::Graphics(GraphicsInitError::NoAdapter), -1)]
    #[test_case(StartupError::Geometry(GeometryError::NoVertices), 1)]
    #[test_case(StartupError::Program(ProgramError::ProgramLink { log: String::new() }), 1)]
    #[test_case(StartupError::Program(ProgramError::Geometry(GeometryError::NotInitialized)), 1)]
    fn exit_codes(error: StartupError, expected: i32) {
        assert_eq!(expected, error.exit_code());
    }

    #[test]
    fn fresh_app_exits_cleanly() {
        let scene = Scene::builtin(Default::default()).unwrap();
        let app = App::new(scene, ShaderSources::default());

        assert_eq!(LoopState::Running, app.state());
        assert_eq!(0, app.exit_code());
    }
}
