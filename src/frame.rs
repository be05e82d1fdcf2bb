use crate::{
    animation::{Color, ColorPolicy},
    geometry::{GeometryError, GeometryStore, GpuGeometry, TriangleRegion},
    render::{BindGroupLayoutBuilder, RenderPipeline, RenderPipelineBuilder, Renderer, ShaderBuilder},
    uniform::{Slots, Uniform, UniformBuilder},
    vertex::Vertex,
};
use std::{borrow::Cow, fmt, num::NonZeroU64};
use thiserror::Error;
use web_time::Instant;

pub const VERTEX_SHADER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/res/shaders/triangle.vert"
));
pub const FRAGMENT_SHADER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/res/shaders/triangle.frag"
));

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> wgpu::naga::ShaderStage {
        match self {
            ShaderStage::Vertex => wgpu::naga::ShaderStage::Vertex,
            ShaderStage::Fragment => wgpu::naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// GLSL source of both stages
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER),
            fragment: Cow::Borrowed(FRAGMENT_SHADER),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("failed to compile {stage} shader: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("failed to link shader program: {log}")]
    ProgramLink { log: String },
    #[error("cannot size the color uniform: {0}")]
    Geometry(#[from] GeometryError),
}

/// The linked vertex + fragment pipeline and its `ourColor` uniform
pub struct ShaderProgram {
    pipeline: RenderPipeline,
    color: Uniform<Color>,
}

impl ShaderProgram {
    /// Compile and link both stages
    /// `slots` is the number of color updates a single frame can hold
    pub fn init(
        renderer: &Renderer,
        sources: &ShaderSources,
        slots: u32,
    ) -> Result<Self, ProgramError> {
        log::debug!("tricolor::frame::ShaderProgram::init: Compiling shaders");

        let vertex = compile(renderer, ShaderStage::Vertex, &sources.vertex)?;
        let fragment = compile(renderer, ShaderStage::Fragment, &sources.fragment)?;

        let color_layout = BindGroupLayoutBuilder::new()
            .with_label(Some("tricolor::frame::ShaderProgram::color"))
            .with_entry(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<Color>() as u64),
                },
                count: None,
            })
            .build(renderer);

        let color: Uniform<Color> = UniformBuilder::new()
            .with_label(Some("tricolor::frame::ShaderProgram::color"))
            .with_bind_group_layout(color_layout)
            .with_slots(slots)
            .build(renderer);

        log::debug!("tricolor::frame::ShaderProgram::init: Linking program");
        let pipeline = RenderPipelineBuilder::new()
            .with_layout_label(Some("tricolor::frame::ShaderProgram"))
            .with_pipeline_label(Some("tricolor::frame::ShaderProgram"))
            .with_vertex_shader(&vertex)
            .with_fragment_shader(&fragment)
            .with_buffer(Vertex::layout())
            .with_bind_group_layout(color.bind_group_layout())
            .build(renderer)
            .map_err(|error| ProgramError::ProgramLink {
                log: error.to_string(),
            })?;

        log::info!("shader program linked");
        Ok(Self { pipeline, color })
    }
}

fn compile(
    renderer: &Renderer,
    stage: ShaderStage,
    source: &str,
) -> Result<crate::render::Shader, ProgramError> {
    let label = format!("tricolor::frame::{stage}");

    ShaderBuilder::new()
        .with_label(Some(label.as_str()))
        .with_glsl(source, stage.naga())
        .build(renderer)
        .map_err(|error| ProgramError::ShaderCompile {
            stage,
            log: error.to_string(),
        })
}

/// Receiver of the uniform updates and draw calls of one frame
pub trait DrawSink {
    fn set_color(&mut self, color: Color);
    fn draw(&mut self, region: &TriangleRegion);
}

/// Set the color of every region and draw it, in region order
pub fn render_frame<S: DrawSink>(
    sink: &mut S,
    policy: &ColorPolicy,
    regions: &[TriangleRegion],
    elapsed_seconds: f64,
) {
    for (index, region) in regions.iter().enumerate() {
        sink.set_color(policy.color(index, elapsed_seconds));
        sink.draw(region);
    }
}

/// Hands out the color slots of one frame, one per color update
/// A draw may only consume a color that was staged for it
pub struct ColorCursor<'a> {
    slots: &'a mut Slots<Color>,
    next: u32,
    pending: Option<wgpu::DynamicOffset>,
}

impl<'a> ColorCursor<'a> {
    /// Fails when `slots` cannot hold one color per region
    pub fn new(slots: &'a mut Slots<Color>, regions: usize) -> Result<Self, FrameError> {
        if regions > slots.count() as usize {
            return Err(FrameError::SlotsExhausted {
                regions,
                slots: slots.count(),
            });
        }

        Ok(Self {
            slots,
            next: 0,
            pending: None,
        })
    }

    /// Stage `color` into the next free slot and return its offset
    pub fn stage(&mut self, color: Color) -> Option<wgpu::DynamicOffset> {
        self.pending = self.slots.set(self.next, color);
        if self.pending.is_some() {
            self.next += 1;
        }
        self.pending
    }

    /// The offset staged for the upcoming draw; each staged color feeds one draw
    pub fn take_for_draw(&mut self) -> Option<wgpu::DynamicOffset> {
        self.pending.take()
    }
}

/// Records one frame into a wgpu render pass
/// Each color goes into the next uniform slot, which the following draw binds
pub struct FramePass<'a, 'pass> {
    render_pass: &'a mut wgpu::RenderPass<'pass>,
    colors: ColorCursor<'a>,
    bind_group: &'a wgpu::BindGroup,
    geometry: &'a GpuGeometry,
}

impl DrawSink for FramePass<'_, '_> {
    fn set_color(&mut self, color: Color) {
        match self.colors.stage(color) {
            Some(offset) => self.render_pass.set_bind_group(0, self.bind_group, &[offset]),
            None => log::warn!("tricolor::frame::FramePass::set_color: no color slot left"),
        }
    }

    fn draw(&mut self, region: &TriangleRegion) {
        if self.colors.take_for_draw().is_none() {
            log::warn!("tricolor::frame::FramePass::draw: skipping {region:?} without a color");
            return;
        }

        self.geometry.draw(self.render_pass, region);
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("{regions} regions do not fit in {slots} color slots")]
    SlotsExhausted { regions: usize, slots: u32 },
}

/// Draws every region of a GeometryStore with its animated color
pub struct FrameRenderer {
    program: ShaderProgram,
    policy: ColorPolicy,
}

impl FrameRenderer {
    pub fn new(program: ShaderProgram, policy: ColorPolicy) -> Self {
        Self { program, policy }
    }

    /// Compile the program with one color slot per region of `geometry`
    pub fn init(
        renderer: &Renderer,
        sources: &ShaderSources,
        geometry: &GeometryStore,
        policy: ColorPolicy,
    ) -> Result<Self, ProgramError> {
        let program = ShaderProgram::init(renderer, sources, color_slots(geometry)?)?;
        Ok(Self::new(program, policy))
    }

    /// Render and present one frame at `elapsed_seconds`
    pub fn render(
        &mut self,
        renderer: &Renderer,
        geometry: &GeometryStore,
        elapsed_seconds: f64,
    ) -> Result<(), FrameError> {
        let regions = geometry.regions()?;
        let gpu = geometry.gpu()?;
        let (slots, bind_group) = self.program.color.staging_mut();
        let colors = ColorCursor::new(slots, regions.len())?;

        let frame = renderer.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = renderer
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tricolor::frame::FrameRenderer encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tricolor::frame::FrameRenderer pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.program.pipeline.pipeline);

            let mut pass = FramePass {
                render_pass: &mut render_pass,
                colors,
                bind_group,
                geometry: gpu,
            };
            render_frame(&mut pass, &self.policy, regions, elapsed_seconds);
        }

        self.program.color.flush(renderer);
        renderer.queue.submit(Some(encoder.finish()));
        frame.present();

        Ok(())
    }
}

/// One color slot per region of an uploaded store
fn color_slots(geometry: &GeometryStore) -> Result<u32, ProgramError> {
    Ok(geometry.regions()?.len() as u32)
}

/// Seconds elapsed since the graphics context was created
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    start: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::start()
    }
}

impl FrameClock {
    pub fn start() -> Self {
        Self::since(Instant::now())
    }

    pub fn since(start: Instant) -> Self {
        Self { start }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LoopState {
    #[default]
    Running,
    Closing,
}

impl LoopState {
    /// Checked once at the top of every iteration
    /// Closing is terminal
    pub fn advance(self, close_requested: bool) -> Self {
        match self {
            LoopState::Running if close_requested => LoopState::Closing,
            state => state,
        }
    }

    pub fn should_render(self) -> bool {
        self == LoopState::Running
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::animation::{Channel, Wave};
    use crate::geometry::{GeometryDesc, GeometryLayout};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum Call {
        SetColor(Color),
        Draw(TriangleRegion),
    }

    #[derive(Default)]
    struct Recorder(Vec<Call>);

    impl DrawSink for Recorder {
        fn set_color(&mut self, color: Color) {
            self.0.push(Call::SetColor(color));
        }

        fn draw(&mut self, region: &TriangleRegion) {
            self.0.push(Call::Draw(region.clone()));
        }
    }

    fn four_triangles() -> Vec<TriangleRegion> {
        GeometryDesc::new(
            GeometryLayout::Independent,
            (0..4)
                .map(|i| {
                    let x = i as f32 * 0.25;
                    vec![
                        Vertex::new(x, 0.0, 0.0),
                        Vertex::new(x + 0.2, 0.0, 0.0),
                        Vertex::new(x + 0.1, 0.2, 0.0),
                    ]
                })
                .collect(),
            None,
        )
        .plan()
        .unwrap()
    }

    #[test]
    fn four_independent_triangles_at_zero() {
        let regions = four_triangles();
        let policy = ColorPolicy::default();
        let mut recorder = Recorder::default();

        render_frame(&mut recorder, &policy, &regions, 0.0);

        assert_eq!(8, recorder.0.len());
        for (index, pair) in recorder.0.chunks_exact(2).enumerate() {
            let Call::SetColor(color) = &pair[0] else {
                panic!("draw {index} was not preceded by a color update");
            };
            assert_eq!(Call::Draw(regions[index].clone()), pair[1]);

            let animation = policy.animation(index);
            let expected = match animation.wave {
                Wave::Sin | Wave::NegSin => 0.5,
                Wave::Cos => 1.0,
                Wave::NegCos => 0.0,
            };
            assert!((color.channel(animation.channel) - expected).abs() < 1e-6);
            assert_eq!(1.0, color.a);
        }
    }

    #[test]
    fn sin_regions_are_half_green_at_zero() {
        let regions = four_triangles();
        let mut recorder = Recorder::default();

        render_frame(&mut recorder, &ColorPolicy::default(), &regions, 0.0);

        for slot in [0, 4] {
            let Call::SetColor(color) = &recorder.0[slot] else {
                panic!("expected a color update at {slot}");
            };
            assert!((color.channel(Channel::Green) - 0.5).abs() < 1e-6);
            assert_eq!(0.0, color.r);
        }
    }

    #[test]
    fn every_draw_is_one_triangle() {
        let regions = four_triangles();
        let mut recorder = Recorder::default();

        render_frame(&mut recorder, &ColorPolicy::default(), &regions, 3.7);

        let draws: Vec<_> = recorder
            .0
            .iter()
            .filter_map(|call| match call {
                Call::Draw(region) => Some(region.count()),
                Call::SetColor(_) => None,
            })
            .collect();
        assert_eq!(vec![3; 4], draws);
    }

    #[test]
    fn empty_regions_issue_nothing() {
        let mut recorder = Recorder::default();
        render_frame(&mut recorder, &ColorPolicy::default(), &[], 1.0);
        assert!(recorder.0.is_empty());
    }

    struct Staged<'a> {
        colors: ColorCursor<'a>,
        draws: Vec<(wgpu::DynamicOffset, TriangleRegion)>,
    }

    impl DrawSink for Staged<'_> {
        fn set_color(&mut self, color: Color) {
            self.colors.stage(color);
        }

        fn draw(&mut self, region: &TriangleRegion) {
            if let Some(offset) = self.colors.take_for_draw() {
                self.draws.push((offset, region.clone()));
            }
        }
    }

    #[test]
    fn every_draw_reads_its_own_slot() {
        let regions = four_triangles();
        let policy = ColorPolicy::default();
        let mut slots = Slots::<Color>::new(regions.len() as u32, 256);

        let mut staged = Staged {
            colors: ColorCursor::new(&mut slots, regions.len()).unwrap(),
            draws: vec![],
        };
        render_frame(&mut staged, &policy, &regions, 1.3);
        let draws = staged.draws;

        let offsets: Vec<_> = draws.iter().map(|(offset, _)| *offset).collect();
        assert_eq!(vec![0, 256, 512, 768], offsets);

        let bytes = slots.as_bytes();
        for (index, (offset, region)) in draws.iter().enumerate() {
            let start = *offset as usize;
            let color: Color = bytemuck::pod_read_unaligned(&bytes[start..start + 16]);
            assert_eq!(policy.color(index, 1.3), color);
            assert_eq!(&regions[index], region);
        }
    }

    #[test]
    fn too_many_regions_are_rejected_up_front() {
        let mut slots = Slots::<Color>::new(2, 256);

        assert!(matches!(
            ColorCursor::new(&mut slots, 3),
            Err(FrameError::SlotsExhausted {
                regions: 3,
                slots: 2
            })
        ));
    }

    #[test]
    fn draw_without_a_staged_color_is_skipped() {
        let regions = four_triangles();
        let mut slots = Slots::<Color>::new(1, 256);
        let mut staged = Staged {
            colors: ColorCursor::new(&mut slots, 1).unwrap(),
            draws: vec![],
        };

        staged.draw(&regions[0]);
        staged.set_color(Color::BLACK);
        staged.draw(&regions[0]);
        staged.draw(&regions[1]);
        staged.set_color(Color::BLACK);
        staged.draw(&regions[1]);

        assert_eq!(vec![(0, regions[0].clone())], staged.draws);
    }

    #[test]
    fn program_needs_uploaded_geometry() {
        let store = GeometryStore::new(GeometryDesc::new(
            GeometryLayout::Independent,
            vec![vec![
                Vertex::new(0.0, 0.0, 0.0),
                Vertex::new(1.0, 0.0, 0.0),
                Vertex::new(0.0, 1.0, 0.0),
            ]],
            None,
        ));

        assert_eq!(
            Err(ProgramError::Geometry(GeometryError::NotInitialized)),
            color_slots(&store)
        );
    }

    #[test]
    fn clock_counts_from_its_start() {
        let clock = FrameClock::since(Instant::now() - Duration::from_secs(2));
        assert!(clock.elapsed_seconds() >= 2.0);
    }

    #[test]
    fn loop_closes_once_requested() {
        let state = LoopState::default();
        assert!(state.should_render());

        let state = state.advance(false);
        assert_eq!(LoopState::Running, state);

        let state = state.advance(true);
        assert_eq!(LoopState::Closing, state);
        assert!(!state.should_render());

        assert_eq!(LoopState::Closing, state.advance(false));
    }

    #[test]
    fn default_shaders_declare_color_uniform() {
        let sources = ShaderSources::default();
        assert!(sources.vertex.contains("gl_Position = vec4(aPos, 1.0)"));
        assert!(sources.fragment.contains("ourColor"));
    }

    #[test]
    fn program_error_mentions_stage() {
        let error = ProgramError::ShaderCompile {
            stage: ShaderStage::Fragment,
            log: "syntax error".to_owned(),
        };
        assert_eq!(
            "failed to compile fragment shader: syntax error",
            error.to_string()
        );
    }
}
