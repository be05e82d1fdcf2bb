use crate::{
    render::Renderer,
    vertex::{IndexBuffer, Vertex, VertexBuffer, VertexBufferBuilder},
};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;
use wgpu::RenderPass;

/// Vertices (or indices) consumed by one triangle
pub const TRIANGLE_COUNT: u32 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GeometryLayout {
    /// One buffer of exactly 3 vertices per triangle
    #[default]
    Independent,
    /// One buffer, consecutive vertex triples are triangles
    SharedSequential,
    /// One buffer plus an index list, all triangles share a hub vertex
    SharedIndexedFan,
}

/// Draw parameters of one triangle
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TriangleRegion {
    Sequential { vertices: Range<u32> },
    Dedicated { buffer: usize, vertices: Range<u32> },
    Indexed { indices: Range<u32> },
}

impl TriangleRegion {
    pub fn count(&self) -> u32 {
        let range = match self {
            TriangleRegion::Sequential { vertices } => vertices,
            TriangleRegion::Dedicated { vertices, .. } => vertices,
            TriangleRegion::Indexed { indices } => indices,
        };

        range.end - range.start
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("geometry has not been uploaded yet")]
    NotInitialized,
    #[error("geometry has no vertices")]
    NoVertices,
    #[error("vertex list {list} holds {len} vertices, independent triangles need exactly 3")]
    WrongTriangleSize { list: usize, len: usize },
    #[error("shared vertex list holds {0} vertices, which is not a nonzero multiple of 3")]
    MisalignedVertices(usize),
    #[error("{0:?} layout takes a single vertex list, got {1}")]
    MultipleLists(GeometryLayout, usize),
    #[error("{0:?} layout does not take an index list")]
    UnexpectedIndices(GeometryLayout),
    #[error("indexed fan layout needs an index list")]
    MissingIndices,
    #[error("index list holds {0} indices, which is not a nonzero multiple of 3")]
    MisalignedIndices(usize),
    #[error("index {index} at position {position} is out of bounds for {vertices} vertices")]
    IndexOutOfBounds {
        position: usize,
        index: u16,
        vertices: usize,
    },
    #[error("no vertex is shared by every triangle of the fan")]
    NoHub,
    #[error("driver rejected geometry upload: {0}")]
    Upload(String),
}

/// CPU-side description of the triangles, checked before anything reaches the GPU
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryDesc {
    layout: GeometryLayout,
    vertex_lists: Vec<Vec<Vertex>>,
    indices: Option<Vec<u16>>,
}

impl GeometryDesc {
    pub fn new(
        layout: GeometryLayout,
        vertex_lists: Vec<Vec<Vertex>>,
        indices: Option<Vec<u16>>,
    ) -> Self {
        Self {
            layout,
            vertex_lists,
            indices,
        }
    }

    pub fn layout(&self) -> GeometryLayout {
        self.layout
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        self.plan().map(|_| ())
    }

    /// Validate the description and compute its regions in draw order
    pub fn plan(&self) -> Result<Vec<TriangleRegion>, GeometryError> {
        use GeometryError as GE;

        if self.vertex_lists.iter().all(Vec::is_empty) {
            return Err(GE::NoVertices);
        }

        match self.layout {
            GeometryLayout::Independent => {
                if self.indices.is_some() {
                    return Err(GE::UnexpectedIndices(self.layout));
                }

                self.vertex_lists
                    .iter()
                    .enumerate()
                    .map(|(list, vertices)| {
                        if vertices.len() == TRIANGLE_COUNT as usize {
                            Ok(TriangleRegion::Dedicated {
                                buffer: list,
                                vertices: 0..TRIANGLE_COUNT,
                            })
                        } else {
                            Err(GE::WrongTriangleSize {
                                list,
                                len: vertices.len(),
                            })
                        }
                    })
                    .collect()
            }
            GeometryLayout::SharedSequential => {
                if self.indices.is_some() {
                    return Err(GE::UnexpectedIndices(self.layout));
                }
                let vertices = self.single_list()?;
                let triangles = triangle_count(vertices.len())
                    .ok_or(GE::MisalignedVertices(vertices.len()))?;

                Ok((0..triangles)
                    .map(|triangle| TriangleRegion::Sequential {
                        vertices: triangle_range(triangle),
                    })
                    .collect())
            }
            GeometryLayout::SharedIndexedFan => {
                let vertices = self.single_list()?;
                let indices = self.indices.as_deref().ok_or(GE::MissingIndices)?;
                let triangles =
                    triangle_count(indices.len()).ok_or(GE::MisalignedIndices(indices.len()))?;

                if let Some((position, &index)) = indices
                    .iter()
                    .enumerate()
                    .find(|(_, index)| **index as usize >= vertices.len())
                {
                    return Err(GE::IndexOutOfBounds {
                        position,
                        index,
                        vertices: vertices.len(),
                    });
                }

                if fan_hub(indices).is_none() {
                    return Err(GE::NoHub);
                }

                Ok((0..triangles)
                    .map(|triangle| TriangleRegion::Indexed {
                        indices: triangle_range(triangle),
                    })
                    .collect())
            }
        }
    }

    fn single_list(&self) -> Result<&[Vertex], GeometryError> {
        match self.vertex_lists.as_slice() {
            [vertices] => Ok(vertices.as_slice()),
            lists => Err(GeometryError::MultipleLists(self.layout, lists.len())),
        }
    }
}

fn triangle_count(len: usize) -> Option<u32> {
    let count = TRIANGLE_COUNT as usize;
    (len > 0 && len % count == 0).then(|| (len / count) as u32)
}

fn triangle_range(triangle: u32) -> Range<u32> {
    let start = triangle * TRIANGLE_COUNT;
    start..start + TRIANGLE_COUNT
}

/// The vertex referenced by every triangle of an index list
pub fn fan_hub(indices: &[u16]) -> Option<u16> {
    let mut triangles = indices.chunks_exact(TRIANGLE_COUNT as usize);
    let first = triangles.next()?;

    first
        .iter()
        .copied()
        .find(|hub| triangles.clone().all(|triangle| triangle.contains(hub)))
}

/// Buffers living on the GPU for one of the layouts
pub enum GpuGeometry {
    Dedicated(Vec<VertexBuffer<Vertex>>),
    Shared(VertexBuffer<Vertex>),
    Indexed(VertexBuffer<Vertex>, IndexBuffer<u16>),
}

impl GpuGeometry {
    /// Bind the buffers `region` reads from and issue its draw call
    pub fn draw(&self, render_pass: &mut RenderPass<'_>, region: &TriangleRegion) {
        match (self, region) {
            (GpuGeometry::Dedicated(buffers), TriangleRegion::Dedicated { buffer, vertices }) => {
                let Some(buffer) = buffers.get(*buffer) else {
                    log::error!(
                        "tricolor::geometry::GpuGeometry::draw: no vertex buffer {buffer} for region"
                    );
                    return;
                };
                buffer.bind(render_pass, 0);
                render_pass.draw(vertices.clone(), 0..1);
            }
            (GpuGeometry::Shared(buffer), TriangleRegion::Sequential { vertices }) => {
                buffer.bind(render_pass, 0);
                render_pass.draw(vertices.clone(), 0..1);
            }
            (GpuGeometry::Indexed(buffer, index_buffer), TriangleRegion::Indexed { indices }) => {
                buffer.bind(render_pass, 0);
                index_buffer.bind(render_pass);
                render_pass.draw_indexed(indices.clone(), 0, 0..1);
            }
            (_, region) => {
                log::error!(
                    "tricolor::geometry::GpuGeometry::draw: region {region:?} does not match the uploaded layout"
                );
            }
        }
    }
}

/// Immutable triangle storage
/// Built once before the frame loop and dropped once after it
pub struct GeometryStore {
    desc: GeometryDesc,
    uploaded: Option<(GpuGeometry, Vec<TriangleRegion>)>,
}

impl GeometryStore {
    /// An empty store; nothing is drawable until `upload` succeeds
    pub fn new(desc: GeometryDesc) -> Self {
        Self {
            desc,
            uploaded: None,
        }
    }

    /// Describe and upload in one step
    pub fn build(renderer: &Renderer, desc: GeometryDesc) -> Result<Self, GeometryError> {
        let mut store = Self::new(desc);
        store.upload(renderer)?;
        Ok(store)
    }

    pub fn upload(&mut self, renderer: &Renderer) -> Result<(), GeometryError> {
        if self.uploaded.is_some() {
            log::warn!("tricolor::geometry::GeometryStore::upload: geometry is already uploaded");
            return Ok(());
        }

        let regions = self.desc.plan()?;

        log::debug!(
            "tricolor::geometry::GeometryStore::upload: Uploading {} triangles as {:?}",
            regions.len(),
            self.desc.layout
        );

        let GeometryDesc {
            layout,
            vertex_lists,
            indices,
        } = &self.desc;

        let gpu = renderer
            .checked(|_| match layout {
                GeometryLayout::Independent => GpuGeometry::Dedicated(
                    vertex_lists
                        .iter()
                        .map(|vertices| vertex_buffer(renderer, vertices))
                        .collect(),
                ),
                GeometryLayout::SharedSequential => {
                    GpuGeometry::Shared(vertex_buffer(renderer, &vertex_lists[0]))
                }
                GeometryLayout::SharedIndexedFan => GpuGeometry::Indexed(
                    vertex_buffer(renderer, &vertex_lists[0]),
                    IndexBuffer::new(
                        renderer,
                        indices.as_deref().unwrap_or_default(),
                        wgpu::IndexFormat::Uint16,
                        Some("tricolor::geometry::GeometryStore::indices"),
                    ),
                ),
            })
            .map_err(|error| {
                log::error!("tricolor::geometry::GeometryStore::upload: {error}");
                GeometryError::Upload(error.to_string())
            })?;

        self.uploaded = Some((gpu, regions));
        Ok(())
    }

    /// Regions in a fixed order, identical on every call
    pub fn regions(&self) -> Result<&[TriangleRegion], GeometryError> {
        self.uploaded
            .as_ref()
            .map(|(_, regions)| regions.as_slice())
            .ok_or(GeometryError::NotInitialized)
    }

    pub fn gpu(&self) -> Result<&GpuGeometry, GeometryError> {
        self.uploaded
            .as_ref()
            .map(|(gpu, _)| gpu)
            .ok_or(GeometryError::NotInitialized)
    }
}

fn vertex_buffer(renderer: &Renderer, vertices: &[Vertex]) -> VertexBuffer<Vertex> {
    VertexBufferBuilder::new()
        .with_label(Some("tricolor::geometry::GeometryStore::vertices"))
        .with_vertices(vertices)
        .build(renderer)
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    fn triangle(offset: f32) -> Vec<Vertex> {
        vec![
            Vertex::new(offset, 1.0, 0.0),
            Vertex::new(offset - 1.0, 1.0, 0.0),
            Vertex::new(0.0, 0.0, 0.0),
        ]
    }

    fn independent(count: usize) -> GeometryDesc {
        GeometryDesc::new(
            GeometryLayout::Independent,
            (0..count).map(|i| triangle(i as f32)).collect(),
            None,
        )
    }

    fn shared(count: usize) -> GeometryDesc {
        GeometryDesc::new(
            GeometryLayout::SharedSequential,
            vec![(0..count).flat_map(|i| triangle(i as f32)).collect()],
            None,
        )
    }

    fn fan() -> GeometryDesc {
        GeometryDesc::new(
            GeometryLayout::SharedIndexedFan,
            vec![vec![
                Vertex::new(0.0, 0.0, 0.0),
                Vertex::new(1.0, 1.0, 0.0),
                Vertex::new(-1.0, 1.0, 0.0),
                Vertex::new(-1.0, -1.0, 0.0),
                Vertex::new(1.0, -1.0, 0.0),
            ]],
            Some(vec![0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 1]),
        )
    }

    #[test_case(independent(2), 2)]
    #[test_case(independent(4), 4)]
    #[test_case(shared(2), 2)]
    #[test_case(shared(4), 4)]
    #[test_case(fan(), 4)]
    fn every_region_is_one_triangle(desc: GeometryDesc, expected: usize) {
        let regions = desc.plan().unwrap();

        assert_eq!(expected, regions.len());
        assert!(regions.iter().all(|region| region.count() == 3));
    }

    #[test]
    fn shared_regions_are_disjoint_and_ordered() {
        let regions = shared(3).plan().unwrap();

        assert_eq!(
            vec![
                TriangleRegion::Sequential { vertices: 0..3 },
                TriangleRegion::Sequential { vertices: 3..6 },
                TriangleRegion::Sequential { vertices: 6..9 },
            ],
            regions
        );
    }

    #[test]
    fn independent_regions_use_own_buffers() {
        let regions = independent(2).plan().unwrap();

        assert_eq!(
            vec![
                TriangleRegion::Dedicated {
                    buffer: 0,
                    vertices: 0..3
                },
                TriangleRegion::Dedicated {
                    buffer: 1,
                    vertices: 0..3
                },
            ],
            regions
        );
    }

    #[test]
    fn fan_regions_index_the_shared_list() {
        let regions = fan().plan().unwrap();

        assert_eq!(TriangleRegion::Indexed { indices: 9..12 }, regions[3]);
        assert_eq!(Some(0), fan_hub(&[0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 1]));
    }

    #[test]
    fn plan_is_stable() {
        let desc = fan();
        assert_eq!(desc.plan().unwrap(), desc.plan().unwrap());
    }

    #[test]
    fn regions_before_upload_fail() {
        let store = GeometryStore::new(independent(4));

        assert_eq!(Err(GeometryError::NotInitialized), store.regions());
        assert!(matches!(store.gpu(), Err(GeometryError::NotInitialized)));
    }

    #[test_case(
        GeometryDesc::new(GeometryLayout::Independent, vec![], None),
        GeometryError::NoVertices
    )]
    #[test_case(
        GeometryDesc::new(GeometryLayout::Independent, vec![triangle(0.0), vec![Vertex::default(); 4]], None),
        GeometryError::WrongTriangleSize { list: 1, len: 4 }
    )]
    #[test_case(
        GeometryDesc::new(GeometryLayout::Independent, vec![triangle(0.0)], Some(vec![0, 1, 2])),
        GeometryError::UnexpectedIndices(GeometryLayout::Independent)
    )]
    #[test_case(
        GeometryDesc::new(GeometryLayout::SharedSequential, vec![vec![Vertex::default(); 5]], None),
        GeometryError::MisalignedVertices(5)
    )]
    #[test_case(
        GeometryDesc::new(GeometryLayout::SharedSequential, vec![triangle(0.0), triangle(1.0)], None),
        GeometryError::MultipleLists(GeometryLayout::SharedSequential, 2)
    )]
    #[test_case(
        GeometryDesc::new(GeometryLayout::SharedIndexedFan, vec![triangle(0.0)], None),
        GeometryError::MissingIndices
    )]
    #[test_case(
        GeometryDesc::new(GeometryLayout::SharedIndexedFan, vec![triangle(0.0)], Some(vec![0, 1])),
        GeometryError::MisalignedIndices(2)
    )]
    #[test_case(
        GeometryDesc::new(GeometryLayout::SharedIndexedFan, vec![triangle(0.0)], Some(vec![0, 1, 3])),
        GeometryError::IndexOutOfBounds { position: 2, index: 3, vertices: 3 }
    )]
    #[test_case(
        GeometryDesc::new(GeometryLayout::SharedIndexedFan, vec![vec![Vertex::default(); 6]], Some(vec![0, 1, 2, 3, 4, 5])),
        GeometryError::NoHub
    )]
    fn invalid_descriptions(desc: GeometryDesc, expected: GeometryError) {
        assert_eq!(Err(expected), desc.validate());
    }
}
