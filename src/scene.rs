use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::{ChannelAnimation, ColorPolicy};
use crate::geometry::{GeometryDesc, GeometryError, GeometryLayout};
use crate::vertex::Vertex;

const INDEPENDENT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/res/scenes/independent.toml"
));
const SHARED_SEQUENTIAL: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/res/scenes/shared-sequential.toml"
));
const SHARED_INDEXED_FAN: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/res/scenes/shared-indexed-fan.toml"
));

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid scene geometry: {0}")]
    Geometry(#[from] GeometryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,
    #[serde(default = "WindowConfig::default_width")]
    pub width: u32,
    #[serde(default = "WindowConfig::default_height")]
    pub height: u32,
}

impl WindowConfig {
    fn default_title() -> String {
        "tricolor".to_owned()
    }

    fn default_width() -> u32 {
        800
    }

    fn default_height() -> u32 {
        600
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            width: Self::default_width(),
            height: Self::default_height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    #[serde(default)]
    pub layout: GeometryLayout,
    pub vertices: Vec<Vec<Vertex>>,
    #[serde(default)]
    pub indices: Option<Vec<u16>>,
}

/// Scene file, in TOML
/// [window] sets the title and size of the window (all optional)
/// [geometry] gives the layout, the vertex lists and, for the indexed fan, the indices
/// Each optional [[animation]] names the channel and wave of one region,
/// replacing the default color table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub window: WindowConfig,
    pub geometry: GeometryConfig,
    #[serde(rename = "animation", default)]
    pub animations: Vec<ChannelAnimation>,
}

impl Scene {
    pub fn new(data: impl AsRef<str>) -> Result<Self, SceneError> {
        let scene: Self = toml::from_str(data.as_ref())?;
        scene.geometry_desc().validate()?;
        Ok(scene)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let data = read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::new(data)
    }

    /// One of the scenes shipped with the crate
    pub fn builtin(layout: GeometryLayout) -> Result<Self, SceneError> {
        Self::new(match layout {
            GeometryLayout::Independent => INDEPENDENT,
            GeometryLayout::SharedSequential => SHARED_SEQUENTIAL,
            GeometryLayout::SharedIndexedFan => SHARED_INDEXED_FAN,
        })
    }

    pub fn geometry_desc(&self) -> GeometryDesc {
        GeometryDesc::new(
            self.geometry.layout,
            self.geometry.vertices.clone(),
            self.geometry.indices.clone(),
        )
    }

    pub fn color_policy(&self) -> ColorPolicy {
        ColorPolicy::new(self.animations.clone())
    }
}
