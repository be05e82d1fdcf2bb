use crate::{
    frame::ShaderSources,
    geometry::GeometryLayout,
    scene::{Scene, SceneError},
};
use clap::Parser;
use std::{
    borrow::Cow,
    fs::read_to_string,
    num::NonZeroU32,
    path::{Path, PathBuf},
};

#[derive(Parser, Clone, PartialEq, Eq, Debug)]
#[clap(version, about = "Animated colored triangles", long_about = None)]
pub struct Arguments {
    /// Scene file (TOML) to render instead of a built-in scene
    #[clap(long, short, conflicts_with = "layout")]
    pub scene: Option<PathBuf>,
    /// Built-in scene to render
    #[clap(long, short, value_enum, default_value_t = GeometryLayout::Independent)]
    pub layout: GeometryLayout,
    /// GLSL vertex stage replacing the built-in one
    #[clap(long)]
    pub vertex_shader: Option<PathBuf>,
    /// GLSL fragment stage replacing the built-in one
    #[clap(long)]
    pub fragment_shader: Option<PathBuf>,
    #[clap(long, short = 'W')]
    pub width: Option<NonZeroU32>,
    #[clap(long, short = 'H')]
    pub height: Option<NonZeroU32>,
}

impl Arguments {
    /// The scene to render, with any window size override applied
    pub fn scene(&self) -> Result<Scene, SceneError> {
        let mut scene = match self.scene {
            Some(ref path) => Scene::from_file(path)?,
            None => Scene::builtin(self.layout)?,
        };

        if let Some(width) = self.width {
            scene.window.width = width.get();
        }
        if let Some(height) = self.height {
            scene.window.height = height.get();
        }

        Ok(scene)
    }

    pub fn shader_sources(&self) -> Result<ShaderSources, SceneError> {
        let mut sources = ShaderSources::default();

        if let Some(ref path) = self.vertex_shader {
            sources.vertex = Cow::Owned(read_source(path)?);
        }
        if let Some(ref path) = self.fragment_shader {
            sources.fragment = Cow::Owned(read_source(path)?);
        }

        Ok(sources)
    }
}

fn read_source(path: &Path) -> Result<String, SceneError> {
    read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_owned(),
        source,
    })
}
