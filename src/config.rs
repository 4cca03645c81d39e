//! Declarative description of a layer stack.

use anyhow::Context;
use serde::Deserialize;

use crate::core::{FsBackend, Result};
use crate::layers::{Layer, compose};

/// Which layers to stack, e.g. read from a TOML file:
///
/// ```toml
/// base_dir = "generated"
/// create_dirs = 0o755
/// atomic_write = true
/// unique = true
/// ```
///
/// Layers are always stacked in the same order, outermost first: `stdout_print`,
/// `base_dir`, `changed_only`, `create_dirs`, `atomic_write`, `unique`.
///
/// `atomic_temp_dir` only matters together with `atomic_write = true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerConfig {
    pub base_dir: Option<String>,
    /// Mode for directories created on demand; `None` disables on-demand creation.
    pub create_dirs: Option<u32>,
    pub atomic_write: bool,
    pub atomic_temp_dir: Option<String>,
    pub changed_only: bool,
    pub unique: bool,
    pub stdout_print: bool,
}

impl LayerConfig {
    /// Same layers as [`crate::recommended`] without extras.
    pub fn recommended() -> Self {
        Self {
            create_dirs: Some(0o777),
            atomic_write: true,
            unique: true,
            ..Self::default()
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse layer config")
    }

    /// Builds the configured layers, outermost first.
    pub fn layers(&self) -> Vec<Layer> {
        let mut layers = Vec::new();
        if self.stdout_print {
            layers.push(Layer::stdout_print());
        }
        if let Some(dir) = &self.base_dir {
            layers.push(Layer::base_dir(dir.as_str()));
        }
        if self.changed_only {
            layers.push(Layer::changed_only());
        }
        if let Some(mode) = self.create_dirs {
            layers.push(Layer::dir_create(mode));
        }
        if self.atomic_write {
            layers.push(match &self.atomic_temp_dir {
                Some(dir) => Layer::atomic_write_in(dir.as_str()),
                None => Layer::atomic_write(),
            });
        }
        if self.unique {
            layers.push(Layer::unique());
        }
        layers
    }

    /// Stacks the configured layers around `base`.
    pub fn build<B: FsBackend + 'static>(&self, base: B) -> Box<dyn FsBackend> {
        compose(base, self.layers())
    }
}
