//! Layers wrap a backend, implement the same [`FsBackend`] interface and intercept some of
//! its operations. Each layer owns its inner backend exclusively and never hands it out.
//!
//! Layers can be stacked statically (`Unique::new(AtomicWrite::new(MapFS::new()))`) or
//! through [`compose`], which takes the layers outermost first.

mod atomic_write;
mod base_dir;
mod changed_only;
mod dir_create;
mod stdout_print;
mod unique;

use crate::DirFS;
use crate::core::FsBackend;

pub use atomic_write::AtomicWrite;
pub use base_dir::BaseDir;
pub use changed_only::ChangedOnly;
pub use dir_create::DirCreate;
pub use stdout_print::StdoutPrint;
pub use unique::Unique;

type Wrap = dyn FnOnce(Box<dyn FsBackend>) -> Box<dyn FsBackend> + Send;

/// One step of a layer stack: a function turning a backend into a wrapped backend.
pub struct Layer(Box<Wrap>);

impl Layer {
    /// Wraps with an arbitrary function, e.g. a layer defined outside this crate.
    pub fn custom<W>(wrap: W) -> Layer
    where
        W: FnOnce(Box<dyn FsBackend>) -> Box<dyn FsBackend> + Send + 'static,
    {
        Layer(Box::new(wrap))
    }

    /// See [`AtomicWrite`].
    pub fn atomic_write() -> Layer {
        Layer::custom(|fs| Box::new(AtomicWrite::new(fs)))
    }

    /// See [`AtomicWrite::with_temp_dir`]. `dir` must be on the same mounted file system
    /// as the files written through the stack, otherwise the final rename is not atomic.
    pub fn atomic_write_in<S: Into<String>>(dir: S) -> Layer {
        let dir = dir.into();
        Layer::custom(move |fs| Box::new(AtomicWrite::with_temp_dir(fs, dir)))
    }

    /// See [`BaseDir`].
    pub fn base_dir<S: Into<String>>(dir: S) -> Layer {
        let dir = dir.into();
        Layer::custom(move |fs| Box::new(BaseDir::new(fs, dir)))
    }

    /// See [`ChangedOnly`].
    pub fn changed_only() -> Layer {
        Layer::custom(|fs| Box::new(ChangedOnly::new(fs)))
    }

    /// See [`DirCreate`]; `dir_mode` is used for every directory it creates.
    pub fn dir_create(dir_mode: u32) -> Layer {
        Layer::custom(move |fs| Box::new(DirCreate::new(fs, dir_mode)))
    }

    /// See [`Unique`].
    pub fn unique() -> Layer {
        Layer::custom(|fs| Box::new(Unique::new(fs)))
    }

    /// See [`StdoutPrint`].
    pub fn stdout_print() -> Layer {
        Layer::custom(|fs| Box::new(StdoutPrint::new(fs)))
    }

    fn wrap(self, fs: Box<dyn FsBackend>) -> Box<dyn FsBackend> {
        (self.0)(fs)
    }
}

/// Stacks `layers` around `base`.
///
/// Order matters: the first layer becomes the outermost wrapper (it sees every call
/// first), the last one sits right above `base`.
pub fn compose<B, I>(base: B, layers: I) -> Box<dyn FsBackend>
where
    B: FsBackend + 'static,
    I: IntoIterator<Item = Layer>,
{
    let layers: Vec<Layer> = layers.into_iter().collect();
    let base: Box<dyn FsBackend> = Box::new(base);
    layers
        .into_iter()
        .rev()
        .fold(base, |fs, layer| layer.wrap(fs))
}

/// Stacks `extra` layers followed by the recommended ones: [`DirCreate`] (`0o777`),
/// [`AtomicWrite`] and [`Unique`], suited for idempotent artifact generation.
pub fn recommended<B, I>(base: B, extra: I) -> Box<dyn FsBackend>
where
    B: FsBackend + 'static,
    I: IntoIterator<Item = Layer>,
{
    let layers = extra.into_iter().chain([
        Layer::dir_create(0o777),
        Layer::atomic_write(),
        Layer::unique(),
    ]);
    compose(base, layers)
}

/// [`recommended`] on top of the host file system.
pub fn recommended_real<I>(extra: I) -> Box<dyn FsBackend>
where
    I: IntoIterator<Item = Layer>,
{
    recommended(DirFS::new(), extra)
}
