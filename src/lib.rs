//! Composable virtual file systems for Rust.
//!
//! ### Overview
//!
//! `vfs-layers` defines a minimal capability interface, [`FsBackend`], and two backends for it:
//! [`DirFS`] (the host file system) and [`MapFS`] (an in-memory store with the same external
//! behavior). On top of any backend, independent layers can be stacked to add guarantees:
//!
//! - [`AtomicWrite`]: `write_file` goes through a temporary file and a rename.
//! - [`BaseDir`]: every path is resolved inside a base directory; escapes are rejected.
//! - [`ChangedOnly`]: `write_file` with unchanged content does not touch the store.
//! - [`DirCreate`]: parent directories are created on demand, and remembered.
//! - [`Unique`]: a path may be written only once per stack.
//! - [`StdoutPrint`]: `write_file` prints instead of persisting (dry runs).
//!
//! **Key ideas**:
//! - **Composition order matters**: in [`compose`], the first layer is the outermost one.
//! - **Testability**: swap `DirFS` for `MapFS` and keep every layer.
//! - **Error kinds**: inspect failures with [`is_not_found`], [`is_non_unique`],
//!   [`is_not_supported`] and [`io_kind`].
//!
//! ```
//! use vfs_layers::{FsBackend, Layer, MapFS, compose};
//!
//! let store = MapFS::new();
//! let fs = compose(
//!     store.clone(),
//!     [Layer::dir_create(0o755), Layer::atomic_write(), Layer::unique()],
//! );
//!
//! fs.write_file("out/report.txt", b"done", 0o644).unwrap();
//! assert!(vfs_layers::is_non_unique(
//!     &fs.write_file("out/report.txt", b"again", 0o644).unwrap_err()
//! ));
//! assert_eq!(store.names(), vec!["out/report.txt"]);
//! ```

mod config;
mod copy;
mod core;
mod layers;
mod vfs;

#[cfg(test)]
mod test_support;

pub use config::LayerConfig;
pub use copy::copy_tree;
pub use crate::core::{
    File, FsBackend, FsError, OpenFlags, Result, io_kind, is_non_unique, is_not_found,
    is_not_supported,
};
pub use layers::{
    AtomicWrite, BaseDir, ChangedOnly, DirCreate, Layer, StdoutPrint, Unique, compose,
    recommended, recommended_real,
};
pub use vfs::{DirEntry, DirFS, EntryType, MapFS, Metadata};
