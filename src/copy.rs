use std::io;

use anyhow::Context;

use crate::core::{File, FsBackend, FsError, OpenFlags, Result, utils};
use crate::vfs::EntryType;

/// Copies every directory and regular file of `src` into `dst`.
///
/// The walk starts at `.` and goes depth-first, children in name order. Directories
/// are created with `mkdir_all(path, 0o777)`; files are created exclusively with the
/// permission bits of the source file, so existing files in `dst` are never
/// overwritten and make the copy fail. Symlinks and other special entries abort the
/// copy with an invalid-input [`FsError::Path`].
///
/// Both sides only go through [`FsBackend`], so any backend or layer stack works:
///
/// ```
/// use vfs_layers::{FsBackend, MapFS, copy_tree};
///
/// let src = MapFS::new();
/// src.mkdir_all("docs", 0o755).unwrap();
/// src.write_file("docs/a.txt", b"a", 0o600).unwrap();
///
/// let dst = MapFS::new();
/// copy_tree(&dst, &src).unwrap();
/// assert_eq!(dst.list(), src.list());
/// ```
pub fn copy_tree<D, S>(dst: &D, src: &S) -> Result<()>
where
    D: FsBackend + ?Sized,
    S: FsBackend + ?Sized,
{
    copy_dir(dst, src, ".")
}

fn copy_dir<D, S>(dst: &D, src: &S, dir: &str) -> Result<()>
where
    D: FsBackend + ?Sized,
    S: FsBackend + ?Sized,
{
    dst.mkdir_all(dir, 0o777)?;

    for entry in src.read_dir(dir)? {
        let path = utils::join(dir, entry.name());
        match entry.entry_type() {
            EntryType::Directory => copy_dir(dst, src, &path)?,
            EntryType::File => copy_file(dst, src, &path)?,
            EntryType::Symlink | EntryType::Other => {
                return Err(FsError::Path {
                    op: "copy_tree",
                    path,
                    source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn copy_file<D, S>(dst: &D, src: &S, path: &str) -> Result<()>
where
    D: FsBackend + ?Sized,
    S: FsBackend + ?Sized,
{
    let mut reader = src.open(path)?;
    let copied = copy_contents(dst, path, &mut reader);
    close_after(reader, copied)
}

fn copy_contents<D>(dst: &D, path: &str, reader: &mut Box<dyn File>) -> Result<()>
where
    D: FsBackend + ?Sized,
{
    let mode = reader.metadata()?.mode();
    let flags = OpenFlags::CREATE | OpenFlags::EXCLUSIVE | OpenFlags::WRITE;
    let mut writer = dst.open_file(path, flags, mode)?;

    let copied = io::copy(reader, &mut writer)
        .map(|_| ())
        .map_err(|source| {
            FsError::Path {
                op: "copy",
                path: path.to_string(),
                source,
            }
            .into()
        });
    close_after(writer, copied)
}

/// Closes `file`, keeping `result` as the primary outcome.
fn close_after(file: Box<dyn File>, result: Result<()>) -> Result<()> {
    let closed = file.close().context("close error");
    match (result, closed) {
        (result, Ok(())) => result,
        (Ok(()), Err(close)) => Err(close),
        (Err(err), Err(close)) => Err(FsError::join(err, close)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{io_kind, is_not_found};
    use crate::test_support::{Fault, FaultyFiles, Recorder};
    use crate::{BaseDir, DirFS, MapFS};
    use tempdir::TempDir;

    fn setup_test_vfs() -> MapFS {
        let fs = MapFS::new();
        fs.mkdir_all("docs/guides", 0o755).unwrap();
        fs.mkdir_all("empty", 0o700).unwrap();
        fs.write_file("docs/guides/intro.md", b"# Intro", 0o644).unwrap();
        fs.write_file("docs/index.md", b"index", 0o600).unwrap();
        fs.write_file("run.sh", b"#!/bin/sh", 0o755).unwrap();
        fs
    }

    mod memory {
        use super::*;

        #[test]
        fn test_copy_reproduces_files_and_modes() -> Result<()> {
            let src = setup_test_vfs();
            let dst = MapFS::new();

            copy_tree(&dst, &src)?;

            assert_eq!(dst.list(), src.list());
            assert_eq!(dst.read_file("docs/guides/intro.md")?, b"# Intro");
            assert!(dst.read_dir("empty")?.is_empty());
            Ok(())
        }

        #[test]
        fn test_walk_order() -> Result<()> {
            let src = setup_test_vfs();
            let dst = Recorder::new();

            copy_tree(&dst, &src)?;

            assert_eq!(
                dst.calls(),
                vec![
                    "mkdir_all .",
                    "mkdir_all docs",
                    "mkdir_all docs/guides",
                    "open_file docs/guides/intro.md",
                    "open_file docs/index.md",
                    "mkdir_all empty",
                    "open_file run.sh",
                ]
            );
            Ok(())
        }

        #[test]
        fn test_existing_file_is_not_overwritten() -> Result<()> {
            let src = setup_test_vfs();
            let dst = MapFS::new();
            dst.write_file("run.sh", b"keep me", 0o644)?;

            let err = copy_tree(&dst, &src).unwrap_err();

            assert_eq!(io_kind(&err), Some(io::ErrorKind::AlreadyExists));
            assert_eq!(dst.read_file("run.sh")?, b"keep me");
            Ok(())
        }

        #[test]
        fn test_into_layered_destination() -> Result<()> {
            let src = setup_test_vfs();
            let store = MapFS::new();
            store.mkdir_all("backup", 0o755)?;

            copy_tree(&BaseDir::new(store.clone(), "backup"), &src)?;

            assert_eq!(
                store.names(),
                vec![
                    "backup/docs/guides/intro.md",
                    "backup/docs/index.md",
                    "backup/run.sh",
                ]
            );
            Ok(())
        }

        #[test]
        fn test_unreadable_source_fails() {
            let src = Recorder::new();
            src.store.write_file("a.txt", b"a", 0o644).unwrap();
            src.fail("open a.txt", io::ErrorKind::PermissionDenied);

            let dst = MapFS::new();
            let err = copy_tree(&dst, &src).unwrap_err();
            assert_eq!(io_kind(&err), Some(io::ErrorKind::PermissionDenied));
            assert!(is_not_found(&dst.read_file("a.txt").unwrap_err()));
        }
    }

    mod close {
        use super::*;

        #[test]
        fn test_destination_close_error_is_reported() -> Result<()> {
            let src = setup_test_vfs();
            let dst = FaultyFiles::new();
            dst.fail("docs/index.md", Fault::Close, io::ErrorKind::StorageFull);

            let err = copy_tree(&dst, &src).unwrap_err();

            assert!(format!("{err:#}").contains("close error"), "{err:#}");
            assert_eq!(io_kind(&err), Some(io::ErrorKind::StorageFull));
            assert!(!matches!(
                err.downcast_ref::<FsError>(),
                Some(FsError::Joined { .. })
            ));
            // The content went through before the handle failed to close.
            assert_eq!(dst.store.read_file("docs/index.md")?, b"index");
            assert!(is_not_found(&dst.store.read_file("run.sh").unwrap_err()));
            Ok(())
        }

        #[test]
        fn test_read_and_close_errors_are_joined() {
            let src = FaultyFiles::new();
            src.store.write_file("a.txt", b"a", 0o644).unwrap();
            src.fail("a.txt", Fault::Read, io::ErrorKind::InvalidData);
            src.fail("a.txt", Fault::Close, io::ErrorKind::BrokenPipe);

            let err = copy_tree(&MapFS::new(), &src).unwrap_err();

            match err.downcast_ref::<FsError>() {
                Some(FsError::Joined { first, second }) => {
                    assert_eq!(io_kind(first), Some(io::ErrorKind::InvalidData));
                    assert!(first.to_string().starts_with("copy a.txt"), "{first}");
                    assert_eq!(io_kind(second), Some(io::ErrorKind::BrokenPipe));
                    assert!(format!("{second:#}").contains("close error"), "{second:#}");
                }
                _ => panic!("expected joined error, got {err:#}"),
            }
            assert_eq!(io_kind(&err), Some(io::ErrorKind::InvalidData));
        }
    }

    mod host {
        use super::*;

        #[test]
        fn test_copy_from_disk() -> Result<()> {
            let temp_dir = TempDir::new("copy_tree")?;
            std::fs::create_dir(temp_dir.path().join("sub"))?;
            std::fs::write(temp_dir.path().join("sub/data.txt"), b"data")?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(
                    temp_dir.path().join("sub/data.txt"),
                    std::fs::Permissions::from_mode(0o640),
                )?;
            }

            let src = BaseDir::new(DirFS::new(), temp_dir.path().to_string_lossy());
            let dst = MapFS::new();
            copy_tree(&dst, &src)?;

            assert_eq!(dst.read_file("sub/data.txt")?, b"data");
            #[cfg(unix)]
            assert_eq!(dst.list()[0].1.mode(), 0o640);
            Ok(())
        }

        #[cfg(unix)]
        #[test]
        fn test_symlink_aborts_copy() -> Result<()> {
            let temp_dir = TempDir::new("copy_tree")?;
            std::fs::write(temp_dir.path().join("target.txt"), b"t")?;
            std::os::unix::fs::symlink("target.txt", temp_dir.path().join("link"))?;

            let src = BaseDir::new(DirFS::new(), temp_dir.path().to_string_lossy());
            let err = copy_tree(&MapFS::new(), &src).unwrap_err();

            assert_eq!(io_kind(&err), Some(io::ErrorKind::InvalidInput));
            match err.downcast_ref::<FsError>() {
                Some(FsError::Path { op, path, .. }) => {
                    assert_eq!(*op, "copy_tree");
                    assert_eq!(path, "link");
                }
                _ => panic!("expected path error, got {err}"),
            }
            Ok(())
        }
    }
}
