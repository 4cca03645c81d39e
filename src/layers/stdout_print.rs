use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::DirEntry;
use crate::core::{File, FsBackend, FsError, OpenFlags, Result};

/// Prints the content given to `write_file` instead of storing it, e.g. for dry runs.
///
/// Nothing reaches the inner backend on writes; `open_file` is refused with
/// [`FsError::NotSupported`] since a streamed write could not be diverted. Reads and
/// the other operations pass through.
pub struct StdoutPrint<F> {
    inner: F,
    out: Mutex<Box<dyn Write + Send>>,
}

impl<F: FsBackend> StdoutPrint<F> {
    /// Prints to standard output.
    pub fn new(inner: F) -> Self {
        Self::with_writer(inner, io::stdout())
    }

    /// Prints to `out`.
    pub fn with_writer<W: Write + Send + 'static>(inner: F, out: W) -> Self {
        Self {
            inner,
            out: Mutex::new(Box::new(out)),
        }
    }
}

impl<F: FsBackend> FsBackend for StdoutPrint<F> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.inner.open(name)
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        self.inner.read_dir(name)
    }

    fn open_file(&self, _name: &str, _flags: OpenFlags, _mode: u32) -> Result<Box<dyn File>> {
        Err(FsError::NotSupported.into())
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        self.inner.mkdir_all(path, mode)
    }

    fn write_file(&self, _name: &str, data: &[u8], _mode: u32) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(data)?;
        out.flush()?;
        Ok(())
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.inner.rename(src, dst)
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.inner.remove(name)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        self.inner.remove_all(path)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.inner.read_file(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::is_not_supported;
    use crate::test_support::Recorder;
    use std::sync::Arc;

    /// Collects printed bytes where the test can still see them.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_file_prints_raw_content() -> Result<()> {
        let recorder = Recorder::new();
        let out = Captured::default();
        let fs = StdoutPrint::with_writer(recorder.clone(), out.clone());

        fs.write_file("a.txt", b"first\n", 0o644)?;
        fs.write_file("b.txt", b"second", 0o644)?;

        assert_eq!(out.text(), "first\nsecond");
        assert!(recorder.calls().is_empty());
        assert!(recorder.store.names().is_empty());
        Ok(())
    }

    #[test]
    fn test_open_file_is_not_supported() {
        let recorder = Recorder::new();
        let fs = StdoutPrint::with_writer(recorder.clone(), Captured::default());

        for flags in [OpenFlags::READ, OpenFlags::CREATE | OpenFlags::WRITE] {
            let err = fs.open_file("a.txt", flags, 0o644).err().unwrap();
            assert!(is_not_supported(&err));
        }
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_reads_pass_through() -> Result<()> {
        let recorder = Recorder::new();
        recorder.store.write_file("a.txt", b"stored", 0o644)?;
        let fs = StdoutPrint::with_writer(recorder.clone(), Captured::default());

        assert_eq!(fs.read_file("a.txt")?, b"stored");
        fs.mkdir_all("dir", 0o755)?;
        assert_eq!(fs.read_dir(".")?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_write_error_is_reported() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let fs = StdoutPrint::with_writer(Recorder::new(), Broken);
        let err = fs.write_file("a.txt", b"data", 0o644).unwrap_err();
        assert_eq!(crate::io_kind(&err), Some(io::ErrorKind::BrokenPipe));
    }
}
