//! Test backends: a call recorder for layer tests and a store handing out faulty files.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::{File, FsBackend, OpenFlags, Result};
use crate::{DirEntry, MapFS, Metadata};

/// Wraps a [`MapFS`], records every call as `"<op> <path>[ <path>]"` and fails the calls
/// registered with [`Recorder::fail`]. Clones share calls, failures and storage.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    pub(crate) store: MapFS,
    calls: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<Vec<(String, io::ErrorKind)>>>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded calls of operation `op`.
    pub(crate) fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(' ').next() == Some(op))
            .count()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Makes every future `call` fail with `kind`.
    pub(crate) fn fail(&self, call: &str, kind: io::ErrorKind) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((call.to_string(), kind));
    }

    fn record(&self, call: String) -> Result<()> {
        let failure = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(failing, _)| *failing == call)
            .map(|(_, kind)| *kind);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.clone());
        match failure {
            Some(kind) => Err(anyhow::Error::from(io::Error::from(kind)).context(call)),
            None => Ok(()),
        }
    }
}

impl FsBackend for Recorder {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.record(format!("open {name}"))?;
        self.store.open(name)
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        self.record(format!("read_dir {name}"))?;
        self.store.read_dir(name)
    }

    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        self.record(format!("open_file {name}"))?;
        self.store.open_file(name, flags, mode)
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        self.record(format!("mkdir_all {path}"))?;
        self.store.mkdir_all(path, mode)
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        self.record(format!("write_file {name}"))?;
        self.store.write_file(name, data, mode)
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.record(format!("rename {src} {dst}"))?;
        self.store.rename(src, dst)
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.record(format!("remove {name}"))?;
        self.store.remove(name)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        self.record(format!("remove_all {path}"))?;
        self.store.remove_all(path)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.record(format!("read_file {name}"))?;
        self.store.read_file(name)
    }
}

/// Which file operation of [`FaultyFiles`] fails.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    Read,
    Close,
}

/// Wraps a [`MapFS`] and hands out files whose reads or `close` fail for the names
/// registered with [`FaultyFiles::fail`]. Every other call goes to the store unchanged.
#[derive(Clone, Default)]
pub(crate) struct FaultyFiles {
    pub(crate) store: MapFS,
    faults: Arc<Mutex<Vec<(String, Fault, io::ErrorKind)>>>,
}

impl FaultyFiles {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail(&self, name: &str, fault: Fault, kind: io::ErrorKind) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), fault, kind));
    }

    fn fault(&self, name: &str, fault: Fault) -> Option<io::ErrorKind> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(failing, f, _)| failing == name && *f == fault)
            .map(|(_, _, kind)| *kind)
    }

    fn wrap(&self, name: &str, inner: Box<dyn File>) -> Box<dyn File> {
        Box::new(FaultyFile {
            inner,
            read: self.fault(name, Fault::Read),
            close: self.fault(name, Fault::Close),
        })
    }
}

struct FaultyFile {
    inner: Box<dyn File>,
    read: Option<io::ErrorKind>,
    close: Option<io::ErrorKind>,
}

impl Read for FaultyFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read {
            Some(kind) => Err(io::Error::from(kind)),
            None => self.inner.read(buf),
        }
    }
}

impl Write for FaultyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FaultyFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl File for FaultyFile {
    fn metadata(&self) -> Result<Metadata> {
        self.inner.metadata()
    }

    fn close(self: Box<Self>) -> Result<()> {
        let FaultyFile { inner, close, .. } = *self;
        inner.close()?;
        match close {
            Some(kind) => Err(io::Error::from(kind).into()),
            None => Ok(()),
        }
    }
}

impl FsBackend for FaultyFiles {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        Ok(self.wrap(name, self.store.open(name)?))
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        self.store.read_dir(name)
    }

    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        Ok(self.wrap(name, self.store.open_file(name, flags, mode)?))
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        self.store.mkdir_all(path, mode)
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        self.store.write_file(name, data, mode)
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.store.rename(src, dst)
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.store.remove(name)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        self.store.remove_all(path)
    }
}
