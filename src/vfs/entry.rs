#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
    /// Devices, sockets, pipes and whatever else a host may hold.
    Other,
}

/// Metadata of an opened file or of a directory entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Metadata {
    entry_type: EntryType,
    mode: u32,
    len: u64,
}

impl Metadata {
    pub fn new(entry_type: EntryType, mode: u32, len: u64) -> Metadata {
        Metadata {
            entry_type,
            mode: mode & 0o777,
            len,
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Permission bits only (`0o777` mask).
    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// A child of a directory as returned by `read_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    metadata: Metadata,
}

impl DirEntry {
    pub fn new<S: Into<String>>(name: S, metadata: Metadata) -> DirEntry {
        DirEntry {
            name: name.into(),
            metadata,
        }
    }

    /// Base name of the entry (no directory part).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> Metadata {
        self.metadata
    }

    pub fn entry_type(&self) -> EntryType {
        self.metadata.entry_type
    }

    pub fn is_file(&self) -> bool {
        self.metadata.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.metadata.is_dir()
    }
}
