//! Byte Store
//!
//! Positioned access to the file underneath a [`BufferedChannel`](super::BufferedChannel).

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Random-access byte store capability
///
/// All offsets are absolute. Implementations must tolerate concurrent
/// positioned reads alongside a single writer.
pub trait FileStore: Send + Sync {
    /// Read into `buf` starting at `pos`; returns the number of bytes read,
    /// 0 at end of file
    fn read_at(&self, buf: &mut [u8], pos: u64) -> io::Result<usize>;

    /// Write all of `buf` starting at `pos`
    fn write_at(&self, buf: &[u8], pos: u64) -> io::Result<()>;

    /// Current length of the store
    fn size(&self) -> io::Result<u64>;

    /// Shrink (or extend) the store to `len` bytes
    fn truncate(&self, len: u64) -> io::Result<()>;

    /// Force written bytes to stable storage; `metadata` also syncs file metadata
    fn force(&self, metadata: bool) -> io::Result<()>;

    fn is_open(&self) -> bool;
}

/// [`FileStore`] backed by a `std::fs::File`
#[derive(Debug)]
pub struct FileChannel {
    file: File,
    open: AtomicBool,
}

impl FileChannel {
    /// Open (creating if needed) a file for reading and writing
    ///
    /// Existing content is kept.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self::from_file(file))
    }

    /// Open an existing file read-only; writes will fail with the OS error
    pub fn open_read_only(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self::from_file(file))
    }

    pub fn from_file(file: File) -> Self {
        Self {
            file,
            open: AtomicBool::new(true),
        }
    }

    /// Mark the channel closed; later operations fail
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "file channel is closed",
            ))
        }
    }
}

impl FileStore for FileChannel {
    fn read_at(&self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        self.ensure_open()?;
        positioned::read_at(&self.file, buf, pos)
    }

    fn write_at(&self, buf: &[u8], pos: u64) -> io::Result<()> {
        self.ensure_open()?;
        positioned::write_all_at(&self.file, buf, pos)
    }

    fn size(&self) -> io::Result<u64> {
        self.ensure_open()?;
        Ok(self.file.metadata()?.len())
    }

    fn truncate(&self, len: u64) -> io::Result<()> {
        self.ensure_open()?;
        self.file.set_len(len)
    }

    fn force(&self, metadata: bool) -> io::Result<()> {
        self.ensure_open()?;
        if metadata {
            self.file.sync_all()
        } else {
            self.file.sync_data()
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

#[cfg(unix)]
mod positioned {
    use std::fs::File;
    use std::io;
    use std::os::unix::fs::FileExt;

    pub fn read_at(file: &File, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        file.read_at(buf, pos)
    }

    pub fn write_all_at(file: &File, buf: &[u8], pos: u64) -> io::Result<()> {
        file.write_all_at(buf, pos)
    }
}

#[cfg(windows)]
mod positioned {
    use std::fs::File;
    use std::io;
    use std::os::windows::fs::FileExt;

    pub fn read_at(file: &File, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        file.seek_read(buf, pos)
    }

    pub fn write_all_at(file: &File, mut buf: &[u8], mut pos: u64) -> io::Result<()> {
        while !buf.is_empty() {
            match file.seek_write(buf, pos) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ))
                }
                Ok(n) => {
                    buf = &buf[n..];
                    pos += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<S: FileStore + ?Sized> FileStore for std::sync::Arc<S> {
    fn read_at(&self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        (**self).read_at(buf, pos)
    }

    fn write_at(&self, buf: &[u8], pos: u64) -> io::Result<()> {
        (**self).write_at(buf, pos)
    }

    fn size(&self) -> io::Result<u64> {
        (**self).size()
    }

    fn truncate(&self, len: u64) -> io::Result<()> {
        (**self).truncate(len)
    }

    fn force(&self, metadata: bool) -> io::Result<()> {
        (**self).force(metadata)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
