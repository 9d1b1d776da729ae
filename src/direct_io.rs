//! Page-granularity file I/O that bypasses the OS page cache where the
//! platform allows it (§4.5: "page-aligned direct I/O, or an equivalent
//! that bypasses OS buffering").
//!
//! Grounded on `original_source/src/sst.cpp`'s
//! `open(filename, O_WRONLY | O_CREAT | O_DIRECT)` / `pread`/`pwrite`
//! pair. `O_DIRECT` is Linux-specific; on other platforms the flag is
//! simply omitted and reads/writes stay at page granularity, which is the
//! property every caller in this crate actually depends on.

use std::fs::{File, OpenOptions};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(all(unix, target_os = "linux"))]
use std::os::unix::fs::OpenOptionsExt;

use crate::aligned::AlignedPage;
use crate::core::PAGE_SIZE;
use crate::error::Result;

/// A file accessed exclusively at `PAGE_SIZE`-aligned offsets.
pub struct PageFile {
    file: File,
}

impl PageFile {
    /// Create a new file for writing, truncating any existing contents.
    pub fn create(path: &Path) -> Result<PageFile> {
        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(all(unix, target_os = "linux"))]
        opts.custom_flags(libc::O_DIRECT);
        let file = opts.open(path)?;
        Ok(PageFile { file })
    }

    /// Open an existing file for reading.
    pub fn open_read(path: &Path) -> Result<PageFile> {
        let mut opts = OpenOptions::new();
        opts.read(true);
        #[cfg(all(unix, target_os = "linux"))]
        opts.custom_flags(libc::O_DIRECT);
        let file = opts.open(path)?;
        Ok(PageFile { file })
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn page_count(&self) -> Result<u64> {
        Ok(self.len()? / PAGE_SIZE as u64)
    }

    /// Append one page at the given byte offset, which must already be the
    /// current end of file (the materializer never seeks backwards).
    #[cfg(unix)]
    pub fn write_page_at(&self, offset: u64, page: &AlignedPage) -> Result<()> {
        self.file.write_all_at(page.as_slice(), offset)?;
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn write_page_at(&mut self, offset: u64, page: &AlignedPage) -> Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;
        Ok(())
    }

    #[cfg(unix)]
    pub fn read_page_at(&self, offset: u64) -> Result<AlignedPage> {
        let mut page = AlignedPage::new()?;
        self.file.read_exact_at(page.as_mut_slice(), offset)?;
        Ok(page)
    }

    #[cfg(not(unix))]
    pub fn read_page_at(&mut self, offset: u64) -> Result<AlignedPage> {
        use std::io::{Read, Seek, SeekFrom};
        let mut page = AlignedPage::new()?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(page.as_mut_slice())?;
        Ok(page)
    }

    pub fn sync_all(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
