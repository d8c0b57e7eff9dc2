use std::fs::File;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use memmap2::{Mmap, MmapOptions};
use crate::core::error::{Error, Result};

/// Memory-mapped file for zero-copy reads
pub struct MmapFile {
    pub mmap: Arc<Mmap>,
    pub len: usize,
}

impl MmapFile {
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let metadata = file.metadata()?;
        let len = metadata.len() as usize;

        // Shard files are immutable once written
        let mmap = unsafe { MmapOptions::new().len(len).map(&file)? };

        Ok(MmapFile { mmap: Arc::new(mmap), len })
    }

    pub fn data(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Shared view of `range`; fails if it runs past the end of the file
    pub fn slice(&self, range: Range<usize>) -> Result<MmapSlice> {
        if range.start > range.end || range.end > self.len {
            return Err(Error::corrupted(format!(
                "section {}..{} outside file of {} bytes", range.start, range.end, self.len)));
        }
        Ok(MmapSlice { mmap: Arc::clone(&self.mmap), range })
    }
}

/// A section of a mapped file that keeps the mapping alive
#[derive(Clone)]
pub struct MmapSlice {
    mmap: Arc<Mmap>,
    range: Range<usize>,
}

impl MmapSlice {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

impl AsRef<[u8]> for MmapSlice {
    fn as_ref(&self) -> &[u8] {
        &self.mmap[self.range.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn slice_is_bounds_checked() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"header|body").unwrap();

        let mapped = MmapFile::open_read_only(file.path()).unwrap();
        assert_eq!(mapped.slice(7..11).unwrap().as_ref(), b"body");
        assert!(mapped.slice(7..12).is_err());
    }
}
