/*!
 * Memory-mapped input and output views
 *
 * Inputs are mapped read-only and shared across workers. The output is
 * created at its final size by writing a single zero byte at the last
 * offset, then mapped read-write.
 */

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut};
use tracing::debug;

use crate::error::{CombineError, Result};

/// Read-only view of an input file
#[derive(Debug)]
pub struct MappedInput {
    path: PathBuf,
    len: u64,
    // `None` for zero-length files, which cannot be mapped
    map: Option<Mmap>,
    _file: File,
}

impl MappedInput {
    /// Open a file and map its whole content read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CombineError::SourceNotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let len = file.metadata()?.len();

        // Safety: the file is opened read-only and the mapping is only ever
        // read. Modifying the input on disk while a run is in progress is
        // outside what this tool supports.
        let map = if len > 0 {
            Some(unsafe { Mmap::map(&file)? })
        } else {
            None
        };

        debug!("Mapped input {:?} ({} bytes)", path, len);

        Ok(Self {
            path: path.to_path_buf(),
            len,
            map,
            _file: file,
        })
    }

    /// Size of the file as reported by its metadata
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    /// Unmap and close the file
    pub fn close(self) {
        debug!("Released input {:?}", self.path);
    }
}

/// Open `path` for writing, truncating any existing content
///
/// Nothing on disk is modified when this fails. A size of zero is rejected
/// before the path is opened.
pub fn create_output_file(path: &Path, size: u64) -> Result<File> {
    if size == 0 {
        return Err(CombineError::EmptyOutput);
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    Ok(file)
}

/// Writable, pre-sized view of the output file
#[derive(Debug)]
pub struct MappedOutput {
    path: PathBuf,
    map: MmapMut,
    _file: File,
}

impl MappedOutput {
    /// Create or truncate `path`, extend it to `size` bytes and map it read-write
    pub fn create<P: AsRef<Path>>(path: P, size: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = create_output_file(path, size)?;
        Self::extend_and_map(path, file, size)
    }

    /// Extend a freshly truncated output file to `size` bytes and map it
    ///
    /// `file` must come from [`create_output_file`] for the same path.
    pub fn extend_and_map(path: &Path, mut file: File, size: u64) -> Result<Self> {
        if size == 0 {
            return Err(CombineError::EmptyOutput);
        }
        file.seek(SeekFrom::Start(size - 1))?;
        file.write_all(&[0u8])?;

        // Safety: the file was just truncated by this process, extended to
        // its final size and is not resized while mapped.
        let map = unsafe { MmapMut::map_mut(&file)? };

        debug!("Pre-allocated output {:?} ({} bytes)", path, size);

        Ok(Self {
            path: path.to_path_buf(),
            map,
            _file: file,
        })
    }

    pub fn len(&self) -> u64 {
        self.map.len() as u64
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }

    /// Flush every dirty page to the file, then unmap and close it
    pub fn close(self) -> Result<()> {
        self.map.flush()?;
        debug!("Flushed and released output {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_reads_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"baseband").unwrap();

        let input = MappedInput::open(&path).unwrap();
        assert_eq!(input.len(), 8);
        assert!(!input.is_empty());
        assert_eq!(input.as_slice(), b"baseband");
        input.close();
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let err = MappedInput::open(dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, CombineError::SourceNotFound(_)));
    }

    #[test]
    fn test_open_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let input = MappedInput::open(&path).unwrap();
        assert!(input.is_empty());
        assert!(input.as_slice().is_empty());
    }

    #[test]
    fn test_create_output_is_zeroed_and_sized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut output = MappedOutput::create(&path, 4096).unwrap();
        assert_eq!(output.len(), 4096);
        assert!(output.as_mut_slice().iter().all(|&b| b == 0));
        output.close().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4096);
    }

    #[test]
    fn test_create_output_zero_size() {
        let dir = tempdir().unwrap();
        let err = MappedOutput::create(dir.path().join("out.bin"), 0).unwrap_err();
        assert!(matches!(err, CombineError::EmptyOutput));
    }

    #[test]
    fn test_create_output_discards_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        std::fs::write(&path, vec![0xFFu8; 64]).unwrap();

        let output = MappedOutput::create(&path, 16).unwrap();
        output.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn test_writes_are_flushed_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut output = MappedOutput::create(&path, 4).unwrap();
        output.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
        output.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_create_in_missing_directory() {
        let dir = tempdir().unwrap();
        let err = MappedOutput::create(dir.path().join("no/such/dir/out.bin"), 8).unwrap_err();
        assert!(matches!(err, CombineError::Io(_)));
    }

    #[test]
    fn test_failed_open_leaves_existing_path_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), b"keep").unwrap();

        assert!(create_output_file(&path, 8).is_err());
        assert_eq!(std::fs::read(path.join("keep.txt")).unwrap(), b"keep");
    }

    #[test]
    fn test_zero_size_rejected_before_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        std::fs::write(&path, b"existing").unwrap();

        let err = create_output_file(&path, 0).unwrap_err();
        assert!(matches!(err, CombineError::EmptyOutput));
        assert_eq!(std::fs::read(&path).unwrap(), b"existing");
    }
}
