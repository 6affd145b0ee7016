//! Disk backed page storage.

use crate::api::Storage;
use crate::errors::StorageError;
use crate::fsl::FreeSpaceList;
use crate::header::{FILE_HEADER_SIZE, FileHeader};
use page::location::PageId;
use page::page::{MINIMUM_PAGE_SIZE, Page};
use std::fs::{self, File, OpenOptions};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

/// Page storage over a local file.
///
/// Layout: an 8 byte header fixing the page size, then consecutive pages.
/// Page `n` lives at `FILE_HEADER_SIZE + (n - 1) * page_size`. The free
/// space list snapshot is kept in a sibling file with the `_fsl` suffix.
#[derive(Debug)]
pub struct FileStorage<P: Page> {
    path: PathBuf,
    fsl_path: PathBuf,
    page_size: usize,
    page_count: u64,
    data_file: Option<File>,
    _page: PhantomData<fn() -> P>,
}

impl<P: Page> FileStorage<P> {
    /// Creates a storage bound to `path` with the configured page size.
    /// On open, an existing file's stored page size wins over this value.
    pub fn new(path: impl Into<PathBuf>, page_size: usize) -> Result<Self, StorageError> {
        if page_size < MINIMUM_PAGE_SIZE {
            return Err(StorageError::InvalidPageSize { size: page_size });
        }
        let path = path.into();
        let mut fsl_path = path.clone().into_os_string();
        fsl_path.push("_fsl");
        Ok(Self {
            path,
            fsl_path: PathBuf::from(fsl_path),
            page_size,
            page_count: 0,
            data_file: None,
            _page: PhantomData,
        })
    }

    /// Path of the backing data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> Result<&File, StorageError> {
        self.data_file.as_ref().ok_or(StorageError::NotOpen)
    }

    fn page_offset(&self, page_id: PageId) -> u64 {
        FILE_HEADER_SIZE as u64 + (page_id - 1) * self.page_size as u64
    }

    fn read_at(file: &File, buffer: &mut [u8], offset: u64) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            file.read_exact_at(buffer, offset)
        }
        #[cfg(windows)]
        {
            let mut read = 0;
            while read < buffer.len() {
                let n = file.seek_read(&mut buffer[read..], offset + read as u64)?;
                if n == 0 {
                    return Err(std::io::ErrorKind::UnexpectedEof.into());
                }
                read += n;
            }
            Ok(())
        }
    }

    fn write_at(file: &File, buffer: &[u8], offset: u64) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            file.write_all_at(buffer, offset)
        }
        #[cfg(windows)]
        {
            let mut written = 0;
            while written < buffer.len() {
                let n = file.seek_write(&buffer[written..], offset + written as u64)?;
                if n == 0 {
                    return Err(std::io::ErrorKind::WriteZero.into());
                }
                written += n;
            }
            Ok(())
        }
    }
}

impl<P: Page> Storage<P> for FileStorage<P> {
    fn open(&mut self) -> Result<(), StorageError> {
        if self.data_file.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let file_size = file.metadata()?.len();
        if file_size != 0 {
            // Existing file: adopt the stored page size and derive the
            // page count from the content length.
            let mut header_bytes = [0u8; FILE_HEADER_SIZE];
            Self::read_at(&file, &mut header_bytes, 0)?;
            let header = FileHeader::load(&header_bytes)?;
            self.page_size = header.page_size;
            self.page_count = (file_size - FILE_HEADER_SIZE as u64) / self.page_size as u64;
        } else {
            let header = FileHeader {
                page_size: self.page_size,
            };
            Self::write_at(&file, &header.dump(), 0)?;
            self.page_count = 0;
        }
        tracing::debug!(
            path = %self.path.display(),
            page_size = self.page_size,
            page_count = self.page_count,
            "opened file storage"
        );
        self.data_file = Some(file);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.data_file.is_some()
    }

    fn close(&mut self) -> Result<(), StorageError> {
        if let Some(file) = self.data_file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StorageError> {
        self.data_file = None;
        for path in [&self.path, &self.fsl_path] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn page_count(&self) -> u64 {
        self.page_count
    }

    fn allocate(&mut self) -> PageId {
        self.page_count += 1;
        self.page_count
    }

    fn read(&mut self, page_id: PageId) -> Result<P, StorageError> {
        if page_id == 0 {
            return Err(StorageError::InvalidPageId);
        }
        let file = self.file()?;
        let offset = self.page_offset(page_id);
        let file_size = file.metadata()?.len();
        if offset + self.page_size as u64 > file_size {
            return Err(StorageError::PageNotFound(page_id));
        }

        let mut buffer = vec![0u8; self.page_size];
        Self::read_at(file, &mut buffer, offset)?;
        Ok(P::load(&buffer)?)
    }

    fn write(&mut self, page: &P) -> Result<(), StorageError> {
        if page.id() == 0 {
            return Err(StorageError::InvalidPageId);
        }
        let offset = self.page_offset(page.id());
        let mut buffer = vec![0u8; self.page_size];
        page.dump(&mut buffer)?;
        Self::write_at(self.file()?, &buffer, offset)?;
        Ok(())
    }

    fn read_fsl(&mut self) -> Result<FreeSpaceList, StorageError> {
        match fs::read(&self.fsl_path) {
            Ok(bytes) if !bytes.is_empty() => FreeSpaceList::load(&bytes),
            Ok(_) => Ok(FreeSpaceList::new()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(FreeSpaceList::new())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn write_fsl(&mut self, fsl: &FreeSpaceList) -> Result<(), StorageError> {
        Ok(fs::write(&self.fsl_path, fsl.dump())?)
    }
}
