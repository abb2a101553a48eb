use std::{
    fs::{self, File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
    storage::page::Page,
    types::{error::Result, PageId, DATA_FILE_EXTENSION, PAGE_SIZE},
};

/// Owns the single data file `<dir>/<db_name>.ndb` and performs all
/// page-aligned I/O against it.
pub struct DiskManager {
    database_name: String,
    path: PathBuf,
    file: File,
}

impl DiskManager {
    pub fn new<P: AsRef<Path>>(data_directory: P, database_name: &str) -> Result<Self> {
        let dir = data_directory.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!("Created data directory: {}", dir.display());
        }

        let path = dir.join(format!("{}{}", database_name, DATA_FILE_EXTENSION));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        info!("Opened database file: {}", path.display());

        Ok(Self {
            database_name: database_name.to_string(),
            path,
            file,
        })
    }

    /// Reads the page at `page_id * PAGE_SIZE`. Returns None when the page
    /// lies past the end of the file; a short read is logged and treated
    /// the same way.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Option<Page>> {
        let offset = page_id as u64 * PAGE_SIZE as u64;
        if offset >= self.file.metadata()?.len() {
            return Ok(None);
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; PAGE_SIZE];
        let bytes_read = self.file.read(&mut buffer)?;
        if bytes_read < PAGE_SIZE {
            warn!(
                "Incomplete page read for page {}, only {} bytes",
                page_id, bytes_read
            );
            return Ok(None);
        }

        debug!("Read page {} from disk", page_id);
        Ok(Some(Page::from_bytes(page_id, &buffer)?))
    }

    /// Writes the full page image and syncs it to durable storage.
    pub fn write_page(&mut self, page: &Page) -> Result<()> {
        let offset = page.page_id() as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.data())?;
        self.file.sync_all()?;
        debug!("Wrote page {} to disk", page.page_id());
        Ok(())
    }

    /// Extends the file by one page and returns the id of the new page.
    pub fn allocate_new_page(&mut self) -> Result<PageId> {
        let file_length = self.file.metadata()?.len();
        let new_page_id = (file_length / PAGE_SIZE as u64) as PageId;
        self.file.set_len(file_length + PAGE_SIZE as u64)?;
        debug!("Allocated new page with id {}", new_page_id);
        Ok(new_page_id)
    }

    pub fn close(&mut self) -> Result<()> {
        self.file.sync_all()?;
        info!("Closed database file for {}", self.database_name);
        Ok(())
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
