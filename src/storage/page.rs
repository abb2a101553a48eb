use crate::types::{error::DatabaseError, error::Result, PageId, PAGE_HEADER_SIZE, PAGE_SIZE};

/*
 * Page layout on disk
 * ┌──────────────────────────────────────────────────────────────┐
 * │ HEADER (16 bytes)                                            │
 * │   page_id(4) | record_count(4) | free_space(4) | reserved(4) │
 * ├──────────────────────────────────────────────────────────────┤
 * │ RECORD AREA (packed from the low end upward)                 │
 * │   [len0(4)|bytes0] [len1(4)|bytes1] ...                      │
 * ├──────────────────────────────────────────────────────────────┤
 * │ FREE SPACE                                                   │
 * └──────────────────────────────────────────────────────────────┘
 */
pub struct Page {
    page_id: PageId,
    data: Vec<u8>,
    record_count: i32,
    free_space: i32,
    dirty: bool,
}

impl Page {
    pub fn new(page_id: PageId) -> Self {
        let mut page = Self {
            page_id,
            data: vec![0; PAGE_SIZE],
            record_count: 0,
            free_space: (PAGE_SIZE - PAGE_HEADER_SIZE) as i32,
            dirty: false,
        };
        page.write_header();
        page
    }

    /// Reconstructs a page from its on-disk image. The stored page id must
    /// match the id the page was requested under.
    pub fn from_bytes(page_id: PageId, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: format!("expected {} bytes, got {}", PAGE_SIZE, bytes.len()),
            });
        }

        let stored_page_id = read_i32(bytes, 0);
        let record_count = read_i32(bytes, 4);
        let free_space = read_i32(bytes, 8);

        if stored_page_id != page_id {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: format!("stored page id {} does not match", stored_page_id),
            });
        }

        Ok(Self {
            page_id,
            data: bytes.to_vec(),
            record_count,
            free_space,
            dirty: false,
        })
    }

    /// Appends a length-prefixed record. Returns false when the record plus
    /// its 4-byte prefix does not fit in the remaining free space.
    pub fn insert_record(&mut self, record: &[u8]) -> bool {
        let needed = record.len() + 4;
        if needed as i32 > self.free_space {
            return false;
        }

        let insert_at = PAGE_HEADER_SIZE + (PAGE_SIZE - PAGE_HEADER_SIZE - self.free_space as usize);
        write_i32(&mut self.data, insert_at, record.len() as i32);
        self.data[insert_at + 4..insert_at + 4 + record.len()].copy_from_slice(record);

        self.record_count += 1;
        self.free_space -= needed as i32;
        self.dirty = true;
        self.write_header();
        true
    }

    /// Walks the record area and returns every resident record.
    pub fn records(&self) -> Vec<Vec<u8>> {
        let mut records = Vec::with_capacity(self.record_count as usize);
        let mut offset = PAGE_HEADER_SIZE;

        for _ in 0..self.record_count {
            let len = read_i32(&self.data, offset) as usize;
            offset += 4;
            records.push(self.data[offset..offset + len].to_vec());
            offset += len;
        }

        records
    }

    fn write_header(&mut self) {
        write_i32(&mut self.data, 0, self.page_id);
        write_i32(&mut self.data, 4, self.record_count);
        write_i32(&mut self.data, 8, self.free_space);
        write_i32(&mut self.data, 12, 0); // reserved
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn record_count(&self) -> i32 {
        self.record_count
    }

    pub fn free_space(&self) -> i32 {
        self.free_space
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn write_i32(bytes: &mut [u8], offset: usize, value: i32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
