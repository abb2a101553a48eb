pub mod data_type;
pub mod error;

// Common type aliases
pub type PageId = i32;
pub type RecordId = i32;
pub type TransactionId = i64;

// Page geometry: a 16-byte header (page_id, record_count, free_space,
// reserved; little-endian i32 each) followed by length-prefixed records.
pub const PAGE_SIZE: usize = 4096;
pub const PAGE_HEADER_SIZE: usize = 16;

pub const DATA_FILE_EXTENSION: &str = ".ndb";
