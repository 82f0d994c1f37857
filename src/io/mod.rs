//! Import/Export of the memory collection.
//!
//! The exchange format is the persisted one: a pretty-printed JSON array of
//! memory records. Import is all-or-nothing. The payload is parsed and
//! normalized completely before anything is written, so a malformed file
//! leaves the collection untouched.
//!
//! # Examples
//!
//! ```rust,ignore
//! use memory_lane::io::{backup_file_name, export_json, import_into};
//!
//! let json = export_json(&store.snapshot())?;
//! std::fs::write(backup_file_name(chrono::Utc::now().date_naive()), json)?;
//!
//! let imported = import_into(&store, &std::fs::read_to_string("backup.json")?)?;
//! ```

mod transfer;

pub use transfer::{backup_file_name, export_json, import_into, import_json};
