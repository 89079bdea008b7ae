//! Payload storage for both IWM forms.
//!
//! - [`directory`] - `index.json` plus one raw file per payload
//! - [`container`] - a single CBOR map holding index and payloads
//! - [`raw`] - counted reads and writes used to detect short transfers

pub mod container;
pub mod directory;
pub mod raw;

pub use container::ContainerWriter;
pub use directory::DirectoryStore;
