//! Filesystem projection of ConfigMap data
//!
//! A small library that mirrors the data entries of a Kubernetes ConfigMap
//! into a target directory, one file per entry. The filesystem itself is the
//! registration state: a ConfigMap counts as registered as long as at least
//! one of its mapped files exists on disk. There is no separate index and no
//! in-memory cache, so state survives process restarts for free.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use filestore::FileStore;
//!
//! # fn example() -> Result<(), filestore::FileStoreError> {
//! let store = FileStore::new("/etc/prometheus/rules", false);
//!
//! let mut data = BTreeMap::new();
//! data.insert("alerts.yml".to_string(), "groups: []".to_string());
//!
//! let written = store.register("monitoring", "prom-rules", &data)?;
//! assert!(store.is_registered("monitoring", "prom-rules", &data));
//!
//! store.remove("monitoring", "prom-rules", &data)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod store;

pub use error::FileStoreError;
pub use store::{FileStore, target_path};
