//! Snapshot Diff Utility
//!
//! Pure comparison helpers for two snapshots of the same Kubernetes resource.
//! Nothing in here knows which changes are worth recording; that decision
//! belongs to the per-kind policies in the change tracker. These helpers only
//! answer structural questions:
//!
//! - `maps`: key-set and value deltas between two string-keyed maps
//! - `containers`: container image lookups and index-aligned image changes
//! - `quantity`: semantic equality of resource quantities (`1000m == 1`)
//! - `render`: line-level before/after rendering and small display helpers
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use snapshot_diff::maps::diff_keys;
//!
//! let old = BTreeMap::from([("a".to_string(), "1".to_string())]);
//! let new = BTreeMap::from([("b".to_string(), "2".to_string())]);
//! let delta = diff_keys(Some(&old), Some(&new));
//! assert_eq!(delta.added, vec!["b".to_string()]);
//! assert_eq!(delta.removed, vec!["a".to_string()]);
//! ```

pub mod containers;
pub mod maps;
pub mod quantity;
pub mod render;

pub use containers::{ImageChange, containers, first_image, image_changes};
pub use maps::{KeyDelta, diff_keys, maps_equal};
pub use quantity::{parse_quantity, quantities_equal, resource_lists_equal};
pub use render::{display_opt, join_or_none, line_diff};
