//! Tree algorithms shared by the dynamic port breakout orchestrator: key
//! search over the defaults file, symmetric diff and Config DB write
//! payload synthesis, and structural merge.
//!
//! All three dispatch on [`sonic_dpb_common::Node`] rather than
//! `serde_json::Value` directly, so a map/list/scalar branch is always an
//! exhaustive three-way match instead of a `Value::is_object()` check.

pub mod diff;
pub mod key_search;
pub mod merge;

pub use diff::{delta, synthesize_write_payload, symmetric_diff};
pub use key_search::search_keys;
pub use merge::merge;
