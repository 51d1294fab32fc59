//! Loader for the port-breakout defaults file.
//!
//! `/etc/sonic/port_breakout_config_db.json` holds the per-platform default
//! field values (e.g. `admin_status`, `mtu`) merged into a freshly
//! broken-out port's row when `--load-default` is passed. It is a plain
//! Config DB-shaped JSON document, no different in structure from what
//! `get_config()` returns.

use std::path::Path;

use sonic_dpb_common::{DpbError, DpbResult, Node};

/// Reads and parses the defaults file at `path` into a [`Node`] tree.
pub fn load_defaults_file(path: impl AsRef<Path>) -> DpbResult<Node> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| DpbError::defaults_file(path.display().to_string(), e.to_string()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| DpbError::defaults_file(path.display().to_string(), e.to_string()))?;
    Ok(Node::from(value))
}
