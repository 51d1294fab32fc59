//! In-memory test doubles for [`ConfigDbClient`](crate::ConfigDbClient) and
//! [`AsicDbClient`](crate::AsicDbClient), standing in for a live Redis
//! instance in orchestrator tests.
//!
//! These doubles implement the DB client traits directly so
//! `DpbTransaction` can run against them unmodified.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sonic_dpb_common::{DpbError, DpbResult, Node};

use crate::asic_db::AsicDbClient;
use crate::config_db::ConfigDbClient;

/// In-memory Config DB double holding a single [`Node`] tree.
#[derive(Debug, Default, Clone)]
pub struct FixtureConfigDb {
    tree: Node,
    connected: bool,
}

impl FixtureConfigDb {
    /// Seeds the fixture with an initial configuration tree.
    pub fn new(tree: Node) -> Self {
        FixtureConfigDb {
            tree,
            connected: false,
        }
    }

    /// Returns the current tree without going through the trait, for test
    /// assertions.
    pub fn snapshot(&self) -> &Node {
        &self.tree
    }
}

#[async_trait]
impl ConfigDbClient for FixtureConfigDb {
    async fn connect(&mut self, _write_through: bool) -> DpbResult<()> {
        self.connected = true;
        Ok(())
    }

    async fn get_config(&mut self) -> DpbResult<Node> {
        Ok(self.tree.clone())
    }

    async fn mod_config(&mut self, payload: &Node) -> DpbResult<()> {
        let tables = payload
            .as_map()
            .ok_or_else(|| DpbError::internal("mod_config payload must be a map of tables"))?;

        let root = self
            .tree
            .as_map_mut()
            .ok_or_else(|| DpbError::internal("fixture root is not a map"))?;

        for (table, rows) in tables {
            let rows = rows
                .as_map()
                .ok_or_else(|| DpbError::internal(format!("mod_config payload for table '{table}' must be a map")))?;

            let table_node = root.entry(table.clone()).or_insert_with(Node::empty_map);
            let table_rows = table_node
                .as_map_mut()
                .ok_or_else(|| DpbError::internal(format!("table '{table}' is not a map")))?;

            for (row_key, value) in rows {
                apply_row(table_rows, row_key, value)?;
            }
        }
        Ok(())
    }

    async fn get_table(&mut self, table: &str) -> DpbResult<Node> {
        Ok(self.tree.table(table).cloned().unwrap_or_else(Node::empty_map))
    }
}

fn apply_row(
    table_rows: &mut std::collections::BTreeMap<String, Node>,
    row_key: &str,
    value: &Node,
) -> DpbResult<()> {
    match value {
        Node::Scalar(sonic_dpb_common::ScalarValue::Null) => {
            table_rows.remove(row_key);
        }
        Node::Map(fields) => {
            let row = table_rows.entry(row_key.to_string()).or_insert_with(Node::empty_map);
            let row_fields = row
                .as_map_mut()
                .ok_or_else(|| DpbError::internal(format!("row '{row_key}' is not a map")))?;
            for (field, field_value) in fields {
                if matches!(field_value, Node::List(items) if items.is_empty()) {
                    row_fields.remove(field);
                } else {
                    row_fields.insert(field.clone(), field_value.clone());
                }
            }
        }
        other => {
            return Err(DpbError::internal(format!(
                "unexpected row value shape for '{row_key}': {other:?}"
            )))
        }
    }
    Ok(())
}

/// In-memory Asic DB double. Ports in `present` are treated as still
/// realized in hardware; removing a port from it simulates `syncd`
/// finishing the delete.
#[derive(Debug, Default, Clone)]
pub struct FixtureAsicDb {
    present: HashSet<String>,
    port_oids: HashMap<String, String>,
    queue_oids: HashMap<String, String>,
}

impl FixtureAsicDb {
    pub fn new() -> Self {
        FixtureAsicDb::default()
    }

    /// Seeds the name to OID maps returned by `get_interface_oid_map`.
    pub fn with_oid_maps(mut self, ports: HashMap<String, String>, queues: HashMap<String, String>) -> Self {
        self.port_oids = ports;
        self.queue_oids = queues;
        self
    }

    /// Marks `key` as currently present (as if still programmed in
    /// hardware).
    pub fn mark_present(&mut self, key: impl Into<String>) {
        self.present.insert(key.into());
    }

    /// Simulates `syncd` finishing a delete.
    pub fn mark_released(&mut self, key: &str) {
        self.present.remove(key);
    }
}

#[async_trait]
impl AsicDbClient for FixtureAsicDb {
    async fn connect(&mut self) -> DpbResult<()> {
        Ok(())
    }

    async fn exists(&mut self, key: &str) -> DpbResult<bool> {
        Ok(self.present.contains(key))
    }

    async fn get_interface_oid_map(&mut self) -> DpbResult<(HashMap<String, String>, HashMap<String, String>)> {
        Ok((self.port_oids.clone(), self.queue_oids.clone()))
    }
}
