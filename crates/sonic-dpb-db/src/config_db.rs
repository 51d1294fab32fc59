//! Config DB client trait and a Redis-backed implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sonic_dpb_common::{DpbError, DpbResult, Node, ScalarValue};
use tracing::{debug, info};

/// Redis hash field names ending in `@` hold comma-separated lists, per
/// Config DB's own convention (e.g. `VLAN_MEMBER|Vlan100|members@`).
const LIST_FIELD_SUFFIX: char = '@';

/// The configuration store holding the switch's intended configuration.
#[async_trait]
pub trait ConfigDbClient: Send + Sync {
    /// Opens the connection. `write_through` requests that writes be
    /// visible to readers immediately rather than buffered.
    async fn connect(&mut self, write_through: bool) -> DpbResult<()>;

    /// Reads the entire configuration tree.
    async fn get_config(&mut self) -> DpbResult<Node>;

    /// Applies a write payload as a keyspace merge: `null` at a row
    /// position deletes the row; an empty list at a field clears it.
    async fn mod_config(&mut self, payload: &Node) -> DpbResult<()>;

    /// Reads a single table. Test/debug use.
    async fn get_table(&mut self, table: &str) -> DpbResult<Node>;
}

/// A [`ConfigDbClient`] backed by a real Redis CONFIG_DB.
pub struct RedisConfigDb {
    host: String,
    port: u16,
    db: u8,
    write_through: bool,
    connection: Option<ConnectionManager>,
}

impl RedisConfigDb {
    /// CONFIG_DB is database 4 in the standard SONiC Redis layout.
    const CONFIG_DB_INDEX: u8 = 4;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        RedisConfigDb {
            host: host.into(),
            port,
            db: Self::CONFIG_DB_INDEX,
            write_through: false,
            connection: None,
        }
    }

    fn uri(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }

    fn connection_mut(&mut self) -> DpbResult<&mut ConnectionManager> {
        self.connection
            .as_mut()
            .ok_or_else(|| DpbError::db_io("get_connection", "connect() was not called"))
    }
}

#[async_trait]
impl ConfigDbClient for RedisConfigDb {
    async fn connect(&mut self, write_through: bool) -> DpbResult<()> {
        let uri = self.uri();
        let client = redis::Client::open(uri.clone()).map_err(|e| DpbError::db_io("connect", format!("{uri}: {e}")))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| DpbError::db_io("connect", format!("{uri}: {e}")))?;

        self.write_through = write_through;
        self.connection = Some(connection);
        info!("connected to Config DB at {} (write_through={})", uri, write_through);
        Ok(())
    }

    async fn get_config(&mut self) -> DpbResult<Node> {
        let write_through = self.write_through;
        let conn = self.connection_mut()?;
        let keys: Vec<String> = conn.keys("*").await.map_err(|e| DpbError::db_io("get_config", e.to_string()))?;

        let mut root: BTreeMap<String, Node> = BTreeMap::new();
        for key in keys {
            let Some((table, row_key)) = key.split_once('|') else { continue };
            let fields: std::collections::HashMap<String, String> =
                conn.hgetall(&key).await.map_err(|e| DpbError::db_io("get_config", e.to_string()))?;
            let row = fields_to_node(fields);
            root.entry(table.to_string()).or_insert_with(Node::empty_map);
            if let Some(Node::Map(rows)) = root.get_mut(table) {
                rows.insert(row_key.to_string(), row);
            }
        }

        debug!("read {} table(s) from Config DB (write_through={})", root.len(), write_through);
        Ok(Node::Map(root))
    }

    async fn mod_config(&mut self, payload: &Node) -> DpbResult<()> {
        let tables = payload
            .as_map()
            .ok_or_else(|| DpbError::internal("mod_config payload must be a map of tables"))?;

        for (table, rows) in tables {
            let rows = rows
                .as_map()
                .ok_or_else(|| DpbError::internal(format!("mod_config payload for table '{table}' must be a map")))?;

            for (row_key, value) in rows {
                let redis_key = format!("{table}|{row_key}");
                match value {
                    Node::Scalar(ScalarValue::Null) => {
                        let conn = self.connection_mut()?;
                        let _: () = conn.del(&redis_key).await.map_err(|e| DpbError::db_io("mod_config", e.to_string()))?;
                    }
                    Node::Map(fields) => {
                        for (field, field_value) in fields {
                            let redis_field = if matches!(field_value, Node::List(_)) {
                                format!("{field}{LIST_FIELD_SUFFIX}")
                            } else {
                                field.clone()
                            };
                            if matches!(field_value, Node::List(items) if items.is_empty()) {
                                let conn = self.connection_mut()?;
                                let _: () = conn
                                    .hdel(&redis_key, &redis_field)
                                    .await
                                    .map_err(|e| DpbError::db_io("mod_config", e.to_string()))?;
                            } else {
                                let conn = self.connection_mut()?;
                                let _: () = conn
                                    .hset(&redis_key, &redis_field, field_to_redis_value(field_value))
                                    .await
                                    .map_err(|e| DpbError::db_io("mod_config", e.to_string()))?;
                            }
                        }
                    }
                    other => {
                        return Err(DpbError::internal(format!(
                            "unexpected row value shape for '{redis_key}': {other:?}"
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    async fn get_table(&mut self, table: &str) -> DpbResult<Node> {
        let pattern = format!("{table}|*");
        let conn = self.connection_mut()?;
        let keys: Vec<String> = conn.keys(&pattern).await.map_err(|e| DpbError::db_io("get_table", e.to_string()))?;

        let mut rows = BTreeMap::new();
        for key in keys {
            let Some((_, row_key)) = key.split_once('|') else { continue };
            let fields: std::collections::HashMap<String, String> =
                conn.hgetall(&key).await.map_err(|e| DpbError::db_io("get_table", e.to_string()))?;
            rows.insert(row_key.to_string(), fields_to_node(fields));
        }
        Ok(Node::Map(rows))
    }
}

fn fields_to_node(fields: std::collections::HashMap<String, String>) -> Node {
    let mut map = BTreeMap::new();
    for (field, value) in fields {
        if field.ends_with(LIST_FIELD_SUFFIX) {
            let items = value.split(',').filter(|s| !s.is_empty()).map(Node::scalar).collect();
            map.insert(field.trim_end_matches(LIST_FIELD_SUFFIX).to_string(), Node::List(items));
        } else {
            map.insert(field, Node::scalar(value));
        }
    }
    Node::Map(map)
}

fn field_to_redis_value(node: &Node) -> String {
    match node {
        Node::Scalar(s) => s.to_string(),
        Node::List(items) => items
            .iter()
            .filter_map(|n| n.as_scalar())
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(","),
        Node::Map(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fields_to_node_splits_list_suffixed_fields() {
        let mut fields = std::collections::HashMap::new();
        fields.insert("members@".to_string(), "Ethernet0,Ethernet4".to_string());
        fields.insert("vlanid".to_string(), "100".to_string());

        let node = fields_to_node(fields);
        let map = node.as_map().unwrap();
        assert_eq!(map.get("vlanid"), Some(&Node::scalar("100")));
        assert_eq!(
            map.get("members"),
            Some(&Node::List(vec![Node::scalar("Ethernet0"), Node::scalar("Ethernet4")]))
        );
    }

    #[test]
    fn field_to_redis_value_joins_lists_with_commas() {
        let list = Node::List(vec![Node::scalar("Ethernet0"), Node::scalar("Ethernet4")]);
        assert_eq!(field_to_redis_value(&list), "Ethernet0,Ethernet4");
    }

    #[test]
    fn list_field_round_trips_through_the_at_suffix_convention() {
        let field = "members";
        let value = Node::List(vec![Node::scalar("Ethernet0"), Node::scalar("Ethernet4")]);
        let redis_field = format!("{field}{LIST_FIELD_SUFFIX}");
        let redis_value = field_to_redis_value(&value);

        let mut stored = std::collections::HashMap::new();
        stored.insert(redis_field, redis_value);

        let node = fields_to_node(stored);
        assert_eq!(node.as_map().unwrap().get(field), Some(&value));
    }
}
