//! Asic DB client trait and a Redis-backed implementation.
//!
//! Asic DB reflects what the data plane has actually realized, lagging
//! Config DB by however long `syncd` takes to program the hardware. The
//! orchestrator polls it after a delete to find out when ports have
//! actually been released.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sonic_dpb_common::{DpbError, DpbResult};
use tracing::info;

/// Hash holding the interface name to OID mapping, written by `syncd`.
const PORT_NAME_MAP_KEY: &str = "COUNTERS_PORT_NAME_MAP";
/// Hash holding the lane-queue name to OID mapping.
const QUEUE_NAME_MAP_KEY: &str = "COUNTERS_QUEUE_NAME_MAP";

/// The data-plane-realized state store.
#[async_trait]
pub trait AsicDbClient: Send + Sync {
    /// Opens the connection.
    async fn connect(&mut self) -> DpbResult<()>;

    /// Returns whether `key` currently exists in Asic DB.
    async fn exists(&mut self, key: &str) -> DpbResult<bool>;

    /// Returns the interface name to OID map and the queue name to OID
    /// map, in that order, as captured at call time.
    async fn get_interface_oid_map(&mut self) -> DpbResult<(HashMap<String, String>, HashMap<String, String>)>;
}

/// An [`AsicDbClient`] backed by a real Redis ASIC_DB.
pub struct RedisAsicDb {
    host: String,
    port: u16,
    db: u8,
    connection: Option<ConnectionManager>,
}

impl RedisAsicDb {
    /// ASIC_DB (counters side) is database 2 in the standard SONiC Redis
    /// layout.
    const ASIC_DB_INDEX: u8 = 2;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        RedisAsicDb {
            host: host.into(),
            port,
            db: Self::ASIC_DB_INDEX,
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
impl AsicDbClient for RedisAsicDb {
    async fn connect(&mut self) -> DpbResult<()> {
        let uri = self.uri();
        let client = redis::Client::open(uri.clone()).map_err(|e| DpbError::db_io("connect", format!("{uri}: {e}")))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| DpbError::db_io("connect", format!("{uri}: {e}")))?;

        self.connection = Some(connection);
        info!("connected to Asic DB at {}", uri);
        Ok(())
    }

    async fn exists(&mut self, key: &str) -> DpbResult<bool> {
        let conn = self.connection_mut()?;
        let count: i64 = conn.exists(key).await.map_err(|e| DpbError::db_io("exists", e.to_string()))?;
        Ok(count > 0)
    }

    async fn get_interface_oid_map(&mut self) -> DpbResult<(HashMap<String, String>, HashMap<String, String>)> {
        let conn = self.connection_mut()?;
        let ports: HashMap<String, String> = conn
            .hgetall(PORT_NAME_MAP_KEY)
            .await
            .map_err(|e| DpbError::db_io("get_interface_oid_map", e.to_string()))?;
        let queues: HashMap<String, String> = conn
            .hgetall(QUEUE_NAME_MAP_KEY)
            .await
            .map_err(|e| DpbError::db_io("get_interface_oid_map", e.to_string()))?;
        Ok((ports, queues))
    }
}
