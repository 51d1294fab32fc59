//! Dynamic port breakout transaction orchestrator (C5).
//!
//! `DpbTransaction::break_out` drives one switch through the state machine
//! described in the crate's module docs below: plan the delete, validate it,
//! plan the add, validate that, shut the ports down, write the delete, wait
//! for the ASIC to release them, then write the add. Modeled as a stateful
//! manager struct with an explicit constructor and `#[instrument]`-ed async
//! methods, rather than a bag of free functions.

use std::collections::BTreeMap;
use std::time::Duration;

use sonic_dpb_common::{tables, DpbError, DpbResult, Node};
use sonic_dpb_db::{AsicDbClient, ConfigDbClient};
use sonic_dpb_transform::{delta, search_keys};
use sonic_yang_tree::TreeStore;
use tracing::{debug, error, info, instrument};

/// Seconds to wait for the ASIC to release deleted ports before declaring
/// the transaction critically failed.
const MAX_WAIT_SECS: u64 = 60;

/// A single dynamic port breakout transaction. Owns its collaborators for
/// the duration of one [`DpbTransaction::break_out`] call; not meant to be
/// reused across transactions (only one transaction runs against a switch
/// at a time).
pub struct DpbTransaction<C: ConfigDbClient, A: AsicDbClient> {
    tree_store: TreeStore,
    config_db: C,
    asic_db: A,
    defaults: Option<Node>,
}

impl<C: ConfigDbClient, A: AsicDbClient> DpbTransaction<C, A> {
    pub fn new(tree_store: TreeStore, config_db: C, asic_db: A, defaults: Option<Node>) -> Self {
        DpbTransaction {
            tree_store,
            config_db,
            asic_db,
            defaults,
        }
    }

    /// Test-only accessor to the held Config DB client, for asserting on a
    /// fixture's final state after `break_out` returns.
    #[doc(hidden)]
    pub fn config_db_for_test(&self) -> &C {
        &self.config_db
    }

    /// Runs one full breakout transaction. See the module docs for the
    /// state sequence. Returns `Ok(())` only on `DONE`; any `FAILED(*)`
    /// state is surfaced as the matching [`DpbError`] variant.
    #[instrument(skip(self, port_json), fields(del = del_ports.len(), add = add_ports.len(), force))]
    pub async fn break_out(
        &mut self,
        del_ports: &[String],
        add_ports: &[String],
        port_json: &Node,
        force: bool,
        load_defaults: bool,
    ) -> DpbResult<()> {
        info!("INIT: reading current configuration");
        let pre_delete = self.config_db.get_config().await?;
        self.tree_store.load(pre_delete.clone(), true)?;

        info!("DEL_PLAN: resolving dependencies for {:?}", del_ports);
        let mut dependent_xpaths = Vec::new();
        for port in del_ports {
            let xpath = TreeStore::xpath_of_port(port);
            dependent_xpaths.extend(self.tree_store.find_dependencies(&xpath));
        }
        dependent_xpaths.sort();
        dependent_xpaths.dedup();

        if !dependent_xpaths.is_empty() && !force {
            info!("FAILED(Dependencies): {} dependent xpath(s)", dependent_xpaths.len());
            return Err(DpbError::dependencies(dependent_xpaths));
        }

        for dep_xpath in &dependent_xpaths {
            self.tree_store.delete(dep_xpath);
        }
        for port in del_ports {
            self.tree_store.delete(&TreeStore::xpath_of_port(port));
        }

        debug!("DEL_VALIDATE: validating post-delete tree");
        self.tree_store.validate()?;
        let post_delete = self.tree_store.get();

        info!("ADD_PLAN: writing {} new port row(s)", add_ports.len());
        let mut config_out = post_delete.clone();
        overwrite_port_rows(&mut config_out, add_ports, port_json)?;
        if load_defaults {
            if let Some(defaults) = &self.defaults {
                let (port_defaults, found) = search_keys(defaults, add_ports);
                if found {
                    merge_defaults_without_new_tables(&mut config_out, &port_defaults)?;
                } else {
                    debug!("no defaults entries matched {:?}", add_ports);
                }
            }
        }

        debug!("ADD_VALIDATE: validating post-add tree");
        self.tree_store.load(config_out.clone(), true)?;
        self.tree_store.validate()?;

        debug!("capturing Asic DB oid map before any write, per port deletion retires the name lookup");
        let (port_oids, _queue_oids) = self.asic_db.get_interface_oid_map().await?;
        let asic_keys: Vec<String> = del_ports
            .iter()
            .filter_map(|port| port_oids.get(port))
            .map(|oid| format!("ASIC_STATE:SAI_OBJECT_TYPE_PORT:oid:{oid}"))
            .collect();

        info!("SHUTDOWN: setting admin_status=down on {:?}", del_ports);
        self.config_db.mod_config(&shutdown_payload(del_ports)).await?;

        info!("WRITE_DEL: applying delete diff");
        if let Some(payload) = delta(&pre_delete, &post_delete) {
            self.config_db.mod_config(&payload).await?;
        }

        info!("ASIC_WAIT: polling for release of {:?}", del_ports);
        self.wait_for_asic_release(del_ports, &asic_keys).await?;

        info!("WRITE_ADD: applying add diff");
        if let Some(payload) = delta(&post_delete, &config_out) {
            self.config_db.mod_config(&payload).await?;
        }

        info!("DONE");
        Ok(())
    }

    async fn wait_for_asic_release(&mut self, del_ports: &[String], asic_keys: &[String]) -> DpbResult<()> {
        for _ in 0..MAX_WAIT_SECS {
            let mut all_released = true;
            for key in asic_keys {
                if self.asic_db.exists(key).await? {
                    all_released = false;
                    break;
                }
            }
            if all_released {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        error!(critical = true, "ASIC did not release ports within {}s: {:?}", MAX_WAIT_SECS, del_ports);
        Err(DpbError::asic_not_converged(del_ports.to_vec()))
    }
}

/// Overwrites `config_out`'s `PORT` table rows for `add_ports` with the
/// matching rows from `port_json.PORT`. A port named in `add_ports` with no
/// matching row in `port_json` is an internal error: the caller is required
/// to supply a row for everything it asks to add.
fn overwrite_port_rows(config_out: &mut Node, add_ports: &[String], port_json: &Node) -> DpbResult<()> {
    let source_rows = port_json
        .table(tables::PORT_TABLE)
        .and_then(Node::as_map)
        .ok_or_else(|| DpbError::internal("portJson has no PORT table"))?;

    let root = config_out
        .as_map_mut()
        .ok_or_else(|| DpbError::internal("configOut is not a map"))?;
    let port_table = root
        .entry(tables::PORT_TABLE.to_string())
        .or_insert_with(Node::empty_map);
    let rows = port_table
        .as_map_mut()
        .ok_or_else(|| DpbError::internal("PORT table is not a map"))?;

    for port in add_ports {
        let row = source_rows
            .get(port)
            .ok_or_else(|| DpbError::internal(format!("portJson has no PORT row for '{port}'")))?;
        rows.insert(port.clone(), row.clone());
    }
    Ok(())
}

/// Merges `defaults` into `config_out` one matching top-level table at a
/// time, `uniqueKeys = true` within each table, without introducing a
/// top-level table `config_out` didn't already have.
fn merge_defaults_without_new_tables(config_out: &mut Node, defaults: &Node) -> DpbResult<()> {
    let Some(default_tables) = defaults.as_map() else {
        return Ok(());
    };
    let Some(root) = config_out.as_map_mut() else {
        return Ok(());
    };

    for (table, default_rows) in default_tables {
        if let Some(existing) = root.get_mut(table) {
            sonic_dpb_transform::merge(existing, default_rows, true)?;
        }
    }
    Ok(())
}

fn shutdown_payload(del_ports: &[String]) -> Node {
    let mut rows = BTreeMap::new();
    for port in del_ports {
        rows.insert(
            port.clone(),
            Node::root([(tables::fields::ADMIN_STATUS.to_string(), Node::scalar("down"))]),
        );
    }
    Node::root([(tables::PORT_TABLE.to_string(), Node::Map(rows))])
}
