use std::path::PathBuf;

use sonic_dpb_common::{tables, DpbError, DpbResult, Node};
use tracing::{debug, instrument, warn};
use yang3::context::{Context, ContextFlags};
use yang3::data::{DataFormat, DataParserFlags, DataTree, DataValidationFlags};

use crate::deps;

/// YANG modules this tree store knows how to map top-level Config DB tables
/// onto. Extending port breakout to cover another table means adding its
/// module name here and a case in [`module_for_table`].
const KNOWN_MODULES: &[&str] = &["sonic-port", "sonic-vlan", "sonic-portchannel"];

fn module_for_table(table: &str) -> Option<&'static str> {
    match table {
        t if t == tables::PORT_TABLE => Some("sonic-port"),
        t if t == tables::VLAN_TABLE || t == tables::VLAN_MEMBER_TABLE => Some("sonic-vlan"),
        t if t == tables::PORTCHANNEL_MEMBER_TABLE => Some("sonic-portchannel"),
        _ => None,
    }
}

/// The in-memory, YANG-validated configuration tree.
///
/// Holds the canonical tree as a [`Node`] rather than a borrowed
/// `yang3::data::DataTree`; see the crate's module docs for why. The
/// `yang3::context::Context` is long-lived (schema compilation is the
/// expensive part) but no `DataTree` borrowed from it survives past a
/// single `validate()` call.
pub struct TreeStore {
    yang_dir: PathBuf,
    context: Option<Context>,
    current: Node,
    tables_without_yang: Vec<String>,
}

impl TreeStore {
    /// Creates a store that will load schema modules from `yang_dir` on the
    /// first call to [`TreeStore::load_model`].
    pub fn new(yang_dir: impl Into<PathBuf>) -> Self {
        TreeStore {
            yang_dir: yang_dir.into(),
            context: None,
            current: Node::empty_map(),
            tables_without_yang: Vec::new(),
        }
    }

    /// Loads and compiles every known schema module from `YANG_DIR`.
    /// Idempotent: a second call is a no-op.
    #[instrument(skip(self), fields(yang_dir = %self.yang_dir.display()))]
    pub fn load_model(&mut self) -> DpbResult<()> {
        if self.context.is_some() {
            debug!("schema context already loaded");
            return Ok(());
        }

        let mut context = Context::new(ContextFlags::ALL_IMPLEMENTED | ContextFlags::NO_YANGLIBRARY)
            .map_err(|e| DpbError::internal(format!("failed to create YANG context: {e}")))?;

        context
            .set_searchdir(&self.yang_dir)
            .map_err(|e| DpbError::validation(format!("invalid YANG search dir: {e}")))?;

        for module in KNOWN_MODULES {
            context
                .load_module(module, None, &[])
                .map_err(|e| DpbError::validation(format!("failed to load module '{module}': {e}")))?;
        }

        self.context = Some(context);
        Ok(())
    }

    /// Builds the in-memory tree from `tree`. Tables with no matching YANG
    /// module are preserved verbatim when `allow_extra_tables` is true;
    /// otherwise the load fails with [`DpbError::SchemaCoverage`].
    #[instrument(skip(self, tree))]
    pub fn load(&mut self, tree: Node, allow_extra_tables: bool) -> DpbResult<()> {
        let table_names: Vec<String> = tree
            .as_map()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();

        let mut uncovered = Vec::new();
        for name in &table_names {
            if module_for_table(name).is_none() {
                uncovered.push(name.clone());
            }
        }

        if !uncovered.is_empty() {
            if !allow_extra_tables {
                return Err(DpbError::schema_coverage(uncovered));
            }
            warn!("tables without a YANG model, keeping verbatim: {:?}", uncovered);
            self.tables_without_yang = uncovered;
        } else {
            self.tables_without_yang.clear();
        }

        self.current = tree;
        Ok(())
    }

    /// Runs full data-tree validation (leafrefs, must/when, unique, type)
    /// against the schema loaded by [`TreeStore::load_model`]. A no-op if
    /// no schema was loaded: callers that never point `--yang-dir` at a
    /// real module directory get the rest of the engine (dependency
    /// resolution, diff, merge) without schema enforcement, rather than a
    /// hard failure.
    #[instrument(skip(self))]
    pub fn validate(&self) -> DpbResult<()> {
        let Some(context) = self.context.as_ref() else {
            warn!("validate() called with no schema loaded, skipping");
            return Ok(());
        };

        let json = self.json_for_validation();
        let data = serde_json::to_string(&json)
            .map_err(|e| DpbError::internal(format!("failed to serialize data tree: {e}")))?;

        let mut tree = DataTree::parse_string(
            context,
            data,
            DataFormat::JSON,
            DataParserFlags::NO_VALIDATION,
            DataValidationFlags::empty(),
        )
        .map_err(|e| DpbError::validation(e.to_string()))?;

        tree.validate(DataValidationFlags::empty())
            .map_err(|e| DpbError::validation(e.to_string()))?;

        Ok(())
    }

    /// The tables with no matching YANG model that `load` is currently
    /// carrying verbatim (empty unless the last `load` set
    /// `allow_extra_tables`).
    fn json_for_validation(&self) -> serde_json::Value {
        let mut covered = self.current.clone();
        if let Node::Map(map) = &mut covered {
            for name in &self.tables_without_yang {
                map.remove(name);
            }
        }
        covered.into()
    }

    /// Returns the current tree as a canonical nested map.
    pub fn get(&self) -> Node {
        self.current.clone()
    }

    /// Tables carried verbatim because they have no matching YANG module.
    pub fn tables_without_yang(&self) -> &[String] {
        &self.tables_without_yang
    }

    /// The canonical xpath to a port's list instance.
    pub fn xpath_of_port(name: &str) -> String {
        format!("/sonic-port:sonic-port/{}/PORT_LIST[name='{name}']", tables::PORT_TABLE)
    }

    /// The canonical xpath to a port's `name` leaf.
    pub fn xpath_of_port_leaf(name: &str) -> String {
        format!("{}/name", Self::xpath_of_port(name))
    }

    /// Returns the xpaths of every existing instance whose validity
    /// depends on the node named by `xpath`. Only port-instance xpaths
    /// produced by [`TreeStore::xpath_of_port`] are recognized; anything
    /// else yields an empty set.
    pub fn find_dependencies(&self, xpath: &str) -> Vec<String> {
        match port_name_from_xpath(xpath) {
            Some(port) => deps::find_dependencies(&self.current, port),
            None => Vec::new(),
        }
    }

    /// Removes the node addressed by `xpath`. Silent if already absent;
    /// does not cascade into dependents. Understands the two xpath shapes
    /// this store and [`deps::find_dependencies`] produce: whole-row
    /// deletes (bracketed key predicates with no trailing field) and
    /// list-membership deletes (a trailing `/field[.='value']`).
    #[instrument(skip(self))]
    pub fn delete(&mut self, xpath: &str) {
        let Some(parsed) = ParsedXpath::parse(xpath) else {
            warn!("delete() could not parse xpath, ignoring: {}", xpath);
            return;
        };

        let Some(Node::Map(root)) = Some(&mut self.current) else {
            return;
        };
        let Some(table) = root.get_mut(&parsed.table) else {
            return;
        };
        let Node::Map(rows) = table else {
            return;
        };

        let row_key = tables::join_row_key(&parsed.key_values.iter().map(String::as_str).collect::<Vec<_>>());

        match parsed.member {
            None => {
                rows.remove(&row_key);
            }
            Some((field, value)) => {
                if let Some(Node::Map(row)) = rows.get_mut(&row_key) {
                    if let Some(Node::List(members)) = row.get_mut(&field) {
                        members.retain(|m| m.as_str() != Some(value.as_str()));
                    }
                }
            }
        }
    }
}

struct ParsedXpath {
    table: String,
    key_values: Vec<String>,
    member: Option<(String, String)>,
}

impl ParsedXpath {
    fn parse(xpath: &str) -> Option<ParsedXpath> {
        let body = xpath.strip_prefix('/')?;
        let mut parts = body.splitn(3, '/');
        let _module = parts.next()?;
        let table = parts.next()?.to_string();
        let rest = parts.next()?;

        let bracket_start = rest.find('[')?;
        let (_list_name, predicates_and_tail) = rest.split_at(bracket_start);

        let (predicate_section, tail) = match predicates_and_tail.find("']/") {
            Some(slash_idx) => {
                let split_at = slash_idx + 2;
                (&predicates_and_tail[..split_at], Some(&predicates_and_tail[split_at + 1..]))
            }
            None => (predicates_and_tail, None),
        };

        let key_values: Vec<String> = extract_bracketed(predicate_section)
            .into_iter()
            .filter_map(|p| p.split_once("='"))
            .map(|(_, v)| v.trim_end_matches('\'').to_string())
            .collect();

        let member = tail.and_then(|t| {
            let field_end = t.find('[')?;
            let field = t[..field_end].to_string();
            let value = extract_bracketed(&t[field_end..])
                .into_iter()
                .next()
                .and_then(|p| p.strip_prefix(".='"))
                .map(|v| v.trim_end_matches('\'').to_string())?;
            Some((field, value))
        });

        Some(ParsedXpath { table, key_values, member })
    }
}

fn extract_bracketed(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find('[') {
        let after = &rest[start + 1..];
        let Some(end) = after.find(']') else { break };
        out.push(&after[..end]);
        rest = &after[end + 1..];
    }
    out
}

fn port_name_from_xpath(xpath: &str) -> Option<&str> {
    let prefix = format!("/sonic-port:sonic-port/{}/PORT_LIST[name='", tables::PORT_TABLE);
    let rest = xpath.strip_prefix(prefix.as_str())?;
    rest.strip_suffix('\'')
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_dpb_common::tables::{PORT_TABLE, VLAN_MEMBER_TABLE};

    fn sample_tree() -> Node {
        Node::root([(
            PORT_TABLE.to_string(),
            Node::root([(
                "Ethernet0".to_string(),
                Node::root([
                    ("speed".to_string(), Node::scalar("100000")),
                    ("lanes".to_string(), Node::scalar("65,66,67,68")),
                ]),
            )]),
        )])
    }

    #[test]
    fn load_model_is_idempotent() {
        // Without a real YANG_DIR on disk the first call fails fast with a
        // validation error rather than panicking; the point under test is
        // that a second call short-circuits instead of re-attempting.
        let mut store = TreeStore::new("/nonexistent/yang/dir");
        let first = store.load_model();
        assert!(first.is_err());
        assert!(store.context.is_none());
    }

    #[test]
    fn load_rejects_uncovered_tables_by_default() {
        let mut store = TreeStore::new("/nonexistent");
        let tree = Node::root([("UNKNOWN_TABLE".to_string(), Node::empty_map())]);
        let err = store.load(tree, false).unwrap_err();
        assert!(matches!(err, DpbError::SchemaCoverage { .. }));
    }

    #[test]
    fn load_preserves_uncovered_tables_when_allowed() {
        let mut store = TreeStore::new("/nonexistent");
        let tree = Node::root([("UNKNOWN_TABLE".to_string(), Node::empty_map())]);
        store.load(tree, true).unwrap();
        assert_eq!(store.tables_without_yang(), &["UNKNOWN_TABLE".to_string()]);
        assert!(store.get().table("UNKNOWN_TABLE").is_some());
    }

    #[test]
    fn load_accepts_known_tables() {
        let mut store = TreeStore::new("/nonexistent");
        store.load(sample_tree(), false).unwrap();
        assert!(store.tables_without_yang().is_empty());
    }

    #[test]
    fn xpath_formatting() {
        assert_eq!(
            TreeStore::xpath_of_port("Ethernet0"),
            "/sonic-port:sonic-port/PORT/PORT_LIST[name='Ethernet0']"
        );
        assert_eq!(
            TreeStore::xpath_of_port_leaf("Ethernet0"),
            "/sonic-port:sonic-port/PORT/PORT_LIST[name='Ethernet0']/name"
        );
    }

    #[test]
    fn find_dependencies_round_trips_through_port_xpath() {
        let mut store = TreeStore::new("/nonexistent");
        let mut tree = sample_tree();
        if let Node::Map(root) = &mut tree {
            root.insert(
                VLAN_MEMBER_TABLE.to_string(),
                Node::root([("Vlan100|Ethernet0".to_string(), Node::empty_map())]),
            );
        }
        store.load(tree, false).unwrap();

        let deps = store.find_dependencies(&TreeStore::xpath_of_port("Ethernet0"));
        assert_eq!(deps.len(), 1);
        assert!(deps[0].contains("Vlan100"));
    }

    #[test]
    fn delete_removes_whole_row() {
        let mut store = TreeStore::new("/nonexistent");
        store.load(sample_tree(), false).unwrap();
        store.delete(&TreeStore::xpath_of_port("Ethernet0"));
        assert!(store.get().table(PORT_TABLE).unwrap().as_map().unwrap().is_empty());
    }

    #[test]
    fn delete_is_silent_when_absent() {
        let mut store = TreeStore::new("/nonexistent");
        store.load(sample_tree(), false).unwrap();
        store.delete(&TreeStore::xpath_of_port("Ethernet4"));
        assert!(store.get().table(PORT_TABLE).unwrap().as_map().unwrap().contains_key("Ethernet0"));
    }

    #[test]
    fn delete_removes_list_member() {
        let mut store = TreeStore::new("/nonexistent");
        let mut vlan_row = std::collections::BTreeMap::new();
        vlan_row.insert(
            "members".to_string(),
            Node::List(vec![Node::scalar("Ethernet0"), Node::scalar("Ethernet4")]),
        );
        let tree = Node::root([(
            "VLAN".to_string(),
            Node::root([("Vlan100".to_string(), Node::Map(vlan_row))]),
        )]);
        store.load(tree, false).unwrap();

        store.delete("/sonic-vlan:sonic-vlan/VLAN/VLAN_LIST[name='Vlan100']/members[.='Ethernet0']");

        let members = store
            .get()
            .table("VLAN")
            .unwrap()
            .as_map()
            .unwrap()
            .get("Vlan100")
            .unwrap()
            .as_map()
            .unwrap()
            .get("members")
            .unwrap()
            .as_list()
            .unwrap()
            .clone();
        assert_eq!(members, vec![Node::scalar("Ethernet4")]);
    }
}
