//! Reverse leafref/must-expression lookup for port deletion.
//!
//! Dependency resolution asks the schema for leafrefs and
//! `must`/`when` expressions that target a given xpath, then asking the
//! data tree which instances of those schema nodes actually exist. The
//! schema side of that lookup only ever varies by which tables the YANG
//! models for this switch actually define a `leafref` to `PORT.name` from,
//! and that set is small and stable (`VLAN_MEMBER`, `PORTCHANNEL_MEMBER`,
//! `VLAN.members`). This module hardcodes that relationship table instead
//! of walking compiled schema nodes through the FFI layer, since the
//! `.yang` module content itself is an external asset we never load from a
//! real SONiC schema tree (see the tree store's module docs). The data-tree
//! side of the lookup — which instances exist right now — still walks the
//! live canonical tree.

use sonic_dpb_common::{tables, Node};

/// A table whose row key embeds the port name as one of its `|`-joined
/// components (e.g. `VLAN_MEMBER` keyed `<vlan>|<port>`).
struct KeyDependency {
    module: &'static str,
    table: &'static str,
    list_name: &'static str,
    /// Field names for each `|`-separated key component, in order.
    key_fields: &'static [&'static str],
    /// Index of the component that holds the port name.
    port_key_index: usize,
}

/// A table whose rows hold a list field that may contain the port name as
/// a member (e.g. `VLAN.members`).
struct MemberDependency {
    module: &'static str,
    table: &'static str,
    list_name: &'static str,
    key_field: &'static str,
    member_field: &'static str,
}

const KEY_DEPENDENCIES: &[KeyDependency] = &[
    KeyDependency {
        module: "sonic-vlan",
        table: tables::VLAN_MEMBER_TABLE,
        list_name: "VLAN_MEMBER_LIST",
        key_fields: &["name", "port"],
        port_key_index: 1,
    },
    KeyDependency {
        module: "sonic-portchannel",
        table: tables::PORTCHANNEL_MEMBER_TABLE,
        list_name: "PORTCHANNEL_MEMBER_LIST",
        key_fields: &["name", "port"],
        port_key_index: 1,
    },
];

const MEMBER_DEPENDENCIES: &[MemberDependency] = &[MemberDependency {
    module: "sonic-vlan",
    table: tables::VLAN_TABLE,
    list_name: "VLAN_LIST",
    key_field: "name",
    member_field: "members",
}];

/// Returns the xpaths of every existing instance that depends on `port`.
pub fn find_dependencies(root: &Node, port: &str) -> Vec<String> {
    let mut out = Vec::new();

    for dep in KEY_DEPENDENCIES {
        let Some(table) = root.table(dep.table).and_then(Node::as_map) else {
            continue;
        };
        for key in table.keys() {
            let parts = tables::split_row_key(key);
            if parts.len() != dep.key_fields.len() {
                continue;
            }
            if parts[dep.port_key_index] != port {
                continue;
            }
            out.push(instance_xpath(dep.module, dep.table, dep.list_name, dep.key_fields, &parts));
        }
    }

    for dep in MEMBER_DEPENDENCIES {
        let Some(table) = root.table(dep.table).and_then(Node::as_map) else {
            continue;
        };
        for (key, row) in table {
            let Some(members) = row.as_map().and_then(|m| m.get(dep.member_field)).and_then(Node::as_list) else {
                continue;
            };
            if members.iter().any(|m| m.as_str() == Some(port)) {
                out.push(format!(
                    "/{module}:{module}/{table}/{list}[{key_field}='{key}']/{member_field}[.='{port}']",
                    module = dep.module,
                    table = dep.table,
                    list = dep.list_name,
                    key_field = dep.key_field,
                    member_field = dep.member_field,
                ));
            }
        }
    }

    out
}

fn instance_xpath(
    module: &str,
    table: &str,
    list_name: &str,
    key_fields: &[&str],
    values: &[&str],
) -> String {
    let predicates: String = key_fields
        .iter()
        .zip(values)
        .map(|(field, value)| format!("[{field}='{value}']"))
        .collect();
    format!("/{module}:{module}/{table}/{list_name}{predicates}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_dpb_common::tables::{PORTCHANNEL_MEMBER_TABLE, VLAN_MEMBER_TABLE, VLAN_TABLE};

    fn row(fields: &[(&str, &str)]) -> Node {
        Node::root(fields.iter().map(|(k, v)| (k.to_string(), Node::scalar(*v))))
    }

    #[test]
    fn finds_vlan_member_dependency() {
        let root = Node::root([(
            VLAN_MEMBER_TABLE.to_string(),
            Node::root([("Vlan100|Ethernet0".to_string(), row(&[("tagging_mode", "untagged")]))]),
        )]);
        let deps = find_dependencies(&root, "Ethernet0");
        assert_eq!(deps.len(), 1);
        assert!(deps[0].contains("VLAN_MEMBER_LIST"));
        assert!(deps[0].contains("Vlan100"));
    }

    #[test]
    fn finds_portchannel_member_dependency() {
        let root = Node::root([(
            PORTCHANNEL_MEMBER_TABLE.to_string(),
            Node::root([("PortChannel1|Ethernet4".to_string(), Node::empty_map())]),
        )]);
        let deps = find_dependencies(&root, "Ethernet4");
        assert_eq!(deps.len(), 1);
        assert!(deps[0].contains("PORTCHANNEL_MEMBER_LIST"));
    }

    #[test]
    fn finds_vlan_member_list_dependency() {
        let mut vlan_row = std::collections::BTreeMap::new();
        vlan_row.insert("vlanid".to_string(), Node::scalar("100"));
        vlan_row.insert(
            "members".to_string(),
            Node::List(vec![Node::scalar("Ethernet0"), Node::scalar("Ethernet4")]),
        );
        let root = Node::root([(
            VLAN_TABLE.to_string(),
            Node::root([("Vlan100".to_string(), Node::Map(vlan_row))]),
        )]);
        let deps = find_dependencies(&root, "Ethernet0");
        assert_eq!(deps.len(), 1);
        assert!(deps[0].contains("members"));
        assert!(deps[0].contains("Vlan100"));
    }

    #[test]
    fn no_dependency_for_unreferenced_port() {
        let root = Node::root([(
            VLAN_MEMBER_TABLE.to_string(),
            Node::root([("Vlan100|Ethernet0".to_string(), Node::empty_map())]),
        )]);
        assert!(find_dependencies(&root, "Ethernet8").is_empty());
    }
}
