//! Symmetric JSON diff and Config DB write-payload synthesis.
//!
//! Mirrors `config_mgmt.py`'s `diffJson` (`jsondiff(..., syntax='symmetric')`)
//! for the diff step and `createConfigToLoad`'s `deleteHandler`/
//! `insertHandler`/`recurCreateConfig` trio for synthesis. The diff step
//! produces a tree tagged with `$delete`/`$insert` map keys; a scalar or
//! shape-mismatched replacement at any position is represented as the
//! two-element list `[pre, post]`, following jsondiff's symmetric-syntax
//! convention for a value replace.

use std::collections::BTreeMap;

use sonic_dpb_common::Node;
use tracing::warn;

const DELETE_KEY: &str = "$delete";
const INSERT_KEY: &str = "$insert";

/// Computes the symmetric diff between a pre-image and a post-image tree.
/// Returns `None` if the two trees are equal.
pub fn symmetric_diff(pre: &Node, post: &Node) -> Option<Node> {
    match (pre, post) {
        (Node::Map(p), Node::Map(q)) => diff_maps(p, q),
        (Node::List(p), Node::List(q)) if p.len() == q.len() => diff_equal_lists(p, q),
        _ => {
            if pre == post {
                None
            } else {
                Some(Node::List(vec![pre.clone(), post.clone()]))
            }
        }
    }
}

fn diff_maps(pre: &BTreeMap<String, Node>, post: &BTreeMap<String, Node>) -> Option<Node> {
    let mut deleted = BTreeMap::new();
    let mut inserted = BTreeMap::new();
    let mut out = BTreeMap::new();

    for (k, v) in pre {
        if !post.contains_key(k) {
            deleted.insert(k.clone(), v.clone());
        }
    }
    for (k, v) in post {
        if !pre.contains_key(k) {
            inserted.insert(k.clone(), v.clone());
        }
    }
    for (k, pv) in pre {
        if let Some(qv) = post.get(k) {
            if let Some(d) = symmetric_diff(pv, qv) {
                out.insert(k.clone(), d);
            }
        }
    }

    if !deleted.is_empty() {
        out.insert(DELETE_KEY.to_string(), Node::Map(deleted));
    }
    if !inserted.is_empty() {
        out.insert(INSERT_KEY.to_string(), Node::Map(inserted));
    }

    if out.is_empty() {
        None
    } else {
        Some(Node::Map(out))
    }
}

fn diff_equal_lists(pre: &[Node], post: &[Node]) -> Option<Node> {
    let mut out = Vec::with_capacity(pre.len());
    let mut any = false;
    for (p, q) in pre.iter().zip(post) {
        match symmetric_diff(p, q) {
            Some(d) => {
                any = true;
                out.push(d);
            }
            None => out.push(Node::empty_map()),
        }
    }
    if any {
        Some(Node::List(out))
    } else {
        None
    }
}

/// Synthesizes a Config DB write payload from a symmetric diff plus the two
/// images it was computed from. `null` at a row position means "delete the
/// whole row"; an empty list means "clear this field".
pub fn synthesize_write_payload(diff: &Node, pre: &Node, post: &Node) -> Option<Node> {
    // A replace marker at a position whose post-image is actually a map is
    // a corrupt/impossible diff for this engine (no operation changes a
    // field's shape) rather than an ordinary scalar update; drop it instead
    // of writing garbage.
    if matches!(diff, Node::List(_)) && matches!(post, Node::Map(_)) {
        return None;
    }

    match diff {
        Node::Map(dmap) => {
            let mut config = BTreeMap::new();
            let mut changed = false;
            for (key, dval) in dmap {
                match key.as_str() {
                    DELETE_KEY => {
                        delete_handler(dval, &mut config);
                        changed = true;
                    }
                    INSERT_KEY => {
                        insert_handler(dval, &mut config);
                        changed = true;
                    }
                    _ => {
                        let Some((pv, qv)) = pre.table(key).zip(post.table(key)) else {
                            warn!("diff key '{}' not present on the expected side, skipping", key);
                            continue;
                        };
                        if let Some(child) = synthesize_write_payload(dval, pv, qv) {
                            config.insert(key.clone(), child);
                            changed = true;
                        }
                    }
                }
            }
            if changed {
                Some(Node::Map(config))
            } else {
                None
            }
        }
        Node::List(_) => Some(post.clone()),
        Node::Scalar(_) => None,
    }
}

fn delete_handler(deleted: &Node, config: &mut BTreeMap<String, Node>) {
    let Some(map) = deleted.as_map() else { return };
    for (key, value) in map {
        let sentinel = if value.is_list() { Node::empty_list() } else { Node::null() };
        config.insert(key.clone(), sentinel);
    }
}

fn insert_handler(inserted: &Node, config: &mut BTreeMap<String, Node>) {
    let Some(map) = inserted.as_map() else { return };
    for (key, value) in map {
        config.insert(key.clone(), value.clone());
    }
}

/// Computes the write payload directly from a pre- and post-image,
/// combining [`symmetric_diff`] and [`synthesize_write_payload`].
pub fn delta(pre: &Node, post: &Node) -> Option<Node> {
    let diff = symmetric_diff(pre, post)?;
    synthesize_write_payload(&diff, pre, post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn port_row(fields: &[(&str, &str)]) -> Node {
        Node::root(fields.iter().map(|(k, v)| (k.to_string(), Node::scalar(*v))))
    }

    #[test]
    fn identical_trees_produce_no_diff_and_no_payload() {
        let tree = Node::root([("PORT".to_string(), Node::root([("Ethernet0".to_string(), port_row(&[("speed", "25000")]))]))]);
        assert_eq!(symmetric_diff(&tree, &tree), None);
        assert_eq!(delta(&tree, &tree), None);
    }

    #[test]
    fn row_deletion_becomes_null_sentinel() {
        let pre = Node::root([("PORT".to_string(), Node::root([("Ethernet0".to_string(), port_row(&[("speed", "25000")]))]))]);
        let post = Node::root([("PORT".to_string(), Node::empty_map())]);

        let payload = delta(&pre, &post).unwrap();
        assert_eq!(payload.table("PORT").unwrap().table("Ethernet0"), Some(&Node::null()));
    }

    #[test]
    fn row_insertion_copies_post_image_verbatim() {
        let pre = Node::root([("PORT".to_string(), Node::empty_map())]);
        let new_row = port_row(&[("speed", "25000"), ("lanes", "65")]);
        let post = Node::root([("PORT".to_string(), Node::root([("Ethernet0".to_string(), new_row.clone())]))]);

        let payload = delta(&pre, &post).unwrap();
        assert_eq!(payload.table("PORT").unwrap().table("Ethernet0"), Some(&new_row));
    }

    #[test]
    fn list_field_clear_becomes_empty_list_sentinel() {
        let pre = Node::root([(
            "VLAN".to_string(),
            Node::root([(
                "Vlan100".to_string(),
                Node::root([("members".to_string(), Node::List(vec![Node::scalar("Ethernet0")]))]),
            )]),
        )]);
        let post = Node::root([("VLAN".to_string(), Node::root([("Vlan100".to_string(), Node::empty_map())]))]);

        let payload = delta(&pre, &post).unwrap();
        let vlan100 = payload.table("VLAN").unwrap().table("Vlan100").unwrap();
        assert_eq!(vlan100.as_map().unwrap().get("members"), Some(&Node::empty_list()));
    }

    #[test]
    fn list_value_change_writes_full_post_list() {
        let pre = Node::root([(
            "VLAN".to_string(),
            Node::root([(
                "Vlan100".to_string(),
                Node::root([("members".to_string(), Node::List(vec![Node::scalar("Ethernet0")]))]),
            )]),
        )]);
        let post_members = Node::List(vec![Node::scalar("Ethernet0"), Node::scalar("Ethernet4")]);
        let post = Node::root([(
            "VLAN".to_string(),
            Node::root([("Vlan100".to_string(), Node::root([("members".to_string(), post_members.clone())]))]),
        )]);

        let payload = delta(&pre, &post).unwrap();
        let vlan100 = payload.table("VLAN").unwrap().table("Vlan100").unwrap();
        assert_eq!(vlan100.as_map().unwrap().get("members"), Some(&post_members));
    }

    #[test]
    fn unchanged_sibling_rows_are_pruned_from_payload() {
        let shared = port_row(&[("speed", "25000")]);
        let pre = Node::root([(
            "PORT".to_string(),
            Node::root([
                ("Ethernet0".to_string(), shared.clone()),
                ("Ethernet4".to_string(), port_row(&[("speed", "25000")])),
            ]),
        )]);
        let post = Node::root([(
            "PORT".to_string(),
            Node::root([
                ("Ethernet0".to_string(), shared),
                ("Ethernet4".to_string(), port_row(&[("speed", "50000")])),
            ]),
        )]);

        let payload = delta(&pre, &post).unwrap();
        let port_table = payload.table("PORT").unwrap().as_map().unwrap();
        assert!(!port_table.contains_key("Ethernet0"));
        assert!(port_table.contains_key("Ethernet4"));
    }

    #[test]
    fn scalar_field_update_is_written_at_field_granularity() {
        // A field-level scalar change within an otherwise-identical row is
        // represented as a two-element replace marker in the diff (jsondiff's
        // symmetric-syntax convention), and synthesized into a partial-row
        // patch carrying just the new value.
        let pre = port_row(&[("speed", "25000")]);
        let post = port_row(&[("speed", "50000")]);
        let diff = symmetric_diff(&pre, &post).unwrap();
        assert!(matches!(diff.as_map().unwrap().get("speed"), Some(Node::List(_))));
        let payload = synthesize_write_payload(&diff, &pre, &post).unwrap();
        assert_eq!(payload.as_map().unwrap().get("speed"), Some(&Node::scalar("50000")));
    }

    #[test]
    fn shape_mismatch_replace_at_a_map_post_image_is_dropped() {
        // When a position's pre-image is a scalar but its post-image is a
        // map (a genuinely corrupt/impossible diff for this engine, since
        // no DPB operation changes a field's shape), the replace marker is
        // dropped rather than written, per the tie-break rule.
        let diff = Node::List(vec![Node::scalar("old"), Node::scalar("new")]);
        let post = Node::root([("nested".to_string(), Node::empty_map())]);
        assert_eq!(synthesize_write_payload(&diff, &Node::scalar("old"), &post), None);
    }
}
