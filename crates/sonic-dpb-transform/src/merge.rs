//! Structural deep-merge of two trees.
//!
//! `merge(d1, d2, unique_keys)` folds `d2` into `d1` in place: shared map
//! keys recurse, shared list keys concatenate without dedup, shared scalar
//! keys keep `d1`'s value (first writer wins), and keys only in `d2` are
//! copied in only when `unique_keys` is true. Incompatible shapes at the
//! same path (map vs. list, or either vs. a scalar) fail with
//! [`DpbError::MergeShape`].

use sonic_dpb_common::{DpbError, DpbResult, Node};

/// Merges `d2` into `d1` in place. See module docs for the per-shape rules.
pub fn merge(d1: &mut Node, d2: &Node, unique_keys: bool) -> DpbResult<()> {
    merge_at(d1, d2, unique_keys, "")
}

fn merge_at(d1: &mut Node, d2: &Node, unique_keys: bool, path: &str) -> DpbResult<()> {
    match (d1, d2) {
        (Node::Map(m1), Node::Map(m2)) => {
            for (key, v2) in m2 {
                let child_path = format!("{path}/{key}");
                match m1.get_mut(key) {
                    Some(v1) => merge_at(v1, v2, unique_keys, &child_path)?,
                    None if unique_keys => {
                        m1.insert(key.clone(), v2.clone());
                    }
                    None => {}
                }
            }
            Ok(())
        }
        (Node::List(l1), Node::List(l2)) => {
            l1.extend(l2.iter().cloned());
            Ok(())
        }
        (Node::Scalar(_), Node::Scalar(_)) => Ok(()),
        (Node::Map(_), Node::List(_)) | (Node::List(_), Node::Map(_)) => {
            Err(DpbError::merge_shape(path, "map vs list"))
        }
        _ => Err(DpbError::merge_shape(path, "scalar vs container")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_dpb_common::Node;

    fn port_row(fields: &[(&str, &str)]) -> Node {
        Node::root(fields.iter().map(|(k, v)| (k.to_string(), Node::scalar(*v))))
    }

    #[test]
    fn merging_empty_is_a_no_op() {
        let mut d1 = Node::root([("PORT".to_string(), port_row(&[("speed", "25000")]))]);
        let before = d1.clone();
        merge(&mut d1, &Node::empty_map(), true).unwrap();
        assert_eq!(d1, before);
    }

    #[test]
    fn scalar_collision_keeps_d1_first_writer_wins() {
        let mut d1 = port_row(&[("speed", "25000")]);
        let d2 = port_row(&[("speed", "50000")]);
        merge(&mut d1, &d2, true).unwrap();
        assert_eq!(d1.as_map().unwrap().get("speed"), Some(&Node::scalar("25000")));
    }

    #[test]
    fn new_keys_only_copied_when_unique_keys_true() {
        let mut d1 = port_row(&[("speed", "25000")]);
        let d2 = port_row(&[("mtu", "9100")]);

        let mut refused = d1.clone();
        merge(&mut refused, &d2, false).unwrap();
        assert!(refused.as_map().unwrap().get("mtu").is_none());

        merge(&mut d1, &d2, true).unwrap();
        assert_eq!(d1.as_map().unwrap().get("mtu"), Some(&Node::scalar("9100")));
    }

    #[test]
    fn lists_concatenate_without_dedup() {
        let mut d1 = Node::List(vec![Node::scalar("Ethernet0")]);
        let d2 = Node::List(vec![Node::scalar("Ethernet0"), Node::scalar("Ethernet4")]);
        merge(&mut d1, &d2, true).unwrap();
        assert_eq!(
            d1,
            Node::List(vec![Node::scalar("Ethernet0"), Node::scalar("Ethernet0"), Node::scalar("Ethernet4")])
        );
    }

    #[test]
    fn incompatible_shapes_fail() {
        let mut d1 = Node::empty_map();
        let d2 = Node::empty_list();
        let err = merge(&mut d1, &d2, true).unwrap_err();
        assert!(matches!(err, DpbError::MergeShape { .. }));
    }

    #[test]
    fn nested_maps_recurse() {
        let mut d1 = Node::root([("PORT".to_string(), port_row(&[("speed", "25000")]))]);
        let d2 = Node::root([("PORT".to_string(), port_row(&[("mtu", "9100")]))]);
        merge(&mut d1, &d2, true).unwrap();
        let port = d1.table("PORT").unwrap().as_map().unwrap();
        assert_eq!(port.get("speed"), Some(&Node::scalar("25000")));
        assert_eq!(port.get("mtu"), Some(&Node::scalar("9100")));
    }

    #[test]
    fn idempotent_self_merge_without_lists() {
        let d = Node::root([("PORT".to_string(), port_row(&[("speed", "25000"), ("mtu", "9100")]))]);
        let mut merged = d.clone();
        merge(&mut merged, &d, true).unwrap();
        assert_eq!(merged, d);
    }
}
