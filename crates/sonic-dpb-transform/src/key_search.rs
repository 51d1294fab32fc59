//! Depth-first extraction of per-port subtrees from a defaults tree.
//!
//! Mirrors `config_mgmt.py`'s `searchKeysInConfig`: a key belongs to a port
//! if it matches that port anchored as a key prefix (`<port>|...`), suffix
//! (`...|<port>`), or exact match (`<port>`). A matching key is copied
//! verbatim without descending further — the whole row belongs to the
//! port. A non-matching key is kept only if something further down its
//! subtree matched.

use std::collections::BTreeMap;

use regex::Regex;
use sonic_dpb_common::Node;

/// Builds the anchored alternation pattern for one port, matching
/// `^port|`, `|port$`, and `^port$`.
fn port_pattern(port: &str) -> Regex {
    let escaped = regex::escape(port);
    Regex::new(&format!(r"^{escaped}\||\|{escaped}$|^{escaped}$"))
        .expect("port name produces a valid regex pattern")
}

/// Returns the subtree of `input` that mentions any of `ports`, and whether
/// anything matched at all. An empty `ports` slice always returns `false`.
pub fn search_keys(input: &Node, ports: &[String]) -> (Node, bool) {
    let patterns: Vec<Regex> = ports.iter().map(|p| port_pattern(p)).collect();
    search(input, ports, &patterns)
}

fn search(input: &Node, ports: &[String], patterns: &[Regex]) -> (Node, bool) {
    match input {
        Node::Map(map) => {
            let mut out = BTreeMap::new();
            let mut found = false;
            for (key, value) in map {
                if patterns.iter().any(|re| re.is_match(key)) {
                    out.insert(key.clone(), value.clone());
                    found = true;
                    continue;
                }
                if value.is_scalar() {
                    continue;
                }
                let (child, child_found) = search(value, ports, patterns);
                if child_found {
                    out.insert(key.clone(), child);
                    found = true;
                }
            }
            (Node::Map(out), found)
        }
        Node::List(items) => {
            let mut out = Vec::new();
            let mut found = false;
            for item in items {
                if let Some(s) = item.as_str() {
                    if ports.iter().any(|p| p == s) {
                        out.push(item.clone());
                        found = true;
                    }
                }
            }
            (Node::List(out), found)
        }
        Node::Scalar(_) => (input.clone(), false),
    }
}
