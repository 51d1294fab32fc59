//! Config DB table-name and field-name constants touched by the port
//! breakout engine, and the composite-row-key convention those tables use.
//!
//! Mirrors the `tables` module each `*mgrd` crate in this workspace keeps
//! next to its manager (see `sonic-portmgrd::tables`), trimmed to the
//! tables dynamic port breakout actually reads or writes.

/// The physical/logical port table.
pub const PORT_TABLE: &str = "PORT";

/// VLAN definitions.
pub const VLAN_TABLE: &str = "VLAN";

/// VLAN-to-port membership, keyed `<vlan>|<port>`.
pub const VLAN_MEMBER_TABLE: &str = "VLAN_MEMBER";

/// Port-channel (LAG) membership, keyed `<portchannel>|<port>`.
pub const PORTCHANNEL_MEMBER_TABLE: &str = "PORTCHANNEL_MEMBER";

/// Field names within `PORT` rows.
pub mod fields {
    pub const ADMIN_STATUS: &str = "admin_status";
    pub const SPEED: &str = "speed";
    pub const LANES: &str = "lanes";
    pub const ALIAS: &str = "alias";
    pub const INDEX: &str = "index";
    pub const DESCRIPTION: &str = "description";
}

/// Splits a Config DB composite row key on the `|` separator used for
/// multi-field primary keys (e.g. `Vlan100|Ethernet0`).
pub fn split_row_key(key: &str) -> Vec<&str> {
    key.split('|').collect()
}

/// Joins row key components back into Config DB's `|`-separated form.
pub fn join_row_key(parts: &[&str]) -> String {
    parts.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_join_round_trip() {
        let key = "Vlan100|Ethernet0";
        let parts = split_row_key(key);
        assert_eq!(parts, vec!["Vlan100", "Ethernet0"]);
        assert_eq!(join_row_key(&parts), key);
    }

    #[test]
    fn exact_match_key_has_one_part() {
        assert_eq!(split_row_key("Ethernet0"), vec!["Ethernet0"]);
    }
}
