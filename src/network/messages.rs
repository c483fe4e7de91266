//! Outbound request messages issued by the panels.

use rmpv::Value;
use std::collections::HashMap;

/// Client -> server requests. Every request is tagged with the issuing
/// panel's identity and a correlation token so stale responses can be told
/// apart from the outstanding one.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    RequestRewardsList { player: String, panel_id: String, seq: u64 },
    RequestEventState { player: String, panel_id: String, seq: u64 },
    /// Claims whatever reward the server considers current. The request
    /// deliberately names no reward: the local calendar state is not
    /// authoritative.
    ClaimReward { player: String, panel_id: String, seq: u64 },
    RequestShopList { player: String, panel_id: String, seq: u64 },
    RequestEntitlements { player: String, panel_id: String, seq: u64 },
    Purchase {
        player: String,
        panel_id: String,
        seq: u64,
        sku: String,
        quantity: i64,
    },
}

fn envelope(data: &mut HashMap<String, Value>, player: &str, panel_id: &str, seq: u64) {
    data.insert("playerId".into(), Value::from(player));
    data.insert("panelId".into(), Value::from(panel_id));
    data.insert("seq".into(), Value::from(seq));
}

impl ClientMessage {
    /// Convert the message to room protocol format (type, data).
    pub fn to_protocol(&self) -> (&'static str, HashMap<String, Value>) {
        let mut data = HashMap::new();

        let msg_type = match self {
            ClientMessage::RequestRewardsList { player, panel_id, seq } => {
                envelope(&mut data, player, panel_id, *seq);
                "requestRewardsList"
            }
            ClientMessage::RequestEventState { player, panel_id, seq } => {
                envelope(&mut data, player, panel_id, *seq);
                "requestEventState"
            }
            ClientMessage::ClaimReward { player, panel_id, seq } => {
                envelope(&mut data, player, panel_id, *seq);
                "claimReward"
            }
            ClientMessage::RequestShopList { player, panel_id, seq } => {
                envelope(&mut data, player, panel_id, *seq);
                "requestShopList"
            }
            ClientMessage::RequestEntitlements { player, panel_id, seq } => {
                envelope(&mut data, player, panel_id, *seq);
                "requestEntitlements"
            }
            ClientMessage::Purchase {
                player,
                panel_id,
                seq,
                sku,
                quantity,
            } => {
                envelope(&mut data, player, panel_id, *seq);
                data.insert("sku".into(), Value::from(sku.as_str()));
                data.insert("quantity".into(), Value::from(*quantity));
                "purchase"
            }
        };

        (msg_type, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_fields() {
        let message = ClientMessage::ClaimReward {
            player: "p1".into(),
            panel_id: "daily".into(),
            seq: 7,
        };

        let (msg_type, data) = message.to_protocol();
        assert_eq!(msg_type, "claimReward");
        assert_eq!(data.get("playerId"), Some(&Value::from("p1")));
        assert_eq!(data.get("panelId"), Some(&Value::from("daily")));
        assert_eq!(data.get("seq"), Some(&Value::from(7u64)));
        // A claim never names a reward; the server derives the current day.
        assert!(!data.contains_key("sku"));
    }

    #[test]
    fn test_purchase_names_item() {
        let message = ClientMessage::Purchase {
            player: "p1".into(),
            panel_id: "shop".into(),
            seq: 3,
            sku: "pickaxe_gold".into(),
            quantity: 1,
        };

        let (msg_type, data) = message.to_protocol();
        assert_eq!(msg_type, "purchase");
        assert_eq!(data.get("sku"), Some(&Value::from("pickaxe_gold")));
        assert_eq!(data.get("quantity"), Some(&Value::from(1i64)));
    }
}
