//! Pool of panel slots.
//!
//! Every slot observes the same inbound stream and self-filters through
//! the identity router. Broadcasts without a player are rewritten to the
//! local player before fan-out, and show commands reassign the addressed
//! slot when its owner changed.

use crate::network::events::ServerEvent;

use super::lifecycle::Outbound;
use super::Panel;

pub struct PanelPool {
    local_player: Option<String>,
    slots: Vec<Box<dyn Panel>>,
}

impl PanelPool {
    pub fn new() -> Self {
        Self {
            local_player: None,
            slots: Vec::new(),
        }
    }

    pub fn set_local_player(&mut self, player: &str) {
        self.local_player = Some(player.to_string());
    }

    pub fn add_slot(&mut self, panel: Box<dyn Panel>) {
        self.slots.push(panel);
    }

    pub fn slot(&self, panel_id: &str) -> Option<&dyn Panel> {
        self.slots
            .iter()
            .find(|slot| slot.panel_id() == panel_id)
            .map(|slot| slot.as_ref())
    }

    pub fn slot_mut(&mut self, panel_id: &str) -> Option<&mut Box<dyn Panel>> {
        self.slots.iter_mut().find(|slot| slot.panel_id() == panel_id)
    }

    /// Route one decoded event to the pool.
    pub fn dispatch(&mut self, event: &ServerEvent, now: f64) {
        let event = self.localize(event);

        // A show command may hand the slot to a new owner before the slots
        // run their own routing.
        if let ServerEvent::ShowPanel {
            player: Some(player),
            panel_id,
        } = &event
        {
            for slot in &mut self.slots {
                let addressed = panel_id
                    .as_deref()
                    .map_or(true, |id| id == slot.panel_id());
                if addressed && slot.owner() != Some(player.as_str()) {
                    slot.assign(player);
                }
            }
        }

        for slot in &mut self.slots {
            slot.handle_event(&event, now);
        }
    }

    /// Broadcast list payloads carry no player; forward them to the local
    /// player so identity routing can address a slot.
    fn localize(&self, event: &ServerEvent) -> ServerEvent {
        let mut event = event.clone();
        match &mut event {
            ServerEvent::RewardsList { player, .. } | ServerEvent::ShopList { player, .. }
                if player.is_none() =>
            {
                *player = self.local_player.clone();
            }
            _ => {}
        }
        event
    }

    pub fn tick(&mut self, now: f64) {
        for slot in &mut self.slots {
            slot.tick(now);
        }
    }

    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        self.slots
            .iter_mut()
            .flat_map(|slot| slot.take_outbound())
            .collect()
    }
}

impl Default for PanelPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanelConfig;
    use crate::network::events::{PurchaseResult, ServerEvent};
    use crate::network::messages::ClientMessage;
    use crate::panel::rewards::{RewardsMetadata, RewardsPanel};
    use crate::panel::shop::{CatalogItem, ShopMetadata, ShopPanel};

    fn pool() -> PanelPool {
        let config = PanelConfig::default();
        let mut pool = PanelPool::new();
        pool.set_local_player("p1");
        pool.add_slot(Box::new(RewardsPanel::new("daily", &config)));
        pool.add_slot(Box::new(ShopPanel::new("shop", &config)));
        pool
    }

    fn show(panel_id: &str, player: &str) -> ServerEvent {
        ServerEvent::ShowPanel {
            player: Some(player.to_string()),
            panel_id: Some(panel_id.to_string()),
        }
    }

    #[test]
    fn test_show_command_assigns_and_reveals_slot() {
        let mut pool = pool();
        pool.dispatch(&show("shop", "p1"), 0.0);

        let shop = pool.slot("shop").unwrap();
        assert_eq!(shop.owner(), Some("p1"));
        assert!(shop.is_visible());
        // The other slot is untouched
        let daily = pool.slot("daily").unwrap();
        assert!(daily.owner().is_none());
        assert!(!daily.is_visible());

        // Assignment kicked off the shop's content requests
        let outbound = pool.drain_outbound();
        assert!(outbound.iter().any(|o| matches!(
            o,
            Outbound::Request(ClientMessage::RequestShopList { .. })
        )));
    }

    #[test]
    fn test_show_command_reassigns_on_owner_change() {
        let mut pool = pool();
        pool.dispatch(&show("shop", "p1"), 0.0);
        pool.drain_outbound();

        pool.dispatch(&show("shop", "p2"), 1.0);
        let shop = pool.slot("shop").unwrap();
        assert_eq!(shop.owner(), Some("p2"));
        // Fresh content requests for the new owner
        assert!(pool.drain_outbound().iter().any(|o| matches!(
            o,
            Outbound::Request(ClientMessage::RequestShopList { player, .. }) if player == "p2"
        )));
    }

    #[test]
    fn test_hide_command_routes_by_identity() {
        let mut pool = pool();
        pool.dispatch(&show("shop", "p1"), 0.0);
        pool.dispatch(&show("daily", "p1"), 0.0);
        pool.drain_outbound();

        pool.dispatch(
            &ServerEvent::HidePanel {
                player: Some("p1".into()),
                panel_id: Some("shop".into()),
            },
            1.0,
        );
        assert!(!pool.slot("shop").unwrap().is_visible());
        assert!(pool.slot("daily").unwrap().is_visible());

        // Wildcard id hides every panel of the player
        pool.dispatch(
            &ServerEvent::HidePanel {
                player: Some("p1".into()),
                panel_id: None,
            },
            2.0,
        );
        assert!(!pool.slot("daily").unwrap().is_visible());
    }

    #[test]
    fn test_event_for_other_player_mutates_nothing() {
        let mut pool = pool();
        pool.dispatch(&show("shop", "p1"), 0.0);
        pool.drain_outbound();

        pool.dispatch(
            &ServerEvent::Receipt {
                player: Some("p2".into()),
                panel_id: Some("shop".into()),
                seq: None,
                sku: "bundle".into(),
                result: PurchaseResult::PendingCheckoutFlow,
            },
            1.0,
        );
        // A PendingCheckoutFlow receipt would hide the panel if it were
        // applied; it was not.
        assert!(pool.slot("shop").unwrap().is_visible());
    }

    #[test]
    fn test_broadcast_rewrites_to_local_player() {
        let mut pool = pool();
        pool.dispatch(&show("shop", "p1"), 0.0);
        pool.drain_outbound();

        let shop_list = |player: Option<&str>| ServerEvent::ShopList {
            player: player.map(str::to_string),
            panel_id: Some("shop".into()),
            seq: None,
            metadata: ShopMetadata {
                shop_id: "general".into(),
                title: "General Store".into(),
            },
            items: vec![CatalogItem {
                sku: "torch".into(),
                quantity: 1,
                price_hard: 5,
                price_soft: None,
                thumbnail: "icons/torch".into(),
                validated: true,
            }],
            currencies: Vec::new(),
        };

        match pool.localize(&shop_list(None)) {
            ServerEvent::ShopList { player, .. } => {
                assert_eq!(player.as_deref(), Some("p1"));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        // Events that already carry a player pass through untouched
        match pool.localize(&shop_list(Some("p2"))) {
            ServerEvent::ShopList { player, .. } => {
                assert_eq!(player.as_deref(), Some("p2"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_broadcast_without_local_player_is_dropped() {
        let config = PanelConfig::default();
        let mut pool = PanelPool::new();
        pool.add_slot(Box::new(RewardsPanel::new("daily", &config)));

        pool.dispatch(
            &ServerEvent::RewardsList {
                player: None,
                panel_id: Some("daily".into()),
                seq: None,
                metadata: RewardsMetadata::default(),
                rewards: Vec::new(),
            },
            0.0,
        );
        // No local player to rewrite to, and the slot is unassigned:
        // nothing reacts
        assert!(pool.drain_outbound().is_empty());
    }
}
