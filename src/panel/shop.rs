//! Item shop panel.
//!
//! Renders the purchasable catalog and runs the purchase flow against
//! server-confirmed entitlements. Affordability of soft-currency items is
//! checked locally for gating only; the server re-checks everything and
//! its receipt decides the outcome.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::config::PanelConfig;
use crate::network::events::{PurchaseResult, ServerEvent};
use crate::network::messages::ClientMessage;
use crate::ui::Node;

use super::feedback::{FeedbackQueue, Popup};
use super::grid::{CellGeometry, GridIndexProxy, GridViewport, GridVirtualizer};
use super::lifecycle::{PanelCore, Signal};
use super::Panel;

/// Soft-currency price: a quantity of another sku the player must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftPrice {
    pub sku: String,
    pub quantity: i64,
}

/// One purchasable catalog entry. Entries with an empty `sku` are
/// disabled/placeholder rows and are filtered before display.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub sku: String,
    pub quantity: i64,
    pub price_hard: i64,
    pub price_soft: Option<SoftPrice>,
    pub thumbnail: String,
    pub validated: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShopMetadata {
    pub shop_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyInfo {
    pub sku: String,
    pub name: String,
    pub thumbnail: String,
}

/// Server-confirmed ownership quantity of a currency/sku.
#[derive(Debug, Clone, PartialEq)]
pub struct Entitlement {
    pub sku: String,
    pub quantity: i64,
}

/// Sparse mirror of server-confirmed balances. Absent skus read as zero.
/// Replaced wholesale on every refresh, never merged and never mutated
/// optimistically from a local click.
#[derive(Debug, Default)]
pub struct EntitlementCache {
    quantities: HashMap<String, i64>,
}

impl EntitlementCache {
    pub fn quantity(&self, sku: &str) -> i64 {
        self.quantities.get(sku).copied().unwrap_or(0)
    }

    pub fn replace_all(&mut self, entitlements: &[Entitlement]) {
        self.quantities = entitlements
            .iter()
            .map(|e| (e.sku.clone(), e.quantity))
            .collect();
    }

    pub fn clear(&mut self) {
        self.quantities.clear();
    }

    /// Hard-currency items are always purchase-attemptable; affordability
    /// for those is enforced server-side.
    pub fn can_afford(&self, item: &CatalogItem) -> bool {
        match &item.price_soft {
            Some(price) => self.quantity(&price.sku) >= price.quantity,
            None => true,
        }
    }
}

pub struct ShopPanel {
    core: PanelCore,
    grid: GridVirtualizer<CatalogItem>,
    metadata: ShopMetadata,
    currencies: Vec<CurrencyInfo>,
    entitlements: EntitlementCache,
    /// Sku of the item whose spinner is showing while a purchase is in
    /// flight.
    spinner_sku: Option<String>,
    /// Correlation token of the outstanding purchase, if any.
    pending_seq: Option<u64>,
    /// Per-item can-be-clicked bindings, refreshed on every busy change.
    interactable: Vec<bool>,
    feedback: FeedbackQueue,
    response_timeout: Option<f64>,
}

impl ShopPanel {
    pub fn new(panel_id: &str, config: &PanelConfig) -> Self {
        Self {
            core: PanelCore::new(panel_id),
            grid: GridVirtualizer::new(CellGeometry {
                width: config.cell.width,
                height: config.cell.height,
                gap: config.cell.gap,
            }),
            metadata: ShopMetadata::default(),
            currencies: Vec::new(),
            entitlements: EntitlementCache::default(),
            spinner_sku: None,
            pending_seq: None,
            interactable: Vec::new(),
            feedback: FeedbackQueue::new(config.popup_duration_secs),
            response_timeout: config.response_timeout_secs,
        }
    }

    pub fn metadata(&self) -> &ShopMetadata {
        &self.metadata
    }

    pub fn currencies(&self) -> &[CurrencyInfo] {
        &self.currencies
    }

    pub fn entitlements(&self) -> &EntitlementCache {
        &self.entitlements
    }

    pub fn grid(&self) -> &GridVirtualizer<CatalogItem> {
        &self.grid
    }

    pub fn spinner_sku(&self) -> Option<&str> {
        self.spinner_sku.as_deref()
    }

    pub fn interactable(&self) -> &[bool] {
        &self.interactable
    }

    pub fn popups(&self) -> &[Popup] {
        self.feedback.popups()
    }

    /// Attempt to purchase the item at `index`. Rejected locally while a
    /// transaction is outstanding or when the item is ineligible; a
    /// rejection sends nothing.
    pub fn purchase(&mut self, index: usize, now: f64) -> bool {
        if self.core.is_busy() {
            debug!("Purchase rejected: panel {} is busy", self.core.panel_id());
            return false;
        }
        let Some(player) = self.core.owner().map(str::to_string) else {
            return false;
        };
        let (sku, quantity) = match self.grid.item(index) {
            Some(item) if self.eligible(item) => (item.sku.clone(), item.quantity),
            _ => return false,
        };

        self.spinner_sku = Some(sku.clone());
        let seq = self.begin_transaction(now);
        let panel_id = self.core.panel_id().to_string();
        self.core.send(ClientMessage::Purchase {
            player,
            panel_id,
            seq,
            sku,
            quantity,
        });
        true
    }

    /// Render one grid cell for the external runtime.
    pub fn render_cell(
        &self,
        proxy: GridIndexProxy,
        override_index: Option<usize>,
        viewport: GridViewport,
    ) -> Option<Node> {
        let busy = self.core.is_busy();
        let spinner_sku = self.spinner_sku.as_deref();
        self.grid.render_with(proxy, override_index, viewport, |item, _index, _total| {
            let mut node = Node::content(
                format!("shop-{}", item.sku),
                item.thumbnail.clone(),
                item.sku.clone(),
            );
            node.label = match &item.price_soft {
                Some(price) => format!("{} {}", price.quantity, price.sku),
                None => item.price_hard.to_string(),
            };
            let owned = self.entitlements.quantity(&item.sku);
            if owned > 0 {
                node.badge = Some(format!("Owned {}", owned));
            }
            node.interactable = !busy && self.eligible(item);
            node.spinner = spinner_sku == Some(item.sku.as_str());
            node
        })
    }

    fn eligible(&self, item: &CatalogItem) -> bool {
        item.validated && !item.sku.is_empty() && self.entitlements.can_afford(item)
    }

    fn send_request(&mut self, make: fn(String, String, u64) -> ClientMessage) {
        let Some(player) = self.core.owner().map(str::to_string) else {
            return;
        };
        let panel_id = self.core.panel_id().to_string();
        let seq = self.core.next_seq();
        self.core.send(make(player, panel_id, seq));
    }

    fn begin_transaction(&mut self, now: f64) -> u64 {
        self.core.set_busy(true, now);
        let seq = self.core.next_seq();
        self.pending_seq = Some(seq);
        self.refresh_interactable();
        seq
    }

    /// Single exit path for every receipt branch: the busy gate always
    /// returns to interactive here, and no spinner survives it.
    fn finish_transaction(&mut self, now: f64) {
        self.core.set_busy(false, now);
        self.pending_seq = None;
        self.spinner_sku = None;
        self.refresh_interactable();
    }

    fn accepts(&self, seq: Option<u64>) -> bool {
        match (seq, self.pending_seq) {
            (Some(s), Some(pending)) => s == pending,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    fn refresh_interactable(&mut self) {
        let busy = self.core.is_busy();
        let flags: Vec<bool> = self
            .grid
            .items()
            .iter()
            .map(|item| !busy && self.eligible(item))
            .collect();
        self.interactable = flags;
    }

    fn handle_receipt(&mut self, seq: Option<u64>, sku: &str, result: PurchaseResult, now: f64) {
        if !self.accepts(seq) {
            debug!("Dropping receipt with stale token");
            return;
        }

        if self.spinner_sku.as_deref() == Some(sku) {
            self.spinner_sku = None;
        }
        self.finish_transaction(now);

        match result {
            PurchaseResult::Success | PurchaseResult::TimedOut => {
                // Provisional success either way: the refreshed
                // entitlements are the source of truth, not the code.
                self.send_request(|player, panel_id, seq| ClientMessage::RequestEntitlements {
                    player,
                    panel_id,
                    seq,
                });

                let (title, icon) = match self.grid.items().iter().find(|i| i.sku == sku) {
                    Some(item) => (item.sku.clone(), item.thumbnail.clone()),
                    None => {
                        warn!("Receipt names unknown catalog item {}", sku);
                        (sku.to_string(), String::new())
                    }
                };
                self.feedback.push(&title, &icon, now);

                if result == PurchaseResult::Success {
                    self.core.signal(Signal::ItemPurchased {
                        sku: sku.to_string(),
                    });
                }
            }

            PurchaseResult::InsufficientFunds
            | PurchaseResult::InvalidItem
            | PurchaseResult::InvalidCost => {
                // Silent at this layer; the cache stays untouched and
                // surfacing the failure is a presentation concern.
                debug!("Purchase of {} rejected: {}", sku, result.as_str());
            }

            PurchaseResult::PendingCheckoutFlow => {
                // An external checkout UI is about to take the screen; the
                // panel must not stay visible underneath it.
                self.hide();
            }
        }
    }
}

impl Panel for ShopPanel {
    fn panel_id(&self) -> &str {
        self.core.panel_id()
    }

    fn owner(&self) -> Option<&str> {
        self.core.owner()
    }

    fn is_visible(&self) -> bool {
        self.core.is_visible()
    }

    fn is_busy(&self) -> bool {
        self.core.is_busy()
    }

    fn assign(&mut self, player: &str) {
        self.core.assign(player);
        self.grid.clear();
        self.metadata = ShopMetadata::default();
        self.currencies.clear();
        self.entitlements.clear();
        self.spinner_sku = None;
        self.pending_seq = None;
        self.interactable.clear();
        self.feedback.clear();

        self.send_request(|player, panel_id, seq| ClientMessage::RequestShopList {
            player,
            panel_id,
            seq,
        });
        self.send_request(|player, panel_id, seq| ClientMessage::RequestEntitlements {
            player,
            panel_id,
            seq,
        });
    }

    fn show(&mut self) {
        self.core.show();
    }

    fn hide(&mut self) {
        self.core.hide();
    }

    fn handle_event(&mut self, event: &ServerEvent, now: f64) {
        let (player, id) = event.addressee();
        if !self.core.identity().is_recipient(player, id) {
            return;
        }

        match event {
            ServerEvent::ShopList { metadata, items, currencies, .. } => {
                let total = items.len();
                let kept: Vec<CatalogItem> =
                    items.iter().filter(|i| !i.sku.is_empty()).cloned().collect();
                if kept.len() < total {
                    debug!(
                        "Filtered {} placeholder entries from shop list",
                        total - kept.len()
                    );
                }
                info!(
                    "Received {} shop items for panel {}",
                    kept.len(),
                    self.core.panel_id()
                );
                self.metadata = metadata.clone();
                self.currencies = currencies.clone();
                self.grid.set_items(kept);
                self.refresh_interactable();
            }

            ServerEvent::Entitlements { entitlements, .. } => {
                self.entitlements.replace_all(entitlements);
                self.refresh_interactable();
            }

            ServerEvent::Receipt { seq, sku, result, .. } => {
                self.handle_receipt(*seq, sku, *result, now);
            }

            ServerEvent::ShowPanel { .. } => self.show(),
            ServerEvent::HidePanel { .. } => self.hide(),

            _ => {}
        }
    }

    fn tick(&mut self, now: f64) {
        self.feedback.tick(now);
        if self.core.busy_timed_out(now, self.response_timeout) {
            warn!(
                "Receipt overdue for panel {}; forcing entitlement refresh",
                self.core.panel_id()
            );
            self.finish_transaction(now);
            self.send_request(|player, panel_id, seq| ClientMessage::RequestEntitlements {
                player,
                panel_id,
                seq,
            });
        }
    }

    fn take_outbound(&mut self) -> Vec<super::Outbound> {
        self.core.take_outbound()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::lifecycle::Outbound;

    fn soft_item(sku: &str, currency: &str, cost: i64) -> CatalogItem {
        CatalogItem {
            sku: sku.to_string(),
            quantity: 1,
            price_hard: 0,
            price_soft: Some(SoftPrice {
                sku: currency.to_string(),
                quantity: cost,
            }),
            thumbnail: format!("icons/{}", sku),
            validated: true,
        }
    }

    fn hard_item(sku: &str, price: i64) -> CatalogItem {
        CatalogItem {
            sku: sku.to_string(),
            quantity: 1,
            price_hard: price,
            price_soft: None,
            thumbnail: format!("icons/{}", sku),
            validated: true,
        }
    }

    fn panel() -> ShopPanel {
        let mut panel = ShopPanel::new("shop", &PanelConfig::default());
        panel.assign("p1");
        panel.take_outbound();
        panel
    }

    fn deliver_items(panel: &mut ShopPanel, items: Vec<CatalogItem>) {
        let event = ServerEvent::ShopList {
            player: Some("p1".into()),
            panel_id: Some("shop".into()),
            seq: None,
            metadata: ShopMetadata::default(),
            items,
            currencies: Vec::new(),
        };
        panel.handle_event(&event, 0.0);
    }

    fn deliver_entitlements(panel: &mut ShopPanel, entitlements: Vec<(&str, i64)>) {
        let event = ServerEvent::Entitlements {
            player: Some("p1".into()),
            panel_id: Some("shop".into()),
            seq: None,
            entitlements: entitlements
                .into_iter()
                .map(|(sku, quantity)| Entitlement {
                    sku: sku.to_string(),
                    quantity,
                })
                .collect(),
        };
        panel.handle_event(&event, 0.0);
    }

    fn deliver_receipt(panel: &mut ShopPanel, sku: &str, result: PurchaseResult, now: f64) {
        let event = ServerEvent::Receipt {
            player: Some("p1".into()),
            panel_id: Some("shop".into()),
            seq: None,
            sku: sku.to_string(),
            result,
        };
        panel.handle_event(&event, now);
    }

    fn requests(outbound: &[Outbound]) -> Vec<&ClientMessage> {
        outbound
            .iter()
            .filter_map(|o| match o {
                Outbound::Request(m) => Some(m),
                Outbound::Signal(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_entitlement_cache_replaces_wholesale() {
        let mut panel = panel();
        deliver_entitlements(&mut panel, vec![("gold", 100), ("gems", 5)]);
        assert_eq!(panel.entitlements().quantity("gold"), 100);
        assert_eq!(panel.entitlements().quantity("gems"), 5);

        // Second refresh omits gems: it must read as 0, not keep 5
        deliver_entitlements(&mut panel, vec![("gold", 80)]);
        assert_eq!(panel.entitlements().quantity("gold"), 80);
        assert_eq!(panel.entitlements().quantity("gems"), 0);
        // Unknown skus default to 0
        assert_eq!(panel.entitlements().quantity("never_seen"), 0);
    }

    #[test]
    fn test_affordability() {
        let mut cache = EntitlementCache::default();
        cache.replace_all(&[Entitlement {
            sku: "gold".into(),
            quantity: 50,
        }]);

        assert!(cache.can_afford(&soft_item("torch", "gold", 50)));
        assert!(!cache.can_afford(&soft_item("pickaxe", "gold", 51)));
        // Hard-currency items are always attemptable
        assert!(cache.can_afford(&hard_item("bundle", 499)));
    }

    #[test]
    fn test_placeholder_entries_filtered() {
        let mut panel = panel();
        let mut placeholder = hard_item("", 0);
        placeholder.sku = String::new();
        deliver_items(
            &mut panel,
            vec![hard_item("bundle", 499), placeholder, soft_item("torch", "gold", 10)],
        );

        assert_eq!(panel.grid().len(), 2);
        assert!(panel.grid().items().iter().all(|i| !i.sku.is_empty()));
    }

    #[test]
    fn test_single_flight_purchase() {
        let mut panel = panel();
        deliver_items(&mut panel, vec![hard_item("bundle", 499), hard_item("crate", 99)]);
        panel.take_outbound();

        assert!(panel.purchase(0, 1.0));
        assert!(panel.is_busy());
        assert_eq!(panel.spinner_sku(), Some("bundle"));
        assert_eq!(requests(&panel.take_outbound()).len(), 1);

        // Second attempt while busy: rejected without a second request
        assert!(!panel.purchase(1, 1.1));
        assert!(panel.is_busy());
        assert!(requests(&panel.take_outbound()).is_empty());
    }

    #[test]
    fn test_purchase_rejected_when_unaffordable() {
        let mut panel = panel();
        deliver_items(&mut panel, vec![soft_item("pickaxe", "gold", 100)]);
        deliver_entitlements(&mut panel, vec![("gold", 99)]);
        panel.take_outbound();

        assert!(!panel.purchase(0, 1.0));
        assert!(!panel.is_busy());
        assert!(requests(&panel.take_outbound()).is_empty());

        // The server-confirmed balance arriving makes it attemptable
        deliver_entitlements(&mut panel, vec![("gold", 100)]);
        assert!(panel.purchase(0, 2.0));
    }

    #[test]
    fn test_every_result_code_clears_busy() {
        for result in [
            PurchaseResult::Success,
            PurchaseResult::InsufficientFunds,
            PurchaseResult::InvalidItem,
            PurchaseResult::InvalidCost,
            PurchaseResult::TimedOut,
            PurchaseResult::PendingCheckoutFlow,
        ] {
            let mut panel = panel();
            deliver_items(&mut panel, vec![hard_item("bundle", 499)]);
            assert!(panel.purchase(0, 1.0));
            assert!(panel.is_busy());

            deliver_receipt(&mut panel, "bundle", result, 2.0);
            assert!(!panel.is_busy(), "busy must clear for {:?}", result);
            assert!(panel.spinner_sku().is_none());
        }
    }

    #[test]
    fn test_success_refreshes_entitlements_and_pops_confirmation() {
        let mut panel = panel();
        deliver_items(&mut panel, vec![hard_item("bundle", 499)]);
        panel.purchase(0, 1.0);
        panel.take_outbound();

        deliver_receipt(&mut panel, "bundle", PurchaseResult::Success, 2.0);

        let outbound = panel.take_outbound();
        assert!(matches!(
            requests(&outbound)[..],
            [ClientMessage::RequestEntitlements { .. }]
        ));
        assert!(outbound.iter().any(|o| matches!(
            o,
            Outbound::Signal(Signal::ItemPurchased { sku }) if sku == "bundle"
        )));
        assert_eq!(panel.popups().len(), 1);
        assert_eq!(panel.popups()[0].icon, "icons/bundle");
    }

    #[test]
    fn test_timed_out_reconciles_via_refetch() {
        let mut panel = panel();
        deliver_items(&mut panel, vec![hard_item("bundle", 499)]);
        panel.purchase(0, 1.0);
        panel.take_outbound();

        deliver_receipt(&mut panel, "bundle", PurchaseResult::TimedOut, 2.0);

        // Treated as provisional success: refetch decides, popup shows,
        // but no purchase telemetry is emitted
        let outbound = panel.take_outbound();
        assert!(matches!(
            requests(&outbound)[..],
            [ClientMessage::RequestEntitlements { .. }]
        ));
        assert!(!outbound
            .iter()
            .any(|o| matches!(o, Outbound::Signal(Signal::ItemPurchased { .. }))));
        assert_eq!(panel.popups().len(), 1);
    }

    #[test]
    fn test_rejection_is_silent() {
        let mut panel = panel();
        deliver_items(&mut panel, vec![soft_item("pickaxe", "gold", 10)]);
        deliver_entitlements(&mut panel, vec![("gold", 10)]);
        panel.purchase(0, 1.0);
        panel.take_outbound();

        deliver_receipt(&mut panel, "pickaxe", PurchaseResult::InsufficientFunds, 2.0);

        assert!(!panel.is_busy());
        assert!(panel.popups().is_empty());
        assert!(requests(&panel.take_outbound()).is_empty());
        // Cache untouched by the rejection
        assert_eq!(panel.entitlements().quantity("gold"), 10);
    }

    #[test]
    fn test_pending_checkout_hides_panel() {
        let mut panel = panel();
        deliver_items(&mut panel, vec![hard_item("bundle", 499)]);
        panel.show();
        assert!(panel.is_visible());
        panel.purchase(0, 1.0);
        panel.take_outbound();

        deliver_receipt(&mut panel, "bundle", PurchaseResult::PendingCheckoutFlow, 2.0);

        assert!(!panel.is_busy());
        assert!(!panel.is_visible());
        assert!(panel
            .take_outbound()
            .iter()
            .any(|o| matches!(o, Outbound::Signal(Signal::ShowCompetingHud))));
        assert!(panel.popups().is_empty());
    }

    #[test]
    fn test_receipt_for_other_panel_slot_is_ignored() {
        let mut panel = panel();
        deliver_items(&mut panel, vec![hard_item("bundle", 499)]);
        panel.purchase(0, 1.0);
        panel.take_outbound();

        // Same player, different pooled slot querying concurrently
        let event = ServerEvent::Receipt {
            player: Some("p1".into()),
            panel_id: Some("shop-2".into()),
            seq: None,
            sku: "bundle".into(),
            result: PurchaseResult::Success,
        };
        panel.handle_event(&event, 2.0);

        assert!(panel.is_busy());
        assert!(panel.take_outbound().is_empty());
    }

    #[test]
    fn test_busy_grid_is_fully_disabled() {
        let mut panel = panel();
        deliver_items(&mut panel, vec![hard_item("bundle", 499), hard_item("crate", 99)]);
        assert_eq!(panel.interactable(), &[true, true]);

        panel.purchase(0, 1.0);
        assert_eq!(panel.interactable(), &[false, false]);

        let viewport = GridViewport {
            width: 500.0,
            height: 300.0,
        };
        let node = panel
            .render_cell(GridIndexProxy { index: 1 }, None, viewport)
            .unwrap();
        assert!(!node.interactable);
    }

    #[test]
    fn test_unvalidated_item_not_clickable() {
        let mut panel = panel();
        let mut item = hard_item("mystery", 10);
        item.validated = false;
        deliver_items(&mut panel, vec![item]);

        assert_eq!(panel.interactable(), &[false]);
        assert!(!panel.purchase(0, 1.0));
    }
}
