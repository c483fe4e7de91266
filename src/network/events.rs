//! Inbound server events.
//!
//! `parse_event` turns a decoded room-data payload into a typed event.
//! Unknown message types are ignored, malformed list entries are skipped
//! with a warning, and the rest of the payload still goes through.

use chrono::TimeZone;
use chrono::Utc;
use log::{debug, warn};
use rmpv::Value;

use super::protocol::{extract_array, extract_bool, extract_i64, extract_string, extract_u64, field};
use crate::panel::rewards::{ClaimOutcome, EventState, RewardItem, RewardsMetadata};
use crate::panel::shop::{CatalogItem, CurrencyInfo, Entitlement, ShopMetadata, SoftPrice};

/// Closed set of purchase outcomes reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseResult {
    Success,
    InsufficientFunds,
    InvalidItem,
    InvalidCost,
    /// The request may or may not have succeeded server-side; the
    /// entitlement refresh is the source of truth, not this code.
    TimedOut,
    /// An external checkout UI is taking over the screen.
    PendingCheckoutFlow,
}

impl PurchaseResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseResult::Success => "success",
            PurchaseResult::InsufficientFunds => "insufficientFunds",
            PurchaseResult::InvalidItem => "invalidItem",
            PurchaseResult::InvalidCost => "invalidCost",
            PurchaseResult::TimedOut => "timedOut",
            PurchaseResult::PendingCheckoutFlow => "pendingCheckoutFlow",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(PurchaseResult::Success),
            "insufficientFunds" => Some(PurchaseResult::InsufficientFunds),
            "invalidItem" => Some(PurchaseResult::InvalidItem),
            "invalidCost" => Some(PurchaseResult::InvalidCost),
            "timedOut" => Some(PurchaseResult::TimedOut),
            "pendingCheckoutFlow" => Some(PurchaseResult::PendingCheckoutFlow),
            _ => None,
        }
    }
}

/// Decoded server -> client event. Broadcast variants carry no player; the
/// pool rewrites them to the local player before dispatch so identity
/// routing can address a slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    RewardsList {
        player: Option<String>,
        panel_id: Option<String>,
        seq: Option<u64>,
        metadata: RewardsMetadata,
        rewards: Vec<RewardItem>,
    },
    EventState {
        player: Option<String>,
        panel_id: Option<String>,
        seq: Option<u64>,
        state: Option<EventState>,
    },
    ClaimResponse {
        player: Option<String>,
        panel_id: Option<String>,
        seq: Option<u64>,
        state: Option<EventState>,
        outcome: ClaimOutcome,
    },
    ShopList {
        player: Option<String>,
        panel_id: Option<String>,
        seq: Option<u64>,
        metadata: ShopMetadata,
        items: Vec<CatalogItem>,
        currencies: Vec<CurrencyInfo>,
    },
    Entitlements {
        player: Option<String>,
        panel_id: Option<String>,
        seq: Option<u64>,
        entitlements: Vec<Entitlement>,
    },
    Receipt {
        player: Option<String>,
        panel_id: Option<String>,
        seq: Option<u64>,
        sku: String,
        result: PurchaseResult,
    },
    ShowPanel {
        player: Option<String>,
        panel_id: Option<String>,
    },
    HidePanel {
        player: Option<String>,
        panel_id: Option<String>,
    },
}

impl ServerEvent {
    /// The (player, panel id) pair this event is addressed to. A panel id
    /// of `None` targets every panel owned by the player.
    pub fn addressee(&self) -> (Option<&str>, Option<&str>) {
        match self {
            ServerEvent::RewardsList { player, panel_id, .. }
            | ServerEvent::EventState { player, panel_id, .. }
            | ServerEvent::ClaimResponse { player, panel_id, .. }
            | ServerEvent::ShopList { player, panel_id, .. }
            | ServerEvent::Entitlements { player, panel_id, .. }
            | ServerEvent::Receipt { player, panel_id, .. }
            | ServerEvent::ShowPanel { player, panel_id }
            | ServerEvent::HidePanel { player, panel_id } => {
                (player.as_deref(), panel_id.as_deref())
            }
        }
    }
}

fn parse_reward_item(value: &Value) -> Option<RewardItem> {
    Some(RewardItem {
        sku: extract_string(value, "sku")?,
        quantity: extract_i64(value, "quantity").unwrap_or(1),
        thumbnail: extract_string(value, "thumbnail").unwrap_or_default(),
        name: extract_string(value, "name").unwrap_or_default(),
        description: extract_string(value, "description").unwrap_or_default(),
        day: extract_u64(value, "day")? as u32,
    })
}

fn parse_reward_items(values: &[Value]) -> Vec<RewardItem> {
    let mut rewards = Vec::with_capacity(values.len());
    for value in values {
        match parse_reward_item(value) {
            Some(item) => rewards.push(item),
            None => warn!("Skipping malformed reward entry"),
        }
    }
    rewards
}

fn parse_rewards_metadata(value: &Value) -> RewardsMetadata {
    RewardsMetadata {
        event_id: extract_string(value, "eventId").unwrap_or_default(),
        title: extract_string(value, "title").unwrap_or_default(),
    }
}

fn parse_event_state(value: &Value) -> EventState {
    EventState {
        current_day: extract_u64(value, "currentDay").unwrap_or(0) as u32,
        expired: extract_bool(value, "expired").unwrap_or(false),
        has_collected_today: extract_bool(value, "hasCollectedToday").unwrap_or(false),
        next_collection_date: extract_i64(value, "nextCollectionDate")
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
    }
}

fn parse_catalog_item(value: &Value) -> Option<CatalogItem> {
    let price_soft = field(value, "priceSoft").and_then(|price| {
        Some(SoftPrice {
            sku: extract_string(price, "sku")?,
            quantity: extract_i64(price, "quantity")?,
        })
    });

    Some(CatalogItem {
        // Empty skus mark disabled/placeholder entries; the shop panel
        // filters them before display.
        sku: extract_string(value, "sku").unwrap_or_default(),
        quantity: extract_i64(value, "quantity").unwrap_or(1),
        price_hard: extract_i64(value, "priceHard").unwrap_or(0),
        price_soft,
        thumbnail: extract_string(value, "thumbnail").unwrap_or_default(),
        validated: extract_bool(value, "validated").unwrap_or(true),
    })
}

fn parse_catalog_items(values: &[Value]) -> Vec<CatalogItem> {
    let mut items = Vec::with_capacity(values.len());
    for value in values {
        match parse_catalog_item(value) {
            Some(item) => items.push(item),
            None => warn!("Skipping malformed catalog entry"),
        }
    }
    items
}

fn parse_currencies(values: &[Value]) -> Vec<CurrencyInfo> {
    values
        .iter()
        .filter_map(|value| {
            Some(CurrencyInfo {
                sku: extract_string(value, "sku")?,
                name: extract_string(value, "name").unwrap_or_default(),
                thumbnail: extract_string(value, "thumbnail").unwrap_or_default(),
            })
        })
        .collect()
}

fn parse_entitlements(values: &[Value]) -> Vec<Entitlement> {
    values
        .iter()
        .filter_map(|value| {
            Some(Entitlement {
                sku: extract_string(value, "sku")?,
                quantity: extract_i64(value, "quantity").unwrap_or(0),
            })
        })
        .collect()
}

fn parse_shop_metadata(value: &Value) -> ShopMetadata {
    ShopMetadata {
        shop_id: extract_string(value, "shopId").unwrap_or_default(),
        title: extract_string(value, "title").unwrap_or_default(),
    }
}

/// Parse one room-data payload into a typed event. Returns `None` for
/// unknown or unroutable message types.
pub fn parse_event(msg_type: &str, data: Option<&Value>) -> Option<ServerEvent> {
    match msg_type {
        "sendRewardsList" | "broadcastRewardsList" => {
            let value = data?;
            let player = if msg_type == "sendRewardsList" {
                extract_string(value, "playerId")
            } else {
                None
            };
            Some(ServerEvent::RewardsList {
                player,
                panel_id: extract_string(value, "panelId"),
                seq: extract_u64(value, "seq"),
                metadata: field(value, "metadata")
                    .map(parse_rewards_metadata)
                    .unwrap_or_default(),
                rewards: extract_array(value, "rewards")
                    .map(|entries| parse_reward_items(entries))
                    .unwrap_or_default(),
            })
        }

        "sendEventState" => {
            let value = data?;
            Some(ServerEvent::EventState {
                player: extract_string(value, "playerId"),
                panel_id: extract_string(value, "panelId"),
                seq: extract_u64(value, "seq"),
                state: field(value, "eventState").map(parse_event_state),
            })
        }

        "claimRewardResponse" => {
            let value = data?;
            let outcome = ClaimOutcome {
                success: extract_bool(value, "success").unwrap_or(false),
                message: extract_string(value, "message"),
                reward: field(value, "reward").and_then(parse_reward_item),
            };
            Some(ServerEvent::ClaimResponse {
                player: extract_string(value, "playerId"),
                panel_id: extract_string(value, "panelId"),
                seq: extract_u64(value, "seq"),
                state: field(value, "eventState").map(parse_event_state),
                outcome,
            })
        }

        "sendShopList" | "broadcastShopList" => {
            let value = data?;
            let player = if msg_type == "sendShopList" {
                extract_string(value, "playerId")
            } else {
                None
            };
            Some(ServerEvent::ShopList {
                player,
                panel_id: extract_string(value, "panelId"),
                seq: extract_u64(value, "seq"),
                metadata: field(value, "metadata")
                    .map(parse_shop_metadata)
                    .unwrap_or_default(),
                items: extract_array(value, "items")
                    .map(|entries| parse_catalog_items(entries))
                    .unwrap_or_default(),
                currencies: extract_array(value, "currencies")
                    .map(|entries| parse_currencies(entries))
                    .unwrap_or_default(),
            })
        }

        "sendEntitlements" => {
            let value = data?;
            Some(ServerEvent::Entitlements {
                player: extract_string(value, "playerId"),
                panel_id: extract_string(value, "panelId"),
                seq: extract_u64(value, "seq"),
                entitlements: extract_array(value, "entitlements")
                    .map(|entries| parse_entitlements(entries))
                    .unwrap_or_default(),
            })
        }

        "receipt" => {
            let value = data?;
            let raw = extract_string(value, "result").unwrap_or_default();
            let result = match PurchaseResult::from_str(&raw) {
                Some(result) => result,
                None => {
                    warn!("Dropping receipt with unknown result code: {}", raw);
                    return None;
                }
            };
            Some(ServerEvent::Receipt {
                player: extract_string(value, "playerId"),
                panel_id: extract_string(value, "panelId"),
                seq: extract_u64(value, "seq"),
                sku: extract_string(value, "sku").unwrap_or_default(),
                result,
            })
        }

        "showPanel" => {
            let value = data?;
            Some(ServerEvent::ShowPanel {
                player: extract_string(value, "playerId"),
                panel_id: extract_string(value, "panelId"),
            })
        }

        "hidePanel" => {
            let value = data?;
            Some(ServerEvent::HidePanel {
                player: extract_string(value, "playerId"),
                panel_id: extract_string(value, "panelId"),
            })
        }

        other => {
            debug!("Ignoring unknown event type: {}", other);
            None
        }
    }
}
