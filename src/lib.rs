//! In-game panel system for a multiplayer world client.
//!
//! Implements the pooled panel lifecycle, the claim/purchase transaction
//! state machine, and the virtualized reward/catalog grid shared by the
//! daily rewards panel and the item shop panel. Rendering, asset loading,
//! and the socket transport are external collaborators: panels consume
//! decoded server events and emit requests and side-channel signals
//! through an outbox drained by the host each frame.

pub mod config;
pub mod network;
pub mod panel;
pub mod ui;

pub use config::PanelConfig;
pub use network::events::{parse_event, PurchaseResult, ServerEvent};
pub use network::messages::ClientMessage;
pub use panel::{Outbound, Panel, PanelPool, Signal};
pub use panel::rewards::RewardsPanel;
pub use panel::shop::ShopPanel;
