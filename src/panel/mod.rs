//! Pooled, player-assignable panel surfaces.

pub mod feedback;
pub mod grid;
pub mod identity;
pub mod lifecycle;
pub mod pool;
pub mod rewards;
pub mod shop;

pub use grid::{CellGeometry, GridIndexProxy, GridViewport, GridVirtualizer};
pub use identity::PanelIdentity;
pub use lifecycle::{Outbound, PanelCore, Signal};
pub use pool::PanelPool;
pub use rewards::RewardsPanel;
pub use shop::ShopPanel;

use crate::network::events::ServerEvent;

/// Capability surface every pooled panel exposes to the host: lifecycle,
/// event intake, timers, and the outbox drain. Concrete panels add their
/// own typed claim/purchase entry points on top.
pub trait Panel {
    fn panel_id(&self) -> &str;
    fn owner(&self) -> Option<&str>;
    fn is_visible(&self) -> bool;
    fn is_busy(&self) -> bool;
    /// Reassign the slot to a new owner. Clears all per-owner state before
    /// the initial content requests go out.
    fn assign(&mut self, player: &str);
    fn show(&mut self);
    fn hide(&mut self);
    /// Route one inbound event. Events not addressed to this instance are
    /// silently ignored.
    fn handle_event(&mut self, event: &ServerEvent, now: f64);
    /// Advance timers: popup expiry and the busy watchdog.
    fn tick(&mut self, now: f64);
    fn take_outbound(&mut self) -> Vec<Outbound>;
}
