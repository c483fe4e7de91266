//! Pooled panel lifecycle.
//!
//! A panel instance lives as long as its pool slot and cycles between
//! hidden and visible for whichever player currently owns it. Reassignment
//! resets all per-owner state before the first content request goes out;
//! constructor-time initialization is never relied on for per-player state.

use crate::network::messages::ClientMessage;

use super::identity::PanelIdentity;

/// Side-channel notifications for external collaborators (HUD arbiter,
/// telemetry, pool allocator). Emitted through the outbox; the receivers'
/// behavior is out of scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    HideCompetingHud,
    ShowCompetingHud,
    PanelViewed { panel_id: String },
    RewardClaimed { sku: String },
    ItemPurchased { sku: String },
    /// Sent once per assignment so the server-side allocator can track
    /// live pool usage.
    PoolSlotInitialized { panel_id: String, player: String },
}

/// An item drained from a panel's outbox by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Request(ClientMessage),
    Signal(Signal),
}

/// Shared lifecycle state embedded in every concrete panel: ownership,
/// visibility, the busy gate, the request sequence, and the outbox.
#[derive(Debug)]
pub struct PanelCore {
    identity: PanelIdentity,
    visible: bool,
    busy: bool,
    busy_since: Option<f64>,
    seq: u64,
    outbox: Vec<Outbound>,
}

impl PanelCore {
    pub fn new(panel_id: &str) -> Self {
        Self {
            identity: PanelIdentity::new(panel_id),
            visible: false,
            busy: false,
            busy_since: None,
            seq: 0,
            outbox: Vec::new(),
        }
    }

    pub fn identity(&self) -> &PanelIdentity {
        &self.identity
    }

    pub fn panel_id(&self) -> &str {
        &self.identity.id
    }

    pub fn owner(&self) -> Option<&str> {
        self.identity.player.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Take ownership for a new player. Forces the panel hidden and resets
    /// transaction state. Panel-local caches are cleared by the caller
    /// before any content request is issued.
    pub fn assign(&mut self, player: &str) {
        self.identity.player = Some(player.to_string());
        self.visible = false;
        self.busy = false;
        self.busy_since = None;
        self.outbox.push(Outbound::Signal(Signal::PoolSlotInitialized {
            panel_id: self.identity.id.clone(),
            player: player.to_string(),
        }));
    }

    /// Reveal the panel. Idempotent: the competing-HUD and viewed signals
    /// fire only on an actual transition, before paint.
    pub fn show(&mut self) -> bool {
        if self.visible {
            return false;
        }
        self.visible = true;
        self.outbox.push(Outbound::Signal(Signal::HideCompetingHud));
        self.outbox.push(Outbound::Signal(Signal::PanelViewed {
            panel_id: self.identity.id.clone(),
        }));
        true
    }

    /// Hide the panel and restore the competing HUD. Safe to call
    /// redundantly.
    pub fn hide(&mut self) -> bool {
        if !self.visible {
            return false;
        }
        self.visible = false;
        self.outbox.push(Outbound::Signal(Signal::ShowCompetingHud));
        true
    }

    pub fn set_busy(&mut self, busy: bool, now: f64) {
        self.busy = busy;
        self.busy_since = busy.then_some(now);
    }

    /// Whether the outstanding transaction has exceeded the response
    /// deadline.
    pub fn busy_timed_out(&self, now: f64, timeout: Option<f64>) -> bool {
        match (self.busy_since, timeout) {
            (Some(since), Some(limit)) => self.busy && now - since > limit,
            _ => false,
        }
    }

    /// Fresh correlation token for the next outbound request.
    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn send(&mut self, message: ClientMessage) {
        self.outbox.push(Outbound::Request(message));
    }

    pub fn signal(&mut self, signal: Signal) {
        self.outbox.push(Outbound::Signal(signal));
    }

    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }
}
