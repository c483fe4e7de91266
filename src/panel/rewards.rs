//! Daily login rewards panel.
//!
//! Mirrors the server's calendar state and runs the exactly-once claim
//! flow. The claim request never names a reward: the server derives the
//! current day itself, and the response is the source of truth for what
//! was granted.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::PanelConfig;
use crate::network::events::ServerEvent;
use crate::network::messages::ClientMessage;
use crate::ui::Node;

use super::feedback::{FeedbackQueue, Popup};
use super::grid::{CellGeometry, GridIndexProxy, GridViewport, GridVirtualizer};
use super::lifecycle::{PanelCore, Signal};
use super::Panel;

/// One day's reward as delivered by the platform. `day` is the 0-indexed
/// offset into the reward sequence and is immutable once received.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardItem {
    pub sku: String,
    pub quantity: i64,
    pub thumbnail: String,
    pub name: String,
    pub description: String,
    pub day: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RewardsMetadata {
    pub event_id: String,
    pub title: String,
}

/// Server-confirmed calendar state. Replaced wholesale on every response;
/// never mutated locally.
#[derive(Debug, Clone, PartialEq)]
pub struct EventState {
    pub current_day: u32,
    pub expired: bool,
    pub has_collected_today: bool,
    pub next_collection_date: Option<DateTime<Utc>>,
}

impl EventState {
    /// A reward is claimed once its day has passed, or it is today's
    /// reward and today's collection already happened.
    pub fn claimed(&self, item: &RewardItem) -> bool {
        self.current_day > item.day
            || (self.current_day == item.day && self.has_collected_today)
    }

    /// Only the current day's reward is collectable, once per day.
    /// Future-day items are neither claimed nor claimable.
    pub fn claimable(&self, item: &RewardItem) -> bool {
        self.current_day == item.day && !self.has_collected_today
    }
}

/// Result payload of a claim response.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub reward: Option<RewardItem>,
}

pub struct RewardsPanel {
    core: PanelCore,
    grid: GridVirtualizer<RewardItem>,
    metadata: RewardsMetadata,
    event_state: Option<EventState>,
    /// Day of the item whose spinner is showing while a claim is in
    /// flight.
    spinner_day: Option<u32>,
    /// Correlation token of the outstanding claim, if any.
    pending_seq: Option<u64>,
    /// Per-item can-be-clicked bindings, refreshed on every busy change.
    interactable: Vec<bool>,
    feedback: FeedbackQueue,
    response_timeout: Option<f64>,
}

impl RewardsPanel {
    pub fn new(panel_id: &str, config: &PanelConfig) -> Self {
        Self {
            core: PanelCore::new(panel_id),
            grid: GridVirtualizer::new(CellGeometry {
                width: config.cell.width,
                height: config.cell.height,
                gap: config.cell.gap,
            }),
            metadata: RewardsMetadata::default(),
            event_state: None,
            spinner_day: None,
            pending_seq: None,
            interactable: Vec::new(),
            feedback: FeedbackQueue::new(config.popup_duration_secs),
            response_timeout: config.response_timeout_secs,
        }
    }

    pub fn metadata(&self) -> &RewardsMetadata {
        &self.metadata
    }

    pub fn event_state(&self) -> Option<&EventState> {
        self.event_state.as_ref()
    }

    pub fn grid(&self) -> &GridVirtualizer<RewardItem> {
        &self.grid
    }

    pub fn spinner_day(&self) -> Option<u32> {
        self.spinner_day
    }

    pub fn interactable(&self) -> &[bool] {
        &self.interactable
    }

    pub fn popups(&self) -> &[Popup] {
        self.feedback.popups()
    }

    /// Attempt to claim the reward at `index`. Rejected locally while a
    /// transaction is outstanding or when the item is not claimable today;
    /// a rejection sends nothing.
    pub fn claim(&mut self, index: usize, now: f64) -> bool {
        if self.core.is_busy() {
            debug!("Claim rejected: panel {} is busy", self.core.panel_id());
            return false;
        }
        let Some(player) = self.core.owner().map(str::to_string) else {
            return false;
        };
        let day = match (&self.event_state, self.grid.item(index)) {
            (Some(state), Some(item)) if state.claimable(item) => item.day,
            _ => return false,
        };

        self.spinner_day = Some(day);
        let seq = self.begin_transaction(now);
        let panel_id = self.core.panel_id().to_string();
        self.core.send(ClientMessage::ClaimReward { player, panel_id, seq });
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
        let state = self.event_state.as_ref();
        let spinner_day = self.spinner_day;
        self.grid.render_with(proxy, override_index, viewport, |item, index, total| {
            let claimed = state.map_or(false, |s| s.claimed(item));
            let claimable = state.map_or(false, |s| s.claimable(item));

            let mut node = Node::content(
                format!("reward-{}", item.day),
                item.thumbnail.clone(),
                item.name.clone(),
            );
            node.label = format!("Day {} of {}", index + 1, total);
            node.badge = if claimed {
                Some("Claimed".to_string())
            } else if claimable {
                Some("Claim".to_string())
            } else {
                None
            };
            node.interactable = !busy && claimable;
            node.spinner = spinner_day == Some(item.day);
            node
        })
    }

    /// Whether this panel has anything to show for its owner. An expired
    /// event has nothing to offer; unknown state still shows (the runtime
    /// presents a loading layout until content arrives).
    fn can_show(&self) -> bool {
        self.event_state.as_ref().map_or(true, |state| !state.expired)
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

    /// Single exit path for every response branch: the busy gate always
    /// returns to interactive here, and no spinner survives it.
    fn finish_transaction(&mut self, now: f64) {
        self.core.set_busy(false, now);
        self.pending_seq = None;
        self.spinner_day = None;
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
        let state = self.event_state.as_ref();
        let flags: Vec<bool> = self
            .grid
            .items()
            .iter()
            .map(|item| !busy && state.map_or(false, |s| s.claimable(item)))
            .collect();
        self.interactable = flags;
    }
}

impl Panel for RewardsPanel {
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
        self.metadata = RewardsMetadata::default();
        self.event_state = None;
        self.spinner_day = None;
        self.pending_seq = None;
        self.interactable.clear();
        self.feedback.clear();

        self.send_request(|player, panel_id, seq| ClientMessage::RequestRewardsList {
            player,
            panel_id,
            seq,
        });
        self.send_request(|player, panel_id, seq| ClientMessage::RequestEventState {
            player,
            panel_id,
            seq,
        });
    }

    fn show(&mut self) {
        if !self.can_show() {
            debug!("Show rejected: reward event expired for panel {}", self.core.panel_id());
            return;
        }
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
            ServerEvent::RewardsList { metadata, rewards, .. } => {
                info!(
                    "Received {} rewards for panel {}",
                    rewards.len(),
                    self.core.panel_id()
                );
                self.metadata = metadata.clone();
                self.grid.set_items(rewards.clone());
                self.refresh_interactable();
            }

            ServerEvent::EventState { state, .. } => {
                self.event_state = state.clone();
                self.refresh_interactable();
            }

            ServerEvent::ClaimResponse { seq, state, outcome, .. } => {
                if !self.accepts(*seq) {
                    debug!("Dropping claim response with stale token");
                    return;
                }

                // Spinner for the reward named in the response
                if let Some(reward) = &outcome.reward {
                    if self.spinner_day == Some(reward.day) {
                        self.spinner_day = None;
                    }
                }

                if let Some(state) = state {
                    self.event_state = Some(state.clone());
                }
                self.finish_transaction(now);

                if outcome.success {
                    if let Some(reward) = &outcome.reward {
                        self.feedback.push(&reward.name, &reward.thumbnail, now);
                        self.core.signal(Signal::RewardClaimed {
                            sku: reward.sku.clone(),
                        });
                    }
                } else if let Some(message) = &outcome.message {
                    warn!("Claim rejected by server: {}", message);
                }
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
                "Claim response overdue for panel {}; forcing refresh",
                self.core.panel_id()
            );
            self.finish_transaction(now);
            self.send_request(|player, panel_id, seq| ClientMessage::RequestEventState {
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
