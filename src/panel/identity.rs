//! Panel addressing.
//!
//! Every pooled panel observes the same broadcast stream; only the
//! addressed instance may react. An event id of `None` targets all panels
//! owned by the player.

/// Identity of a pooled panel instance: the owning player (if assigned)
/// and the fixed id of the pool slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelIdentity {
    pub player: Option<String>,
    pub id: String,
}

impl PanelIdentity {
    pub fn new(id: &str) -> Self {
        Self {
            player: None,
            id: id.to_string(),
        }
    }

    /// Routing rule for inbound events. Unassigned panels match nothing;
    /// a non-match is a silent no-op, never an error.
    pub fn is_recipient(&self, event_player: Option<&str>, event_id: Option<&str>) -> bool {
        let Some(player) = self.player.as_deref() else {
            return false;
        };
        if event_player != Some(player) {
            return false;
        }
        event_id.is_none() || event_id == Some(self.id.as_str())
    }
}
