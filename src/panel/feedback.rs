//! Transaction feedback: transient confirmation popups.

/// A transient confirmation popup carrying the claimed/purchased item's
/// name and thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub icon: String,
    pub shown_at: f64,
}

/// Queue of active popups, expired on tick.
#[derive(Debug)]
pub struct FeedbackQueue {
    popups: Vec<Popup>,
    duration: f64,
}

impl FeedbackQueue {
    pub fn new(duration: f64) -> Self {
        Self {
            popups: Vec::new(),
            duration,
        }
    }

    pub fn push(&mut self, title: &str, icon: &str, now: f64) {
        self.popups.push(Popup {
            title: title.to_string(),
            icon: icon.to_string(),
            shown_at: now,
        });
    }

    /// Drop popups older than the configured duration.
    pub fn tick(&mut self, now: f64) {
        let duration = self.duration;
        self.popups.retain(|popup| now - popup.shown_at < duration);
    }

    pub fn popups(&self) -> &[Popup] {
        &self.popups
    }

    pub fn clear(&mut self) {
        self.popups.clear();
    }
}
