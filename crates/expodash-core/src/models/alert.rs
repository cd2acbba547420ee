use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Alert {
    pub alert_id: i64,
    pub alert: String,
    #[serde(default)]
    pub sent_by: String,
    #[serde(default)]
    pub sent_at: String,
}

impl Alert {
    pub fn sent_at_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.sent_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Short timestamp for list display, falling back to the raw value.
    pub fn sent_at_display(&self) -> String {
        match self.sent_at_time() {
            Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
            None => self.sent_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAlert {
    pub alert: String,
    pub sent_at: DateTime<Utc>,
}

impl NewAlert {
    /// Build an alert stamped with the current time. Returns `None` for
    /// blank text.
    pub fn new(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            alert: text.to_string(),
            sent_at: Utc::now(),
        })
    }
}
