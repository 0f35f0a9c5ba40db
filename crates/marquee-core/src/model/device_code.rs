use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One device-flow pairing: a long secret polled by the display and a short
/// code typed in by an operator.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCode {
    pub id: String,

    /// High-entropy bearer secret held by the unidentified display
    pub device_code: String,

    /// `XXXX-XXXX` code shown on the display's screen
    pub user_code: String,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Suggested seconds between activation polls
    pub poll_interval_secs: u32,

    pub activated: bool,

    pub activated_at: Option<DateTime<Utc>>,

    /// Identity minted for the display on redemption
    pub display_id: Option<String>,
}

impl DeviceCode {
    /// Expiry is inclusive: a code is dead at exactly `expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whole seconds left before expiry, 0 once expired
    pub fn expires_in_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

impl fmt::Debug for DeviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCode")
            .field("id", &self.id)
            .field("device_code", &"<redacted>")
            .field("user_code", &self.user_code)
            .field("expires_at", &self.expires_at)
            .field("activated", &self.activated)
            .field("display_id", &self.display_id)
            .finish()
    }
}
