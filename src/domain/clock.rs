//! Date stamps
//!
//! Exhibition dates are stored as strings and compared lexicographically, so
//! "now" must be rendered in the same fixed-width layout for comparisons to
//! agree with time order.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Layout shared by stored dates and the rendered current time
pub const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Zone used when none is configured
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Bangkok;

/// Source of the current date stamp in a fixed zone
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
    frozen: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new(tz: Tz) -> Self {
        Self { tz, frozen: None }
    }

    /// Clock pinned to one instant
    pub fn frozen(tz: Tz, at: DateTime<Utc>) -> Self {
        Self {
            tz,
            frozen: Some(at),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current wall-clock time in the configured zone, rendered as a stamp
    pub fn now_stamp(&self) -> String {
        let now = self.frozen.unwrap_or_else(Utc::now);
        stamp(now, self.tz)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

/// Render an instant as wall-clock time in `tz`
pub fn stamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format(STAMP_FORMAT).to_string()
}
