use std::num::NonZeroUsize;

#[cfg(feature = "json_schema")]
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Default `strftime` pattern for the modification time column.
/// For example "10/16/26 08:19:02.153 UTC"
pub const DEFAULT_TIME_FORMAT: &str = "%D %T%.3f %Z";

/// Time zone the modification time is rendered in.
#[cfg_attr(feature = "json_schema", derive(JsonSchema))]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeZoneChoice {
    /// Coordinated universal time.
    #[default]
    Utc,
    /// The process' local time zone.
    Local,
}

/// What happens to a registered session when a call on it fails.
#[cfg_attr(feature = "json_schema", derive(JsonSchema))]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorPolicy {
    /// The failing call removes the session from the registry.
    #[default]
    Evict,
    /// The session stays registered and the same entry can be retried
    /// through [`crate::DirLister::next`] or [`crate::DirLister::next_row`].
    /// A [`crate::ListingCall`] closes its session on error regardless.
    Preserve,
}

/// Knobs shared by every session a [`crate::DirLister`] drives.
#[cfg_attr(feature = "json_schema", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct ListingConfig {
    /// `strftime` pattern for the modification time.
    pub time_format: String,
    /// Zone the modification time is converted to before formatting.
    pub time_zone: TimeZoneChoice,
    /// Maximum number of live sessions. When full, the least recently
    /// used session is evicted. `None` never evicts.
    pub registry_capacity: Option<NonZeroUsize>,
    /// Session handling on failure.
    pub error_policy: ErrorPolicy,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            time_format: DEFAULT_TIME_FORMAT.to_owned(),
            time_zone: TimeZoneChoice::Utc,
            registry_capacity: None,
            error_policy: ErrorPolicy::Evict,
        }
    }
}

impl ListingConfig {
    /// Sets the `strftime` pattern of the modification time column.
    pub fn with_time_format(mut self, format: &str) -> Self {
        self.time_format = format.to_owned();
        self
    }

    /// Sets the zone the modification time is rendered in.
    pub fn with_time_zone(mut self, zone: TimeZoneChoice) -> Self {
        self.time_zone = zone;
        self
    }

    /// Bounds the number of live sessions.
    pub fn with_registry_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.registry_capacity = Some(capacity);
        self
    }

    /// Sets what happens to a session when a call on it fails.
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}
