//! Shared constants.

/// Collection holding one member profile per identity, keyed by uid.
pub const MEMBERS_COLLECTION: &str = "users";

/// Collection holding one goal record per member per month.
pub const GOALS_COLLECTION: &str = "goals";

pub const CALENDAR_COLLECTION: &str = "calendarEvents";

pub const RESOURCES_COLLECTION: &str = "resources";

/// Local backend only: hashed passwords keyed by lowercase email.
pub const CREDENTIALS_COLLECTION: &str = "credentials";

/// Every goal record carries exactly this many week entries.
pub const WEEKS_PER_MONTH: usize = 4;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Upload limit for shared resource files (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Number of past periods shown per page of goal history.
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 6;

/// How often the tracker checks whether the real month rolled over.
pub const DEFAULT_ROLLOVER_CHECK: &str = "1m";
