//! Property names of the Notion databases the relay reads and writes.

/// Identity (registration) database.
pub mod identity {
    /// Title property holding the staff code.
    pub const STAFF_CODE: &str = "Name";
    /// Rich-text property holding the LINE user id.
    pub const USER_ID: &str = "User ID";
    pub const REGISTERED_AT: &str = "接收時間";
}

/// Meeting calendar database.
pub mod meeting {
    pub const TITLE: &str = "Name";
    pub const CATEGORY: &str = "類別";
    pub const SCHEDULED_AT: &str = "日期";
    pub const LOCATION: &str = "地點";
    pub const ATTENDEES: &str = "相關人員";

    /// Category value that marks a record as a meeting.
    pub const MEETING_CATEGORY: &str = "會議";
}

/// Singleton quota page.
pub mod quota {
    pub const COUNT: &str = "Count";
    pub const LAST_SENT: &str = "LastSent";
}
