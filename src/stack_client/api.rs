use serde::{Deserialize, Serialize};

/// Common envelope around every Stack Exchange API response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response<Data> {
    pub items: Data,
    pub has_more: bool,
    pub quota_max: i64,
    pub quota_remaining: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub display_name: String,
    pub reputation: i64,
    pub profile_image: Option<String>,
    pub location: Option<String>,
    pub website_url: Option<String>,
    pub link: String,
    pub badge_counts: BadgeCounts,
    pub is_employee: bool,
    pub user_type: String,
    pub accept_rate: Option<i64>,
    pub creation_date: i64,
    pub last_access_date: i64,
    pub last_modified_date: i64,
    pub account_id: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCounts {
    pub bronze: i64,
    pub silver: i64,
    pub gold: i64,
}

impl User {
    /// True when `needle` occurs case-insensitively in the display name, the
    /// location, or the reputation written out as decimal text.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.display_name.to_lowercase().contains(&needle)
            || self
                .location
                .as_deref()
                .map_or(false, |loc| loc.to_lowercase().contains(&needle))
            || self.reputation.to_string().contains(&needle)
    }
}
