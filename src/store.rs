use crate::follow_store::FollowStore;
use crate::stack_client::{api, UsersApi};
use std::collections::HashSet;
use std::sync::Mutex;

// NB: all the synchronization and interior mutability are encapsulated here,
// so intents take &self. State is read-modify-replaced as a whole; the lock is
// never held across an await, and two racing intents are last-write-wins.

/// The whole of what the frontend renders from.
#[derive(Clone, Debug, PartialEq)]
pub struct UsersState {
    pub loading: bool,
    pub users: Vec<api::User>,
    pub error: Option<String>,
    pub followed: HashSet<u64>,
    /// Present whenever a query has been entered; `None` means no search in
    /// effect. An empty query filters down to nothing, not to everything.
    pub filtered: Option<Vec<api::User>>,
    /// Ids with a follow/unfollow write currently in flight.
    pub toggling: HashSet<u64>,
    pub search_query: String,
    pub search_active: bool,
}

impl Default for UsersState {
    fn default() -> Self {
        Self {
            loading: true,
            users: Vec::new(),
            error: None,
            followed: HashSet::new(),
            filtered: None,
            toggling: HashSet::new(),
            search_query: String::new(),
            search_active: false,
        }
    }
}

pub struct Store {
    api: Box<dyn UsersApi>,
    follow_store: Mutex<FollowStore>,
    state: Mutex<UsersState>,
}

impl Store {
    pub fn new(api: Box<dyn UsersApi>, follow_store: FollowStore) -> Self {
        let state = UsersState {
            followed: follow_store.all_followed(),
            ..UsersState::default()
        };
        Self {
            api,
            follow_store: Mutex::new(follow_store),
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> UsersState {
        self.state.lock().unwrap().clone()
    }

    fn replace(&self, f: impl FnOnce(UsersState) -> UsersState) {
        let mut state = self.state.lock().unwrap();
        let next = f(state.clone());
        *state = next;
    }

    /// One fetch attempt. A failed reload keeps the previously loaded list so
    /// the frontend can keep showing it next to the error.
    pub async fn load_users(&self) {
        self.replace(|mut state| {
            state.loading = true;
            state.error = None;
            state
        });

        match self.api.fetch_users().await {
            Ok(users) => self.replace(|mut state| {
                state.loading = false;
                state.error = None;
                state.users = users;
                if state.filtered.is_some() {
                    state.filtered = Some(filter_users(&state.users, &state.search_query));
                }
                state
            }),
            Err(error) => self.replace(|mut state| {
                state.loading = false;
                state.error = Some(format!("{error:#}"));
                state
            }),
        }
    }

    pub async fn retry(&self) {
        self.load_users().await
    }

    /// Re-reads the persisted followed set into state.
    pub fn refresh_followed(&self) {
        let followed = self.follow_store.lock().unwrap().all_followed();
        self.replace(|mut state| {
            state.followed = followed;
            state
        });
    }

    /// Follows `user_id` if it isn't followed, unfollows it if it is. A store
    /// write failure is swallowed: the in-memory set is re-mirrored from the
    /// store either way, and the toggling marker always comes back off.
    pub fn toggle_follow(&self, user_id: u64) {
        self.replace(|mut state| {
            state.toggling.insert(user_id);
            state
        });

        let followed_now = {
            let mut follow_store = self.follow_store.lock().unwrap();
            let _ = if follow_store.is_followed(user_id) {
                follow_store.unfollow(user_id)
            } else {
                follow_store.follow(user_id)
            };
            follow_store.is_followed(user_id)
        };

        self.replace(|mut state| {
            if followed_now {
                state.followed.insert(user_id);
            } else {
                state.followed.remove(&user_id);
            }
            state.toggling.remove(&user_id);
            state
        });
    }

    pub fn update_search_query(&self, query: &str) {
        self.replace(|mut state| {
            state.search_query = query.to_string();
            state.filtered = Some(filter_users(&state.users, query));
            state
        });
    }

    pub fn set_search_active(&self, active: bool) {
        self.replace(|mut state| {
            state.search_active = active;
            if !active {
                state.search_query.clear();
                state.filtered = None;
            }
            state
        });
    }
}

fn filter_users(users: &[api::User], query: &str) -> Vec<api::User> {
    if query.is_empty() {
        return Vec::new();
    }
    users
        .iter()
        .filter(|user| user.matches(query))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack_client::api::{BadgeCounts, User};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    struct StubApi {
        responses: Mutex<VecDeque<Result<Vec<User>>>>,
    }

    impl StubApi {
        fn new(responses: Vec<Result<Vec<User>>>) -> Box<Self> {
            Box::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl UsersApi for StubApi {
        async fn fetch_users(&self) -> Result<Vec<User>> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no stubbed response")))
        }
    }

    fn user(id: u64, name: &str, reputation: i64, location: Option<&str>) -> User {
        User {
            user_id: id,
            display_name: name.to_string(),
            reputation,
            profile_image: None,
            location: location.map(str::to_string),
            website_url: None,
            link: format!("https://stackoverflow.com/users/{id}"),
            badge_counts: BadgeCounts {
                bronze: 0,
                silver: 0,
                gold: 0,
            },
            is_employee: false,
            user_type: "registered".to_string(),
            accept_rate: None,
            creation_date: 1222430705,
            last_access_date: 1693226845,
            last_modified_date: 1693180800,
            account_id: id,
        }
    }

    fn store_with(responses: Vec<Result<Vec<User>>>) -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let follow_store = FollowStore::load(dir.path().join("follows.json")).unwrap();
        (Store::new(StubApi::new(responses), follow_store), dir)
    }

    #[test]
    fn default_state_is_loading_with_empty_collections() {
        let state = UsersState::default();
        assert!(state.loading);
        assert!(state.users.is_empty());
        assert!(state.error.is_none());
        assert!(state.followed.is_empty());
        assert!(state.filtered.is_none());
        assert!(state.toggling.is_empty());
        assert!(state.search_query.is_empty());
        assert!(!state.search_active);
    }

    #[tokio::test]
    async fn successful_load_replaces_users_and_clears_phase_flags() {
        let users = vec![user(1, "Alice", 100, None), user(2, "Bob", 50, None)];
        let (store, _dir) = store_with(vec![Ok(users)]);
        store.load_users().await;

        let state = store.state();
        assert_eq!(state.users.len(), 2);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn failed_load_sets_error_and_clears_loading() {
        let (store, _dir) =
            store_with(vec![Err(anyhow!("API call failed with response code: 503"))]);
        store.load_users().await;

        let state = store.state();
        assert!(!state.loading);
        assert_eq!(
            state.error.as_deref(),
            Some("API call failed with response code: 503")
        );
    }

    #[tokio::test]
    async fn failed_reload_preserves_the_previous_list() {
        let users = vec![user(1, "Alice", 100, None)];
        let (store, _dir) = store_with(vec![Ok(users), Err(anyhow!("boom"))]);

        store.load_users().await;
        store.retry().await;

        let state = store.state();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.users[0].display_name, "Alice");
        assert!(state.error.is_some());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn toggle_follow_round_trips_through_the_store() {
        let (store, _dir) = store_with(vec![]);

        store.toggle_follow(22656);
        assert!(store.state().followed.contains(&22656));

        store.toggle_follow(22656);
        let state = store.state();
        assert!(!state.followed.contains(&22656));
        assert!(state.toggling.is_empty());
    }

    #[tokio::test]
    async fn toggle_swallows_a_failing_store_write() {
        let dir = tempfile::tempdir().unwrap();
        // Parent is a plain file, so every follow-store write fails.
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let follow_store = FollowStore::load(blocker.join("follows.json")).unwrap();
        let store = Store::new(StubApi::new(vec![]), follow_store);

        store.toggle_follow(7);

        // No error surfaces and the marker comes back off; the mirrored set
        // tracks the store's in-memory map, which mutated before the failed
        // write, so it reports 7 as followed until a reload converges them.
        let state = store.state();
        assert!(state.toggling.is_empty());
        assert!(state.error.is_none());
        assert!(state.followed.contains(&7));
    }

    #[tokio::test]
    async fn refresh_followed_mirrors_the_persisted_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("follows.json");
        {
            let mut seeded = FollowStore::load(&path).unwrap();
            seeded.follow(1).unwrap();
            seeded.follow(3).unwrap();
        }
        let follow_store = FollowStore::load(&path).unwrap();
        let store = Store::new(StubApi::new(vec![]), follow_store);

        store.refresh_followed();
        assert_eq!(store.state().followed, HashSet::from([1, 3]));
    }

    #[tokio::test]
    async fn empty_query_filters_down_to_nothing() {
        let users = vec![user(1, "Alice", 100, None)];
        let (store, _dir) = store_with(vec![Ok(users)]);
        store.load_users().await;

        store.set_search_active(true);
        store.update_search_query("");
        assert_eq!(store.state().filtered, Some(Vec::new()));
    }

    #[tokio::test]
    async fn query_matches_name_location_and_reputation() {
        let users = vec![
            user(1, "Alice Carter", 1500, Some("Oslo, Norway")),
            user(2, "Bob", 270, Some("Lima, Peru")),
        ];
        let (store, _dir) = store_with(vec![Ok(users)]);
        store.load_users().await;
        store.set_search_active(true);

        store.update_search_query("aLiCe");
        let filtered = store.state().filtered.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].user_id, 1);

        store.update_search_query("peru");
        let filtered = store.state().filtered.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].user_id, 2);

        store.update_search_query("27");
        let filtered = store.state().filtered.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].user_id, 2);
    }

    #[tokio::test]
    async fn deactivating_search_clears_query_and_filter() {
        let users = vec![user(1, "Alice", 100, None)];
        let (store, _dir) = store_with(vec![Ok(users)]);
        store.load_users().await;

        store.set_search_active(true);
        store.update_search_query("ali");
        store.set_search_active(false);

        let state = store.state();
        assert!(!state.search_active);
        assert!(state.search_query.is_empty());
        assert!(state.filtered.is_none());
    }

    #[tokio::test]
    async fn reload_recomputes_an_active_filter_against_the_new_list() {
        let first = vec![user(1, "Alice", 100, None)];
        let second = vec![user(1, "Alice", 100, None), user(2, "Alicia", 90, None)];
        let (store, _dir) = store_with(vec![Ok(first), Ok(second)]);

        store.load_users().await;
        store.set_search_active(true);
        store.update_search_query("ali");
        store.load_users().await;

        let filtered = store.state().filtered.unwrap();
        assert_eq!(filtered.len(), 2);
    }
}
