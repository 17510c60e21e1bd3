use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk followed set: a flat map from decimal user id to `true`. Presence
/// of the key is what denotes "followed"; the value is never read back.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FollowFile {
    follows: HashMap<String, bool>,
}

#[derive(Debug)]
pub struct FollowStore {
    path: PathBuf,
    follows: HashMap<String, bool>,
}

impl FollowStore {
    /// Opens the store at `path`. A missing file is an empty store (first
    /// run); an unreadable or corrupt file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let follows = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file: FollowFile = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            file.follows
        } else {
            HashMap::new()
        };
        Ok(Self { path, follows })
    }

    pub fn follow(&mut self, user_id: u64) -> Result<()> {
        self.follows.insert(user_id.to_string(), true);
        self.save()
    }

    pub fn unfollow(&mut self, user_id: u64) -> Result<()> {
        self.follows.remove(&user_id.to_string());
        self.save()
    }

    pub fn is_followed(&self, user_id: u64) -> bool {
        self.follows.contains_key(&user_id.to_string())
    }

    /// All followed ids, unordered. Keys that don't parse as ids are skipped.
    pub fn all_followed(&self) -> HashSet<u64> {
        self.follows
            .keys()
            .filter_map(|key| key.parse::<u64>().ok())
            .collect()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = FollowFile {
            follows: self.follows.clone(),
        };
        let contents = serde_json::to_string(&file)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}
