//! Per-user shelves: likes and watched / to-watch tags.
//!
//! Shelves reference movies by title, matching how users pick them out of a
//! results list. A deleted movie leaves its shelf entries behind; they are
//! harmless and disappear the next time the user re-tags.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// The two tag states a movie can be in for a user. Re-tagging replaces the
/// previous tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tag {
    Watched,
    ToWatch,
}

/// All users' likes and tags. BTree maps keep listings in a stable order.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Shelf {
    likes: BTreeMap<String, BTreeSet<String>>,
    tags: BTreeMap<String, BTreeMap<String, Tag>>,
}

impl Shelf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a like. Returns false when the user already liked this title.
    pub fn like(&mut self, user: &str, title: &str) -> bool {
        self.likes
            .entry(user.to_string())
            .or_default()
            .insert(title.to_string())
    }

    /// Titles the user has liked, in stable order.
    pub fn liked_titles(&self, user: &str) -> Vec<&str> {
        self.likes
            .get(user)
            .map(|titles| titles.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Tag a title for a user, replacing any previous tag.
    pub fn tag(&mut self, user: &str, title: &str, tag: Tag) {
        self.tags
            .entry(user.to_string())
            .or_default()
            .insert(title.to_string(), tag);
    }

    /// Titles the user has given a specific tag, in stable order.
    pub fn tagged(&self, user: &str, tag: Tag) -> Vec<&str> {
        self.tags
            .get(user)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, t)| **t == tag)
                    .map(|(title, _)| title.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
