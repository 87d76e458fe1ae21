//! Change records emitted by the mapper and the bounded history that holds them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of entries kept by a [`ChangeLog`]
pub const DEFAULT_CHANGE_LOG_CAPACITY: usize = 20;

/// Category tag of a change, used by displays to colour entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTag {
    Brightness,
    Warmth,
    Reverb,
    Compressor,
    Bass,
    Presence,
    /// Engine notices such as a rewriter fallback
    System,
}

impl ChangeTag {
    /// Display colour as 0xAARRGGBB
    pub fn argb(self) -> u32 {
        match self {
            ChangeTag::Brightness => 0xff8a_ffb4,
            ChangeTag::Warmth => 0xffa7_8bfa,
            ChangeTag::Reverb => 0xff10_b981,
            ChangeTag::Compressor => 0xffff_6b35,
            ChangeTag::Bass => 0xff4f_c3f7,
            ChangeTag::Presence => 0xffff_b74d,
            ChangeTag::System => 0xffff_ffff,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeTag::Brightness => "brightness",
            ChangeTag::Warmth => "warmth",
            ChangeTag::Reverb => "reverb",
            ChangeTag::Compressor => "compressor",
            ChangeTag::Bass => "bass",
            ChangeTag::Presence => "presence",
            ChangeTag::System => "system",
        }
    }
}

impl std::fmt::Display for ChangeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One human-readable record of a parameter change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub description: String,
    pub tag: ChangeTag,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEntry {
    pub fn new(description: impl Into<String>, tag: ChangeTag) -> Self {
        Self {
            description: description.into(),
            tag,
            timestamp: Utc::now(),
        }
    }
}

/// Bounded change history, oldest entry evicted first
#[derive(Debug, Clone)]
pub struct ChangeLog {
    entries: VecDeque<ChangeEntry>,
    capacity: usize,
}

impl Default for ChangeLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHANGE_LOG_CAPACITY)
    }
}

impl ChangeLog {
    /// Create a log holding at most `capacity` entries (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: ChangeEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ChangeEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.entries.iter()
    }

    /// Owned copy of the entries, oldest first
    pub fn snapshot(&self) -> Vec<ChangeEntry> {
        self.entries.iter().cloned().collect()
    }
}
