//! Filter and blacklist rule groups.
//!
//! A rule group is an ordered list of pattern strings tagged with the kind of
//! rule it holds. Filter groups list the wildcard names files must match to
//! take part in a sync; blacklist groups list names or relative paths to skip.
//!
//! Besides living inside a [`Profile`](crate::Profile), a group can be flattened
//! into a plain key/value map ([`RuleGroup::to_settings`]) with the items
//! joined by `;`, which is how it is exchanged with generic settings backends.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

const DATA_SEPARATOR: char = ';';

/// The kind of rules a group holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Filters,
    Blacklist,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Filters => write!(f, "filters"),
            RuleKind::Blacklist => write!(f, "blacklist"),
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "filters" | "filter" => Ok(RuleKind::Filters),
            "blacklist" => Ok(RuleKind::Blacklist),
            other => Err(ProfileError::InvalidSettings(format!(
                "unknown rule type '{other}'; expected: filters, blacklist"
            ))),
        }
    }
}

/// A named, typed list of rule patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub name: String,
    #[serde(default)]
    pub data: Vec<String>,
}

impl RuleGroup {
    pub fn new(kind: RuleKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            data: Vec::new(),
        }
    }

    /// An empty filter group named after its position in a bundle list.
    pub fn filters(index: usize) -> Self {
        Self::new(RuleKind::Filters, format!("Filter #{index}"))
    }

    pub fn default_filters() -> Self {
        Self::filters(1)
    }

    pub fn default_blacklist() -> Self {
        Self::new(RuleKind::Blacklist, "Blacklist")
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.data.get(i).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(String::as_str)
    }

    /// Append `item` unless it is already present. Returns whether it was added.
    pub fn add_item(&mut self, item: impl Into<String>) -> bool {
        let item = item.into();
        if self.data.contains(&item) {
            return false;
        }
        self.data.push(item);
        true
    }

    /// Remove every occurrence of `item`.
    pub fn remove_item(&mut self, item: &str) {
        self.data.retain(|d| d != item);
    }

    /// Remove the item at `i`; out-of-range indices are ignored.
    pub fn remove_at(&mut self, i: usize) {
        if i < self.data.len() {
            self.data.remove(i);
        }
    }

    /// Append all `items` as-is (no de-duplication).
    pub fn import_data<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data.extend(items.into_iter().map(Into::into));
    }

    /// Flatten into `type` / `name` / `data` settings keys.
    pub fn to_settings(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("type".to_string(), self.kind.to_string());
        map.insert("name".to_string(), self.name.clone());
        map.insert(
            "data".to_string(),
            self.data.join(&DATA_SEPARATOR.to_string()),
        );
        map
    }

    /// Rebuild a group from a settings map produced by [`to_settings`](Self::to_settings).
    ///
    /// A missing `name` falls back to the kind's default name; an empty `data`
    /// value means no items.
    pub fn from_settings(map: &BTreeMap<String, String>) -> Result<Self, ProfileError> {
        let kind: RuleKind = map
            .get("type")
            .ok_or_else(|| ProfileError::InvalidSettings("missing 'type' key".to_string()))?
            .parse()?;
        let mut group = match kind {
            RuleKind::Filters => Self::default_filters(),
            RuleKind::Blacklist => Self::default_blacklist(),
        };
        if let Some(name) = map.get("name") {
            group.name = name.clone();
        }
        if let Some(data) = map.get("data").filter(|d| !d.is_empty()) {
            group.import_data(data.split(DATA_SEPARATOR));
        }
        Ok(group)
    }
}
