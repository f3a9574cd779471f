//! Location index
//!
//! Maps each asset type to the locators discovered for it, in discovery
//! order. Lookups are by name: an exact key match when one exists, otherwise
//! the keys containing the name, first-inserted first.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::error::AssetError;
use super::locator::{AssetType, Locator};

/// How a requested name is matched against locator keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Exact key match, falling back to substring search when there is none
    #[default]
    ExactThenSubstring,
    /// Substring search only
    Substring,
}

/// Result of a multi-name lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matches {
    /// Matching locators, grouped by requested name in request order
    pub locators: Vec<Locator>,
    /// Requested names that matched nothing
    pub missing: Vec<String>,
}

impl Matches {
    /// Whether every requested name matched at least one locator
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Type-bucketed index of asset locations.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    buckets: FxHashMap<AssetType, Vec<Locator>>,
    policy: MatchPolicy,
}

impl LocationIndex {
    /// Create an empty index with the default match policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with the given match policy
    #[must_use]
    pub fn with_policy(policy: MatchPolicy) -> Self {
        Self {
            buckets: FxHashMap::default(),
            policy,
        }
    }

    /// Append scan results to the bucket for `asset_type`.
    ///
    /// Locators already present (from another label) are appended again.
    /// Returns the number appended.
    pub fn append(
        &mut self,
        asset_type: AssetType,
        locators: impl IntoIterator<Item = Locator>,
    ) -> usize {
        let bucket = self.buckets.entry(asset_type).or_default();
        let before = bucket.len();
        bucket.extend(locators);
        bucket.len() - before
    }

    /// All locators known for `asset_type`, in discovery order
    #[must_use]
    pub fn locators(&self, asset_type: AssetType) -> &[Locator] {
        self.buckets
            .get(&asset_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether any scan produced locators of `asset_type`
    #[must_use]
    pub fn contains_type(&self, asset_type: AssetType) -> bool {
        self.buckets.contains_key(&asset_type)
    }

    /// Total number of indexed locators
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Check if the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    /// Find the first locator matching `name`.
    ///
    /// # Errors
    ///
    /// [`AssetError::UnknownType`] if nothing of this type was indexed,
    /// [`AssetError::NotFound`] if no key matches.
    pub fn find(&self, asset_type: AssetType, name: &str) -> Result<&Locator, AssetError> {
        let bucket = self.bucket(asset_type)?;

        let exact = match self.policy {
            MatchPolicy::ExactThenSubstring => bucket.iter().find(|l| l.key() == name),
            MatchPolicy::Substring => None,
        };

        exact
            .or_else(|| bucket.iter().find(|l| l.matches(name)))
            .ok_or_else(|| AssetError::NotFound {
                asset_type,
                name: name.to_string(),
            })
    }

    /// Collect the matches for every name, in `names` order.
    ///
    /// A name with no match contributes nothing to `locators` and is listed
    /// in `missing`; deciding whether that is an error is up to the caller.
    ///
    /// # Errors
    ///
    /// [`AssetError::UnknownType`] if nothing of this type was indexed.
    pub fn find_all<S: AsRef<str>>(
        &self,
        asset_type: AssetType,
        names: &[S],
    ) -> Result<Matches, AssetError> {
        let bucket = self.bucket(asset_type)?;
        let mut matches = Matches::default();

        for name in names.iter().map(AsRef::as_ref) {
            let before = matches.locators.len();

            if self.policy == MatchPolicy::ExactThenSubstring {
                matches
                    .locators
                    .extend(bucket.iter().filter(|l| l.key() == name).cloned());
            }
            if matches.locators.len() == before {
                matches
                    .locators
                    .extend(bucket.iter().filter(|l| l.matches(name)).cloned());
            }
            if matches.locators.len() == before {
                matches.missing.push(name.to_string());
            }
        }

        Ok(matches)
    }

    fn bucket(&self, asset_type: AssetType) -> Result<&[Locator], AssetError> {
        self.buckets
            .get(&asset_type)
            .map(Vec::as_slice)
            .ok_or(AssetError::UnknownType { asset_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::locator::LocatorId;

    struct Sprite;

    fn sprite(id: u64, key: &str) -> Locator {
        Locator::new(LocatorId(id), key, AssetType::of::<Sprite>())
    }

    fn enemy_index(policy: MatchPolicy) -> LocationIndex {
        let mut index = LocationIndex::with_policy(policy);
        index.append(
            AssetType::of::<Sprite>(),
            [sprite(1, "enemy_goblin"), sprite(2, "enemy_orc")],
        );
        index
    }

    #[test]
    fn test_find_substring_first_inserted_wins() {
        let index = enemy_index(MatchPolicy::Substring);
        let sprite_type = AssetType::of::<Sprite>();

        assert_eq!(index.find(sprite_type, "goblin").unwrap().key(), "enemy_goblin");
        assert_eq!(index.find(sprite_type, "enemy").unwrap().key(), "enemy_goblin");
    }

    #[test]
    fn test_exact_match_preferred() {
        let mut index = LocationIndex::new();
        let sprite_type = AssetType::of::<Sprite>();
        index.append(sprite_type, [sprite(1, "orc_chief"), sprite(2, "orc")]);

        assert_eq!(index.find(sprite_type, "orc").unwrap().id(), LocatorId(2));

        let substring_only = {
            let mut index = LocationIndex::with_policy(MatchPolicy::Substring);
            index.append(sprite_type, [sprite(1, "orc_chief"), sprite(2, "orc")]);
            index
        };
        assert_eq!(substring_only.find(sprite_type, "orc").unwrap().id(), LocatorId(1));
    }

    #[test]
    fn test_find_errors() {
        let index = enemy_index(MatchPolicy::default());

        let err = index.find(AssetType::of::<String>(), "goblin").unwrap_err();
        assert!(matches!(err, AssetError::UnknownType { .. }));

        let err = index.find(AssetType::of::<Sprite>(), "dragon").unwrap_err();
        assert!(matches!(err, AssetError::NotFound { ref name, .. } if name == "dragon"));
    }

    #[test]
    fn test_find_all_in_name_order_with_missing() {
        let index = enemy_index(MatchPolicy::Substring);
        let matches = index
            .find_all(AssetType::of::<Sprite>(), &["orc", "dragon", "enemy"])
            .unwrap();

        let keys: Vec<_> = matches.locators.iter().map(Locator::key).collect();
        assert_eq!(keys, ["enemy_orc", "enemy_goblin", "enemy_orc"]);
        assert_eq!(matches.missing, ["dragon"]);
        assert!(!matches.is_complete());
    }

    #[test]
    fn test_duplicates_across_labels_are_kept() {
        let mut index = LocationIndex::new();
        let sprite_type = AssetType::of::<Sprite>();

        assert_eq!(index.append(sprite_type, [sprite(1, "hero")]), 1);
        assert_eq!(index.append(sprite_type, [sprite(1, "hero")]), 1);
        assert_eq!(index.locators(sprite_type).len(), 2);
        assert_eq!(index.len(), 2);
        assert!(index.contains_type(sprite_type));
    }
}
