//! Asset locations and declared types
//!
//! A [`Locator`] is what a label scan produces: an opaque backend identifier,
//! the human-readable key (address) used for name lookup, and the type the
//! asset was declared with.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime identity of an asset type.
///
/// Equality and hashing use only the [`TypeId`]; the name is carried for
/// log lines and error messages.
#[derive(Debug, Clone, Copy)]
pub struct AssetType {
    id: TypeId,
    name: &'static str,
}

impl AssetType {
    /// The asset type for `T`
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Underlying type id
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.id
    }

    /// Full type name, as reported by the compiler
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Check whether this describes `T`
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for AssetType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AssetType {}

impl Hash for AssetType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Backend-assigned identifier of an asset location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocatorId(pub u64);

/// Where an asset lives, as reported by a label scan.
///
/// Immutable once created; the index only ever clones it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    id: LocatorId,
    key: String,
    asset_type: AssetType,
}

impl Locator {
    /// Create a locator
    #[must_use]
    pub fn new(id: LocatorId, key: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            id,
            key: key.into(),
            asset_type,
        }
    }

    /// Backend identifier
    #[must_use]
    pub const fn id(&self) -> LocatorId {
        self.id
    }

    /// Human-readable key (address or name)
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Type the asset was declared with
    #[must_use]
    pub const fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    /// Substring match against the key
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.key.contains(name)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Texture;

    #[test]
    fn test_asset_type_identity() {
        assert_eq!(AssetType::of::<Texture>(), AssetType::of::<Texture>());
        assert_ne!(AssetType::of::<Texture>(), AssetType::of::<String>());
        assert!(AssetType::of::<String>().is::<String>());
        assert!(AssetType::of::<Texture>().name().ends_with("Texture"));
    }

    #[test]
    fn test_locator_matches_substring() {
        let locator = Locator::new(LocatorId(7), "enemy_goblin", AssetType::of::<Texture>());
        assert!(locator.matches("goblin"));
        assert!(locator.matches("enemy"));
        assert!(!locator.matches("orc"));
        assert_eq!(locator.to_string(), "enemy_goblin");
    }
}
