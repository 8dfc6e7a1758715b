//! Capability names.
//!
//! Names are matched case-insensitively: `orgChart`, `OrgChart` and
//! `orgchart` all refer to the same capability. The canonical form is
//! ASCII lowercase; the spelling the name was created with is kept so an
//! undeclared capability can still be looked up where the caller said.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical identifier of a capability (e.g. `config`, `ui`).
///
/// Equality, ordering and hashing only look at the canonical form.
#[derive(Clone)]
pub struct CapabilityName {
    canonical: String,
    original: String,
}

impl CapabilityName {
    /// Create a name, canonicalizing its casing.
    pub fn new(name: impl AsRef<str>) -> Self {
        let original = name.as_ref().trim().to_string();
        CapabilityName {
            canonical: original.to_ascii_lowercase(),
            original,
        }
    }

    /// Get the canonical string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Get the spelling the name was created with (trimmed).
    #[inline]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Check if the name is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl PartialEq for CapabilityName {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for CapabilityName {}

impl PartialOrd for CapabilityName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CapabilityName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl Hash for CapabilityName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl AsRef<str> for CapabilityName {
    fn as_ref(&self) -> &str {
        &self.canonical
    }
}

impl Borrow<str> for CapabilityName {
    fn borrow(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Debug for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.canonical, f)
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.canonical, f)
    }
}

impl From<&str> for CapabilityName {
    fn from(s: &str) -> Self {
        CapabilityName::new(s)
    }
}

impl From<String> for CapabilityName {
    fn from(s: String) -> Self {
        CapabilityName::new(s)
    }
}

impl From<&String> for CapabilityName {
    fn from(s: &String) -> Self {
        CapabilityName::new(s)
    }
}

impl Serialize for CapabilityName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.canonical.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CapabilityName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(CapabilityName::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_case_insensitive() {
        let a = CapabilityName::new("orgChart");
        let b = CapabilityName::new("ORGCHART");
        let c = CapabilityName::new("raciMatrix");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "orgchart");
    }

    #[test]
    fn test_name_hash_lookup_by_str() {
        use std::collections::BTreeMap;

        let mut map = BTreeMap::new();
        map.insert(CapabilityName::new("Config"), 1);

        assert_eq!(map.get("config"), Some(&1));
    }

    #[test]
    fn test_name_keeps_original_spelling() {
        let name = CapabilityName::new(" orgChart ");

        assert_eq!(name.original(), "orgChart");
        assert_eq!(name.as_str(), "orgchart");
        assert_eq!(name, CapabilityName::new("ORGCHART"));
        assert_eq!(name.to_string(), "orgchart");
    }

    #[test]
    fn test_name_trims_whitespace() {
        assert_eq!(CapabilityName::new("  ui "), CapabilityName::new("ui"));
    }
}
