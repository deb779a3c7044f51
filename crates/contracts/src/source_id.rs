//! SourceId - Cheap-to-clone camera source identifier
//!
//! Uses Arc<str> internally; every log line and metric label of the
//! production loop carries one, so clones must stay O(1).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Camera source identifier with cheap cloning.
///
/// Also the key of the camera registry: two lookups with the same
/// `SourceId` share one camera, different ids never do.
///
/// # Examples
/// ```
/// use contracts::SourceId;
///
/// let id: SourceId = "plaza".into();
/// let id2 = id.clone();
/// assert_eq!(id, id2);
/// assert_eq!(id.as_str(), "plaza");
/// ```
#[derive(Clone, Default)]
pub struct SourceId(Arc<str>);

impl SourceId {
    /// Create a new SourceId from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SourceId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for SourceId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SourceId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for SourceId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({:?})", self.0)
    }
}

impl PartialEq for SourceId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for SourceId {}

impl PartialEq<str> for SourceId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for SourceId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Must hash like `str` so `HashMap<SourceId, _>::get(&str)` works.
impl Hash for SourceId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for SourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_shares_allocation() {
        let id1: SourceId = "plaza".into();
        let id2 = id1.clone();
        assert_eq!(id1.as_str().as_ptr(), id2.as_str().as_ptr());
    }

    #[test]
    fn test_hashmap_lookup_by_str() {
        let mut map: HashMap<SourceId, i32> = HashMap::new();
        map.insert("plaza".into(), 1);
        map.insert("harbour".into(), 2);

        assert_eq!(map.get("plaza"), Some(&1));
        assert_eq!(map.get("harbour"), Some(&2));
        assert_eq!(map.get("station"), None);
    }

    #[test]
    fn test_serde() {
        let id: SourceId = "plaza".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"plaza\"");

        let parsed: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
