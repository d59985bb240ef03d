//! Asset identifiers.
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// The name of an asset in one of a network's component tables (e.g. `Lk1`).
///
/// Names are shared between tables, series and model variables, so cloning is cheap.
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Deserialize, Debug, Serialize)]
pub struct AssetID(pub Rc<str>);

impl AssetID {
    /// Create a new ID from a string slice
    pub fn new(id: &str) -> Self {
        Self(Rc::from(id))
    }

    /// The ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AssetID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Deref for AssetID {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetID {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AssetID {
    fn from(s: String) -> Self {
        Self(Rc::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_lookup_by_str() {
        let mut capacities = IndexMap::new();
        capacities.insert(AssetID::new("Lk1"), 40.0);
        assert_eq!(capacities.get("Lk1"), Some(&40.0));
        assert!(capacities.get("Lk2").is_none());
    }

    #[test]
    fn test_display() {
        let id: AssetID = "SU1".to_string().into();
        assert_eq!(id.to_string(), "SU1");
        assert_eq!(id.as_str(), "SU1");
    }
}
