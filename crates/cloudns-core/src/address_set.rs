//! Ordered address sets and the set algebra the reconciler is built on
//!
//! An [`AddressSet`] keeps textual IP addresses in first-seen order and never
//! holds the same entry twice. Record sets are small, so membership checks are
//! linear scans.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered, duplicate-free sequence of textual IP addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct AddressSet(Vec<String>);

impl AddressSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an address unless it is already present
    ///
    /// Returns `true` if the address was added.
    pub fn insert(&mut self, address: impl Into<String>) -> bool {
        let address = address.into();
        if self.contains(&address) {
            return false;
        }
        self.0.push(address);
        true
    }

    pub fn contains(&self, address: &str) -> bool {
        self.0.iter().any(|a| a == address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for AddressSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = AddressSet::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

impl From<Vec<String>> for AddressSet {
    fn from(addresses: Vec<String>) -> Self {
        addresses.into_iter().collect()
    }
}

impl From<AddressSet> for Vec<String> {
    fn from(set: AddressSet) -> Self {
        set.0
    }
}

impl IntoIterator for AddressSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for AddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Union of two sets: `primary` in order, then the entries of `secondary`
/// not already present, in their order
pub fn merge(primary: &AddressSet, secondary: &AddressSet) -> AddressSet {
    let mut merged = primary.clone();
    for address in secondary {
        merged.insert(address.as_str());
    }
    merged
}

/// Entries of `a` that are absent from `b`, in `a`'s order
pub fn diff(a: &AddressSet, b: &AddressSet) -> AddressSet {
    a.iter().filter(|address| !b.contains(address)).cloned().collect()
}
