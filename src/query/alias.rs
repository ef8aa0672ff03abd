//! Join alias generation
//!
//! Every joined relation gets a random 5-letter lowercase alias. The alias map
//! is keyed by the parent alias (or the root collection) and the path segment,
//! so repeated traversals of the same relation share one join.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALIAS_LEN: usize = 5;

/// Generates unique lowercase aliases
#[derive(Debug)]
pub struct AliasAllocator {
    rng: StdRng,
    issued: HashSet<String>,
}

impl Default for AliasAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasAllocator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            issued: HashSet::new(),
        }
    }

    /// Deterministic allocator for reproducible output
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }

    /// Draw a fresh alias, never repeating one already issued
    pub fn allocate(&mut self) -> String {
        loop {
            let alias: String = (0..ALIAS_LEN)
                .map(|_| char::from(self.rng.gen_range(b'a'..=b'z')))
                .collect();
            if self.issued.insert(alias.clone()) {
                return alias;
            }
        }
    }
}

/// Key of a joined hop: the table it was joined from and the segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AliasKey {
    parent: Option<String>,
    segment: String,
}

/// (parent alias, segment) → alias; `None` parent is the root collection
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    entries: HashMap<AliasKey, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, parent: Option<&str>, segment: &str) -> Option<&str> {
        self.entries
            .get(&AliasKey {
                parent: parent.map(str::to_string),
                segment: segment.to_string(),
            })
            .map(String::as_str)
    }

    pub fn insert(&mut self, parent: Option<&str>, segment: &str, alias: impl Into<String>) {
        self.entries.insert(
            AliasKey {
                parent: parent.map(str::to_string),
                segment: segment.to_string(),
            },
            alias.into(),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Follow `segments` from the root; `None` if any hop was never joined
    pub fn lookup_path<S: AsRef<str>>(&self, segments: &[S]) -> Option<&str> {
        let mut parent: Option<&str> = None;
        for segment in segments {
            parent = Some(self.get(parent, segment.as_ref())?);
        }
        parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_shape() {
        let mut allocator = AliasAllocator::new();
        let alias = allocator.allocate();
        assert_eq!(alias.len(), 5);
        assert!(alias.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_seeded_allocator_is_reproducible() {
        let mut a = AliasAllocator::seeded(7);
        let mut b = AliasAllocator::seeded(7);
        for _ in 0..10 {
            assert_eq!(a.allocate(), b.allocate());
        }
    }

    #[test]
    fn test_aliases_are_unique() {
        let mut allocator = AliasAllocator::seeded(1);
        let mut seen = HashSet::new();
        for _ in 0..500 {
            assert!(seen.insert(allocator.allocate()));
        }
    }

    #[test]
    fn test_map_is_keyed_by_parent() {
        let mut map = AliasMap::new();
        map.insert(None, "author", "abcde");
        map.insert(Some("abcde"), "company", "fghij");
        map.insert(Some("zzzzz"), "company", "klmno");

        assert_eq!(map.get(None, "author"), Some("abcde"));
        assert_eq!(map.get(Some("abcde"), "company"), Some("fghij"));
        assert_eq!(map.get(None, "company"), None);
        assert_eq!(map.lookup_path(&["author", "company"]), Some("fghij"));
        assert_eq!(map.lookup_path(&["author", "missing"]), None);
        assert_eq!(map.len(), 3);
    }
}
