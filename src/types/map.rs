use super::{AtomicValue, XdmValue};
use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An XDM map: insertion-ordered, persistent in style (`put`/`remove`
/// return new maps). Inserting an existing key replaces its value, so
/// duplicate keys are last-wins by construction.
#[derive(Debug, Clone)]
pub struct XdmMap<N> {
    entries: IndexMap<AtomicValue, XdmValue<N>>,
}

impl<N: Clone> XdmMap<N> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn from_entries(entries: Vec<(AtomicValue, XdmValue<N>)>) -> Self {
        let mut map = Self::with_capacity(entries.len());
        for (key, value) in entries {
            map.entries.insert(key, value);
        }
        map
    }

    pub fn get(&self, key: &AtomicValue) -> Option<&XdmValue<N>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &AtomicValue) -> bool {
        self.entries.contains_key(key)
    }

    pub fn put(&self, key: AtomicValue, value: XdmValue<N>) -> Self {
        let mut new_map = self.clone();
        new_map.entries.insert(key, value);
        new_map
    }

    pub fn remove(&self, key: &AtomicValue) -> Self {
        let mut new_map = self.clone();
        new_map.entries.shift_remove(key);
        new_map
    }

    pub fn keys(&self) -> impl Iterator<Item = &AtomicValue> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &XdmValue<N>> {
        self.entries.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&AtomicValue, &XdmValue<N>)> {
        self.entries.iter()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges `other` into `self`; entries of `other` win on key clashes.
    pub fn merge(&self, other: &XdmMap<N>) -> Self {
        let mut result = self.clone();
        for (k, v) in other.entries.iter() {
            result.entries.insert(k.clone(), v.clone());
        }
        result
    }
}

impl<N: Clone> Default for XdmMap<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: PartialEq + Clone> PartialEq for XdmMap<N> {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries
            .iter()
            .all(|(k, v)| other.entries.get(k).is_some_and(|other_v| v == other_v))
    }
}

impl<N: Eq + Clone> Eq for XdmMap<N> {}

impl<N: Hash + Clone> Hash for XdmMap<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.len().hash(state);
        for (key, value) in &self.entries {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<N: fmt::Debug> fmt::Display for XdmMap<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map {{ ")?;
        let mut first = true;
        for (k, v) in &self.entries {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", k, v)?;
            first = false;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_operations() {
        let map: XdmMap<()> = XdmMap::new();
        assert!(map.is_empty());

        let map = map.put(
            AtomicValue::String("a".to_string()),
            XdmValue::from_integer(1),
        );
        let map = map.put(
            AtomicValue::String("b".to_string()),
            XdmValue::from_integer(2),
        );
        assert_eq!(map.size(), 2);
        assert!(map.contains_key(&AtomicValue::String("a".to_string())));
        assert!(map.get(&AtomicValue::String("a".to_string())).is_some());
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let map: XdmMap<()> = XdmMap::from_entries(vec![
            (AtomicValue::String("k".into()), XdmValue::from_integer(1)),
            (AtomicValue::String("k".into()), XdmValue::from_integer(2)),
        ]);
        assert_eq!(map.size(), 1);
        assert_eq!(
            map.get(&AtomicValue::String("k".into())),
            Some(&XdmValue::from_integer(2))
        );
    }

    #[test]
    fn test_map_merge_last_wins() {
        let map1: XdmMap<()> = XdmMap::from_entries(vec![(
            AtomicValue::String("a".into()),
            XdmValue::from_integer(1),
        )]);
        let map2: XdmMap<()> = XdmMap::from_entries(vec![(
            AtomicValue::String("a".into()),
            XdmValue::from_integer(9),
        )]);

        let merged = map1.merge(&map2);
        assert_eq!(merged.size(), 1);
        assert_eq!(
            merged.get(&AtomicValue::String("a".into())),
            Some(&XdmValue::from_integer(9))
        );
    }

    #[test]
    fn test_map_remove() {
        let map: XdmMap<()> = XdmMap::from_entries(vec![
            (AtomicValue::String("a".into()), XdmValue::from_integer(1)),
            (AtomicValue::String("b".into()), XdmValue::from_integer(2)),
        ]);

        let map = map.remove(&AtomicValue::String("a".into()));
        assert_eq!(map.size(), 1);
        assert!(!map.contains_key(&AtomicValue::String("a".into())));
    }

    #[test]
    fn test_numeric_key_identity() {
        // 1 and 1.0 are the same key.
        let map: XdmMap<()> = XdmMap::from_entries(vec![(
            AtomicValue::Integer(1),
            XdmValue::from_string("one"),
        )]);
        assert!(map.contains_key(&AtomicValue::Double(1.0)));
    }
}
