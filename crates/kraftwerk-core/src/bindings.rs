//! Named datasets of one run.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;

/// Datasets bound by name during a run.
///
/// A store is owned by a single pipeline run and lent to steps and the VTL
/// engine as `&mut`.
#[derive(Debug, Clone, Default)]
pub struct BindingStore {
    bindings: BTreeMap<String, DataFrame>,
}

impl BindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a dataset, replacing any previous one with the same name.
    pub fn put(&mut self, name: impl Into<String>, frame: DataFrame) {
        self.bindings.insert(name.into(), frame);
    }

    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.bindings.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataFrame> {
        self.bindings.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<DataFrame> {
        self.bindings.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataFrame)> {
        self.bindings.iter().map(|(name, frame)| (name.as_str(), frame))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn row_counts(&self) -> BTreeMap<String, usize> {
        self.bindings
            .iter()
            .map(|(name, frame)| (name.clone(), frame.height()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::Column;

    #[test]
    fn test_put_replace_remove() {
        let mut store = BindingStore::new();
        let one = DataFrame::new(vec![Column::new("A".into(), vec!["x"])]).unwrap();
        let two = DataFrame::new(vec![Column::new("A".into(), vec!["x", "y"])]).unwrap();
        store.put("CAWI", one);
        store.put("CAWI", two);
        assert_eq!(store.len(), 1);
        assert_eq!(store.row_counts()["CAWI"], 2);
        assert!(store.remove("CAWI").is_some());
        assert!(!store.contains("CAWI"));
    }
}
