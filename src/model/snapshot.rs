use std::collections::HashSet;

/// An entity with a stable identity across polls (client uuid, container id).
pub trait Keyed {
    fn identity(&self) -> &str;
}

/// The entities of one collection as of a single fetch, in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceSnapshot<T> {
    items: Vec<T>,
}

impl<T> ResourceSnapshot<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T: Keyed> ResourceSnapshot<T> {
    /// First identity that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.items.len());
        self.items
            .iter()
            .map(Keyed::identity)
            .find(|id| !seen.insert(*id))
    }
}

impl<T> FromIterator<T> for ResourceSnapshot<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a ResourceSnapshot<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str);

    impl Keyed for Item {
        fn identity(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn first_duplicate_none_for_unique() {
        let s: ResourceSnapshot<Item> = [Item("a"), Item("b")].into_iter().collect();
        assert_eq!(s.first_duplicate(), None);
    }

    #[test]
    fn first_duplicate_finds_repeat() {
        let s = ResourceSnapshot::new(vec![Item("a"), Item("b"), Item("a")]);
        assert_eq!(s.first_duplicate(), Some("a"));
    }
}
