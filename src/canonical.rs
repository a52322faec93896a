//! Canonical item lists: the only shape in which item sets reach the tree.

use smallvec::SmallVec;

use crate::item::ItemId;

/// Item ids sorted by rank (most frequent first) without duplicates.
///
/// Every root-to-leaf path of a schema tree is a canonical list, which is what lets
/// transactions share prefixes and lets ancestry checks stop early.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CanonicalItems {
    ids: SmallVec<[ItemId; 8]>,
}

impl CanonicalItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorts and deduplicates `ids`.
    pub fn from_ids(ids: impl IntoIterator<Item = ItemId>) -> Self {
        let mut ids: SmallVec<[ItemId; 8]> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    #[inline] pub fn as_slice(&self) -> &[ItemId] { &self.ids }
    #[inline] pub fn iter(&self) -> impl DoubleEndedIterator<Item = ItemId> + ExactSizeIterator + '_ { self.ids.iter().copied() }
    #[inline] pub fn len(&self) -> usize { self.ids.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// The least frequent item, which sits deepest on any path containing the list.
    #[inline] pub fn last(&self) -> Option<ItemId> { self.ids.last().copied() }

    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Adds `id` at its canonical position; returns false if already present.
    pub fn insert(&mut self, id: ItemId) -> bool {
        match self.ids.binary_search(&id) {
            Ok(_) => false,
            Err(position) => {
                self.ids.insert(position, id);
                true
            }
        }
    }

    /// A copy of `self` with `id` added.
    pub fn with(&self, id: ItemId) -> Self {
        let mut result = self.clone();
        result.insert(id);
        result
    }
}

impl FromIterator<ItemId> for CanonicalItems {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

impl<'a> IntoIterator for &'a CanonicalItems {
    type Item = ItemId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, ItemId>>;
    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter().copied()
    }
}

#[cfg(test)]
mod test {

    use super::CanonicalItems;
    use crate::item::ItemId;

    fn ids(ranks: &[u32]) -> Vec<ItemId> {
        ranks.iter().copied().map(ItemId::from_rank).collect()
    }

    #[test]
    fn sorted_and_deduplicated() {
        let list = CanonicalItems::from_ids(ids(&[4, 1, 4, 0, 2, 1]));
        assert_eq!(list.as_slice(), &ids(&[0, 1, 2, 4])[..]);
        assert_eq!(list.last(), Some(ItemId::from_rank(4)));
        assert!(list.contains(ItemId::from_rank(2)));
        assert!(!list.contains(ItemId::from_rank(3)));

        let again: CanonicalItems = list.iter().collect();
        assert_eq!(again, list);
    }

    #[test]
    fn insert_keeps_order() {
        let mut list = CanonicalItems::from_ids(ids(&[0, 5]));
        assert!(list.insert(ItemId::from_rank(3)));
        assert!(!list.insert(ItemId::from_rank(5)));
        assert_eq!(list.as_slice(), &ids(&[0, 3, 5])[..]);
        assert_eq!(list.with(ItemId::from_rank(1)).as_slice(), &ids(&[0, 1, 3, 5])[..]);
        assert!(CanonicalItems::new().is_empty());
    }
}
