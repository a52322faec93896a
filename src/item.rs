//! Items: the properties and type annotations that make up transactions.

use serde::{Deserialize, Serialize};

use crate::common::HeapSize;

/// Prefix marking a subject type token.
pub const SUBJECT_TYPE_PREFIX: &str = "s/";
/// Prefix marking an object type token.
pub const OBJECT_TYPE_PREFIX: &str = "o/";

/// The dense frequency rank of an item; rank 0 is the most frequent.
///
/// Ranks double as indexes into the frozen dictionary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    #[inline(always)] pub fn from_rank(rank: u32) -> Self { Self(rank) }
    #[inline(always)] pub fn rank(self) -> u32 { self.0 }
    #[inline(always)] pub fn index(self) -> usize { self.0 as usize }
}

/// What an item stands for, read off its name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// A property or qualifier; anything without a type prefix.
    Property,
    SubjectType,
    ObjectType,
}

impl ItemKind {
    pub fn classify(name: &str) -> Self {
        if name.starts_with(SUBJECT_TYPE_PREFIX) {
            ItemKind::SubjectType
        } else if name.starts_with(OBJECT_TYPE_PREFIX) {
            ItemKind::ObjectType
        } else {
            ItemKind::Property
        }
    }
    #[inline] pub fn is_property(self) -> bool { self == ItemKind::Property }
    #[inline] pub fn is_type(self) -> bool { !self.is_property() }
}

/// One entry of a frozen dictionary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    name: Box<str>,
    id: ItemId,
    count: u64,
    kind: ItemKind,
}

impl Item {
    pub(crate) fn new(name: Box<str>, id: ItemId, count: u64) -> Self {
        let kind = ItemKind::classify(&name);
        Self { name, id, count, kind }
    }
    pub fn name(&self) -> &str { &self.name }
    pub fn id(&self) -> ItemId { self.id }
    /// Number of transactions containing the item when the dictionary was built.
    pub fn count(&self) -> u64 { self.count }
    pub fn kind(&self) -> ItemKind { self.kind }
    pub fn is_property(&self) -> bool { self.kind.is_property() }
    pub fn is_type(&self) -> bool { self.kind.is_type() }
}

impl HeapSize for Item {
    fn heap_size(&self) -> (usize, usize) { self.name.heap_size() }
}
