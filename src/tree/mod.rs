//! The schema tree: a prefix tree of canonical transactions with per-item header chains.
//!
//! A frozen [`SchemaTree`] is a set of parallel columns indexed by node id. Node 0 is the
//! root; it carries [`ROOT_SENTINEL`] instead of an item rank and its support is the number
//! of transactions. Children are stored as ranges of a single `kids` column, sorted by
//! item rank. Parents and header-chain links are node ids, with [`NIL`] marking their end.
//!
//! Trees are produced by [`builder::SchemaTreeBuilder`] (concurrent ingestion) or by the
//! codec, and are immutable afterwards: queries take no locks.

pub mod builder;
mod assemble;

pub(crate) use assemble::Assembler;

use crate::canonical::CanonicalItems;
use crate::common::HeapSize;
use crate::dictionary::Dictionary;
use crate::item::ItemId;

/// Item slot of the root node.
pub const ROOT_SENTINEL: u32 = u32::MAX;
/// Absent parent, or end of a header chain.
pub(crate) const NIL: u32 = u32::MAX;

/// Position of a node in its tree's columns.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
    #[inline(always)] pub fn index(self) -> usize { self.0 as usize }
}

/// A frozen schema tree together with the dictionary its ranks refer to.
#[derive(Clone, Debug)]
pub struct SchemaTree {
    pub(crate) dictionary: Dictionary,
    pub(crate) items: Vec<u32>,
    pub(crate) parents: Vec<u32>,
    pub(crate) supports: Vec<u32>,
    pub(crate) next_same: Vec<u32>,
    /// Children of node `n` are `kids[bounds[n] .. bounds[n+1]]`.
    pub(crate) bounds: Vec<u32>,
    pub(crate) kids: Vec<u32>,
    /// Header-chain head per item rank.
    pub(crate) heads: Vec<u32>,
}

impl SchemaTree {
    #[inline] pub fn dictionary(&self) -> &Dictionary { &self.dictionary }
    /// Number of nodes, the root included.
    #[inline] pub fn len(&self) -> usize { self.items.len() }
    /// A tree always has its root.
    #[inline] pub fn is_empty(&self) -> bool { false }
    /// Number of inserted transactions.
    #[inline] pub fn transactions(&self) -> u32 { self.supports[0] }

    #[inline]
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef { tree: self, id: NodeId::ROOT }
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.index() < self.len()).then_some(NodeRef { tree: self, id })
    }

    /// Every node carrying `item`, most recently linked first.
    pub fn header_chain(&self, item: ItemId) -> HeaderChain<'_> {
        let next = self.heads.get(item.index()).copied().unwrap_or(NIL);
        HeaderChain { tree: self, next }
    }

    /// Total support of `item`: the sum over its header chain.
    pub fn item_support(&self, item: ItemId) -> u64 {
        self.header_chain(item).map(|node| node.support() as u64).sum()
    }

    /// Whether every item of `path` lies on the way from `node` up to the root.
    pub fn ancestors_contain(&self, node: NodeId, path: &CanonicalItems) -> bool {
        self.node(node).map_or(false, |node| node.contains_prefix(path))
    }

    /// The node reached by inserting exactly `path`, if any transaction created it.
    pub fn find_path(&self, path: &CanonicalItems) -> Option<NodeRef<'_>> {
        path.iter().try_fold(self.root(), |node, item| node.child(item))
    }

    /// Nodes in pre-order, children in rank order.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { tree: self, stack: vec![0] }
    }

    #[inline(always)]
    fn children_range(&self, id: u32) -> std::ops::Range<usize> {
        self.bounds[id as usize] as usize .. self.bounds[id as usize + 1] as usize
    }
}

impl HeapSize for SchemaTree {
    fn heap_size(&self) -> (usize, usize) {
        let columns = [&self.items, &self.parents, &self.supports, &self.next_same, &self.bounds, &self.kids, &self.heads];
        let (mut l, mut c) = self.dictionary.heap_size();
        for column in columns {
            let (cl, cc) = column.heap_size();
            l += cl;
            c += cc;
        }
        (l, c)
    }
}

/// A node of a frozen tree.
#[derive(Copy, Clone)]
pub struct NodeRef<'a> {
    tree: &'a SchemaTree,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("item", &self.item())
            .field("support", &self.support())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}
impl Eq for NodeRef<'_> {}

impl<'a> NodeRef<'a> {
    #[inline(always)] pub fn id(self) -> NodeId { self.id }
    #[inline(always)] pub fn is_root(self) -> bool { self.id == NodeId::ROOT }
    #[inline(always)] fn rank(self) -> u32 { self.tree.items[self.id.index()] }

    /// The node's item; `None` for the root.
    #[inline]
    pub fn item(self) -> Option<ItemId> {
        let rank = self.rank();
        (rank != ROOT_SENTINEL).then_some(ItemId(rank))
    }

    /// Number of transactions whose canonical path passes through this node.
    #[inline] pub fn support(self) -> u32 { self.tree.supports[self.id.index()] }

    #[inline]
    pub fn parent(self) -> Option<NodeRef<'a>> {
        let parent = self.tree.parents[self.id.index()];
        (parent != NIL).then_some(NodeRef { tree: self.tree, id: NodeId(parent) })
    }

    /// The next node carrying the same item, along the item's header chain.
    #[inline]
    pub fn next_same(self) -> Option<NodeRef<'a>> {
        let next = self.tree.next_same[self.id.index()];
        (next != NIL).then_some(NodeRef { tree: self.tree, id: NodeId(next) })
    }

    pub fn children(self) -> impl ExactSizeIterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.kids[tree.children_range(self.id.0)].iter().map(move |&kid| NodeRef { tree, id: NodeId(kid) })
    }

    pub fn child_count(self) -> usize {
        self.tree.children_range(self.id.0).len()
    }

    pub fn child(self, item: ItemId) -> Option<NodeRef<'a>> {
        let tree = self.tree;
        let kids = &tree.kids[tree.children_range(self.id.0)];
        kids.binary_search_by_key(&item.rank(), |&kid| tree.items[kid as usize])
            .ok()
            .map(|position| NodeRef { tree, id: NodeId(kids[position]) })
    }

    /// This node and its ancestors up to, but excluding, the root.
    pub fn ancestors(self) -> Ancestors<'a> {
        Ancestors { next: Some(self) }
    }

    /// Items on the path from the root to this node.
    pub fn path(self) -> CanonicalItems {
        self.ancestors().filter_map(NodeRef::item).collect()
    }

    /// Whether every item of `path` appears among this node and its ancestors.
    ///
    /// Walks toward the root looking for the items of `path` from its least frequent end.
    /// Ranks only decrease along the walk, so meeting a rank below the sought item means the
    /// item cannot appear further up.
    pub fn contains_prefix(self, path: &CanonicalItems) -> bool {
        let path = path.as_slice();
        let Some(mut sought) = path.len().checked_sub(1) else { return true };
        let mut below = u32::MAX;
        for node in self.ancestors() {
            let rank = node.rank();
            debug_assert!(rank < below, "ranks must decrease toward the root");
            below = rank;
            if rank < path[sought].rank() {
                return false;
            }
            if rank == path[sought].rank() {
                if sought == 0 {
                    return true;
                }
                sought -= 1;
            }
        }
        false
    }
}

/// Iterator from a node up to the root, see [`NodeRef::ancestors`].
pub struct Ancestors<'a> {
    next: Option<NodeRef<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeRef<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next.filter(|node| !node.is_root())?;
        self.next = node.parent();
        Some(node)
    }
}

/// Iterator over one item's header chain, see [`SchemaTree::header_chain`].
pub struct HeaderChain<'a> {
    tree: &'a SchemaTree,
    next: u32,
}

impl<'a> Iterator for HeaderChain<'a> {
    type Item = NodeRef<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.next == NIL {
            return None;
        }
        let node = NodeRef { tree: self.tree, id: NodeId(self.next) };
        self.next = self.tree.next_same[self.next as usize];
        Some(node)
    }
}

/// Pre-order walk, see [`SchemaTree::preorder`].
pub struct Preorder<'a> {
    tree: &'a SchemaTree,
    stack: Vec<u32>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeRef<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let range = self.tree.children_range(id);
        self.stack.extend(self.tree.kids[range].iter().rev());
        Some(NodeRef { tree: self.tree, id: NodeId(id) })
    }
}

#[cfg(test)]
pub(crate) mod test {

    use super::builder::SchemaTreeBuilder;
    use super::SchemaTree;
    use crate::canonical::CanonicalItems;
    use crate::dictionary::Dictionary;
    use crate::item::ItemId;

    /// A dictionary of single-letter names where `A` has rank 0, `B` rank 1, and so on.
    pub(crate) fn letters(count: u8) -> Dictionary {
        Dictionary::from_entries((0 .. count).map(|i| (char::from_u32(b'A' as u32 + i as u32).unwrap().to_string(), (count - i) as u64))).unwrap()
    }

    pub(crate) fn build(dictionary: Dictionary, transactions: &[&str]) -> SchemaTree {
        let builder = SchemaTreeBuilder::new(dictionary);
        for transaction in transactions {
            let names = transaction.chars().map(|c| c.to_string());
            builder.insert_names(names).unwrap();
        }
        builder.finish()
    }

    pub(crate) fn path(tree: &SchemaTree, names: &str) -> CanonicalItems {
        tree.dictionary().canonicalize(names.chars().map(|c| c.to_string()), crate::dictionary::UnknownItems::Reject).unwrap()
    }

    #[test]
    fn scenario_supports() {
        let tree = build(letters(3), &["AC", "ABC", "AB"]);
        assert_eq!(tree.transactions(), 3);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.root().support(), 3);
        assert_eq!(tree.find_path(&path(&tree, "A")).unwrap().support(), 3);
        assert_eq!(tree.find_path(&path(&tree, "AB")).unwrap().support(), 2);
        assert_eq!(tree.find_path(&path(&tree, "ABC")).unwrap().support(), 1);
        assert_eq!(tree.find_path(&path(&tree, "AC")).unwrap().support(), 1);
        assert!(tree.find_path(&path(&tree, "B")).is_none());

        let a = tree.find_path(&path(&tree, "A")).unwrap();
        let ranks: Vec<u32> = a.children().map(|child| child.item().unwrap().rank()).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert_eq!(tree.header_chain(ItemId::from_rank(2)).count(), 2);
        assert_eq!(tree.item_support(ItemId::from_rank(2)), 2);
    }

    #[test]
    fn ancestry_checks() {
        let tree = build(letters(3), &["ABC", "AB", "A", "AC"]);
        let abc = tree.find_path(&path(&tree, "ABC")).unwrap();
        // Every item of "BC" lies on the walk from the leaf to the root, so it is contained.
        for prefix in ["A", "AB", "ABC", "C", "BC", "AC", ""] {
            assert!(abc.contains_prefix(&path(&tree, prefix)), "{prefix}");
        }

        let ac = tree.find_path(&path(&tree, "AC")).unwrap();
        assert!(ac.contains_prefix(&path(&tree, "AC")));
        assert!(!ac.contains_prefix(&path(&tree, "BC")));
        assert!(!ac.contains_prefix(&path(&tree, "B")));

        let ab = tree.find_path(&path(&tree, "AB")).unwrap();
        assert!(!ab.contains_prefix(&path(&tree, "C")));
        assert!(!ab.contains_prefix(&path(&tree, "ABC")));
        assert!(tree.ancestors_contain(ab.id(), &path(&tree, "A")));
        assert!(!tree.root().contains_prefix(&path(&tree, "A")));
    }

    #[test]
    fn prefix_invariant_holds() {
        let tree = build(letters(6), &["ACE", "BDF", "ABCDEF", "F", "", "CDE", "AF", "ACE"]);
        for node in tree.preorder() {
            let ranks: Vec<u32> = node.ancestors().map(|node| node.item().unwrap().rank()).collect();
            assert!(ranks.windows(2).all(|pair| pair[0] > pair[1]));
        }
        assert_eq!(tree.preorder().count(), tree.len());
    }

    #[test]
    fn support_conservation() {
        let transactions = ["ACE", "BDF", "ABCDEF", "F", "", "CDE", "AF", "ACE", "AC"];
        let tree = build(letters(6), &transactions);
        assert_eq!(tree.transactions() as usize, transactions.len());
        for node in tree.preorder().filter(|node| !node.is_root()) {
            let node_path = node.path();
            let expected = transactions.iter().filter(|t| {
                let items = path(&tree, t);
                items.as_slice().starts_with(node_path.as_slice())
            }).count();
            assert_eq!(node.support() as usize, expected);
            let children: u32 = node.children().map(|child| child.support()).sum();
            assert!(children <= node.support());
        }
    }

    #[test]
    fn header_chains_cover_each_item_once() {
        let tree = build(letters(4), &["ABD", "ACD", "BCD", "D", "AD"]);
        for item in tree.dictionary().items() {
            let chain: Vec<_> = tree.header_chain(item.id()).collect();
            let carrying = tree.preorder().filter(|node| node.item() == Some(item.id())).count();
            assert_eq!(chain.len(), carrying);
            assert!(chain.iter().all(|node| node.item() == Some(item.id())));
            let mut ids: Vec<_> = chain.iter().map(|node| node.id()).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), carrying);
        }
        assert_eq!(tree.item_support(tree.dictionary().resolve("D").unwrap().id()), 5);
    }
}
