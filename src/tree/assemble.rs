//! Rebuilding a tree from a pre-order stream of `(rank, support, child count)` triples.

use super::{SchemaTree, NIL, ROOT_SENTINEL};
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};

/// A node still waiting for some of its declared children.
struct Open {
    node: u32,
    remaining: u32,
    last_rank: Option<u32>,
}

/// Accepts nodes in pre-order and threads each onto its item's header chain.
///
/// Each node prepends itself to its chain as it arrives, so a chain lists its nodes in
/// reverse pre-order and the same stream always produces the same chains.
///
/// Child lists are laid out when the tree is finished, so memory grows with the nodes that
/// actually arrive rather than with the counts they declare.
pub(crate) struct Assembler {
    tree: SchemaTree,
    open: Vec<Open>,
}

impl Assembler {
    pub(crate) fn new(dictionary: Dictionary, nodes_hint: usize) -> Self {
        let heads = vec![NIL; dictionary.len()];
        let nodes_hint = nodes_hint.min(1 << 24);
        let mut bounds = Vec::with_capacity(nodes_hint + 1);
        bounds.push(0);
        Self {
            tree: SchemaTree {
                dictionary,
                items: Vec::with_capacity(nodes_hint),
                parents: Vec::with_capacity(nodes_hint),
                supports: Vec::with_capacity(nodes_hint),
                next_same: Vec::with_capacity(nodes_hint),
                bounds,
                kids: Vec::new(),
                heads,
            },
            open: Vec::new(),
        }
    }

    /// Number of nodes accepted so far.
    pub(crate) fn nodes(&self) -> usize {
        self.tree.items.len()
    }

    /// Whether the root and all declared descendants have arrived.
    pub(crate) fn is_complete(&self) -> bool {
        self.nodes() > 0 && self.open.is_empty()
    }

    fn malformed(&self, reason: &'static str) -> Error {
        Error::MalformedTree { nodes: self.nodes(), reason }
    }

    /// Accepts the next node in pre-order.
    pub(crate) fn push(&mut self, rank: u32, support: u32, children: u32) -> Result<()> {
        let node = self.nodes();
        let items = self.tree.dictionary.len();

        let parent = if node == 0 {
            if rank != ROOT_SENTINEL {
                return Err(self.malformed("first node is not the root"));
            }
            NIL
        } else {
            if rank as usize >= items {
                return Err(Error::RankOutOfRange { node, rank, len: items });
            }
            let Some(open) = self.open.last_mut() else {
                return Err(Error::MalformedTree { nodes: node, reason: "node after a complete tree" });
            };
            let parent_rank = self.tree.items[open.node as usize];
            if parent_rank != ROOT_SENTINEL && rank <= parent_rank {
                return Err(Error::MalformedTree { nodes: node, reason: "child rank does not follow its parent" });
            }
            if open.last_rank.map_or(false, |last| rank <= last) {
                return Err(Error::MalformedTree { nodes: node, reason: "children out of rank order" });
            }
            open.last_rank = Some(rank);
            open.remaining -= 1;
            let parent = open.node;
            if open.remaining == 0 {
                self.open.pop();
            }
            parent
        };

        // Children carry strictly larger ranks than their parent and than each other.
        let allowed = if rank == ROOT_SENTINEL { items } else { items - 1 - rank as usize };
        if children as usize > allowed {
            return Err(Error::MalformedTree { nodes: node, reason: "more children than higher ranks" });
        }
        let Some(end) = self.tree.bounds.last().and_then(|start| start.checked_add(children)) else {
            return Err(Error::MalformedTree { nodes: node, reason: "too many children" });
        };

        let tree = &mut self.tree;
        tree.items.push(rank);
        tree.parents.push(parent);
        tree.supports.push(support);
        if rank == ROOT_SENTINEL {
            tree.next_same.push(NIL);
        } else {
            tree.next_same.push(tree.heads[rank as usize]);
            tree.heads[rank as usize] = node as u32;
        }

        tree.bounds.push(end);
        if children > 0 {
            self.open.push(Open { node: node as u32, remaining: children, last_rank: None });
        }
        Ok(())
    }

    /// The assembled tree; only call once [`Assembler::is_complete`] holds.
    pub(crate) fn finish(mut self) -> SchemaTree {
        debug_assert!(self.is_complete());
        let tree = &mut self.tree;
        // Siblings arrive in rank order, so filling each range in arrival order keeps it sorted.
        let mut cursor: Vec<u32> = tree.bounds[.. tree.items.len()].to_vec();
        tree.kids = vec![NIL; tree.items.len().saturating_sub(1)];
        for (node, &parent) in tree.parents.iter().enumerate().skip(1) {
            let slot = &mut cursor[parent as usize];
            tree.kids[*slot as usize] = node as u32;
            *slot += 1;
        }
        self.tree
    }
}

#[cfg(test)]
mod test {

    use super::Assembler;
    use crate::error::Error;
    use crate::item::ItemId;
    use crate::tree::test::letters;
    use crate::tree::ROOT_SENTINEL;

    #[test]
    fn assembles_preorder_stream() {
        // root -> A -> { B -> C, C }
        let mut assembler = Assembler::new(letters(3), 0);
        for (rank, support, children) in [(ROOT_SENTINEL, 3, 1), (0, 3, 2), (1, 2, 1), (2, 1, 0), (2, 1, 0)] {
            assert!(!assembler.is_complete());
            assembler.push(rank, support, children).unwrap();
        }
        assert!(assembler.is_complete());
        let tree = assembler.finish();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.transactions(), 3);
        // Chains list later pre-order positions first.
        let chain: Vec<usize> = tree.header_chain(ItemId::from_rank(2)).map(|node| node.id().index()).collect();
        assert_eq!(chain, vec![4, 3]);
        assert_eq!(tree.node(crate::tree::NodeId(3)).unwrap().parent().unwrap().id().index(), 2);
    }

    #[test]
    fn rejects_out_of_range_rank() {
        let mut assembler = Assembler::new(letters(2), 0);
        assembler.push(ROOT_SENTINEL, 1, 1).unwrap();
        let error = assembler.push(7, 1, 0).unwrap_err();
        assert!(matches!(error, Error::RankOutOfRange { node: 1, rank: 7, len: 2 }));
    }

    #[test]
    fn child_counts_bounded_by_remaining_ranks() {
        let mut assembler = Assembler::new(letters(4), 0);
        assert!(matches!(assembler.push(ROOT_SENTINEL, 1, 5), Err(Error::MalformedTree { nodes: 0, .. })));

        let mut assembler = Assembler::new(letters(4), 0);
        assembler.push(ROOT_SENTINEL, 2, 4).unwrap();
        // Rank 1 can only be followed by ranks 2 and 3.
        assert!(matches!(assembler.push(1, 1, 3), Err(Error::MalformedTree { nodes: 1, .. })));

        let mut assembler = Assembler::new(letters(4), 0);
        assembler.push(ROOT_SENTINEL, 1, 1).unwrap();
        assert!(matches!(assembler.push(3, 1, 1), Err(Error::MalformedTree { nodes: 1, .. })));
    }

    #[test]
    fn declared_children_reserve_nothing() {
        let mut assembler = Assembler::new(letters(200), 0);
        assembler.push(ROOT_SENTINEL, 1, 200).unwrap();
        for rank in 0 .. 150 {
            // Each node declares every higher rank as a child but only the next one arrives.
            assembler.push(rank, 1, 199 - rank).unwrap();
        }
        assert!(!assembler.is_complete());
        assert_eq!(assembler.tree.kids.capacity(), 0);
    }

    #[test]
    fn children_laid_out_in_rank_order() {
        // root -> { A -> { B, D -> E }, C }
        let mut assembler = Assembler::new(letters(5), 0);
        for (rank, support, children) in [(ROOT_SENTINEL, 4, 2), (0, 3, 2), (1, 1, 0), (3, 2, 1), (4, 1, 0), (2, 1, 0)] {
            assembler.push(rank, support, children).unwrap();
        }
        let tree = assembler.finish();
        let ranks = |node: crate::tree::NodeRef| node.children().map(|child| child.item().unwrap().rank()).collect::<Vec<_>>();
        assert_eq!(ranks(tree.root()), vec![0, 2]);
        let a = tree.root().children().next().unwrap();
        assert_eq!(ranks(a), vec![1, 3]);
        assert_eq!(ranks(a.child(ItemId::from_rank(3)).unwrap()), vec![4]);
    }

    #[test]
    fn rejects_broken_order() {
        let mut assembler = Assembler::new(letters(3), 0);
        assert!(matches!(assembler.push(0, 1, 0), Err(Error::MalformedTree { nodes: 0, .. })));

        let mut assembler = Assembler::new(letters(3), 0);
        assembler.push(ROOT_SENTINEL, 2, 1).unwrap();
        assembler.push(1, 2, 1).unwrap();
        assert!(matches!(assembler.push(0, 1, 0), Err(Error::MalformedTree { nodes: 2, .. })));

        let mut assembler = Assembler::new(letters(3), 0);
        assembler.push(ROOT_SENTINEL, 2, 2).unwrap();
        assembler.push(1, 1, 0).unwrap();
        assert!(matches!(assembler.push(1, 1, 0), Err(Error::MalformedTree { .. })));

        let mut assembler = Assembler::new(letters(3), 0);
        assembler.push(ROOT_SENTINEL, 0, 0).unwrap();
        assert!(assembler.is_complete());
        assert!(matches!(assembler.push(0, 1, 0), Err(Error::MalformedTree { .. })));
    }
}
