//! Support counting over a frozen tree.
//!
//! The number of transactions containing an item set is read off the header chain of the
//! set's least frequent item: every transaction containing the set passes through exactly one
//! node of that chain whose ancestors contain the rest of the set. Turning these counts into
//! probabilities and rankings is left to callers.

use crate::canonical::CanonicalItems;
use crate::item::ItemId;
use crate::tree::{NodeRef, SchemaTree};

/// How many transactions contain a candidate item together with a context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CandidateSupport {
    pub item: ItemId,
    pub support: u64,
}

impl SchemaTree {
    /// Canonicalizes a request of property names and prefixed type names (`o/…`, `s/…`).
    ///
    /// Names unknown to the dictionary are dropped.
    pub fn build_instance<P, T>(&self, properties: impl IntoIterator<Item = P>, types: impl IntoIterator<Item = T>) -> CanonicalItems
    where
        P: AsRef<str>,
        T: AsRef<str>,
    {
        let properties = properties.into_iter().map(|name| self.dictionary().get(name.as_ref()).map(|item| item.id()));
        let types = types.into_iter().map(|name| self.dictionary().get(name.as_ref()).map(|item| item.id()));
        properties.chain(types).flatten().collect()
    }

    /// Number of transactions containing every item of `items`.
    pub fn support_of(&self, items: &CanonicalItems) -> u64 {
        match items.last() {
            None => self.transactions() as u64,
            Some(pivot) => self
                .header_chain(pivot)
                .filter(|node| node.contains_prefix(items))
                .map(|node| node.support() as u64)
                .sum(),
        }
    }

    /// Number of transactions containing `candidate` and every item of `context`.
    pub fn joint_support(&self, candidate: ItemId, context: &CanonicalItems) -> u64 {
        self.support_of(&context.with(candidate))
    }

    /// Joint support with `context` of every item outside it, in rank order.
    ///
    /// Items that never co-occur with the context are left out. One pass over the chain of
    /// the context's least frequent item visits, for each matching node, its ancestors (which
    /// every transaction through the node contains) and its subtree (where each node
    /// contributes its own support).
    pub fn candidate_supports(&self, context: &CanonicalItems) -> Vec<CandidateSupport> {
        let mut counts = vec![0u64; self.dictionary().len()];
        match context.last() {
            None => {
                for (rank, count) in counts.iter_mut().enumerate() {
                    *count = self.item_support(ItemId::from_rank(rank as u32));
                }
            }
            Some(pivot) => {
                let mut stack: Vec<NodeRef<'_>> = Vec::new();
                for node in self.header_chain(pivot).filter(|node| node.contains_prefix(context)) {
                    let support = node.support() as u64;
                    for ancestor in node.ancestors().skip(1) {
                        if let Some(item) = ancestor.item() {
                            counts[item.index()] += support;
                        }
                    }
                    stack.extend(node.children());
                    while let Some(descendant) = stack.pop() {
                        if let Some(item) = descendant.item() {
                            counts[item.index()] += descendant.support() as u64;
                        }
                        stack.extend(descendant.children());
                    }
                }
            }
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(rank, support)| CandidateSupport { item: ItemId::from_rank(rank as u32), support })
            .filter(|candidate| candidate.support > 0 && !context.contains(candidate.item))
            .collect()
    }
}
