//! A frequent-pattern index over property co-occurrence transactions.
//!
//! Each transaction is the set of properties and type annotations observed together on one
//! entity. Items are ranked by how many transactions contain them, and every transaction is
//! inserted into a prefix tree with its items in rank order, so frequent prefixes are stored
//! once. Every node counts the transactions passing through it, and the nodes carrying the
//! same item are threaded onto a per-item header chain.
//!
//! The usual life cycle:
//!
//! 1. Count items into a [`Vocabulary`] and freeze it into a [`Dictionary`].
//! 2. Insert transactions through a [`SchemaTreeBuilder`], from as many threads as you like,
//!    then [`finish`](SchemaTreeBuilder::finish) it into an immutable [`SchemaTree`].
//! 3. [`save`] the tree, and later [`load`] it to answer support queries.
//!
//! [`build_from_path`] runs the first two steps over a tab-separated transaction file.

pub mod bytes;
pub mod canonical;
pub mod codec;
pub mod common;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod item;
pub mod locks;
pub mod registry;
pub mod string;
pub mod support;
pub mod transactions;
pub mod tree;

pub use canonical::CanonicalItems;
pub use codec::{decode, encode, load, save, Format};
pub use common::HeapSize;
pub use config::{BuildConfig, ConfigError};
pub use dictionary::{Dictionary, UnknownItems, Vocabulary};
pub use error::{Error, Result};
pub use item::{Item, ItemId, ItemKind};
pub use registry::ModelRegistry;
pub use support::CandidateSupport;
pub use transactions::{build_from_path, build_in_memory, Transaction, TransactionReader};
pub use tree::builder::SchemaTreeBuilder;
pub use tree::{NodeId, NodeRef, SchemaTree};
