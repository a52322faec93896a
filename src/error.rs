//! Error types for building, querying and persisting schema trees.

use std::io;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A name the frozen dictionary has never seen reached ingestion.
    #[error("unknown item {0:?}")]
    UnknownItem(String),

    #[error("item {0:?} appears twice in the dictionary")]
    DuplicateItem(String),

    /// A transaction token without a `P`, `o/` or `s/` prefix.
    #[error("line {line}: unrecognized token {token:?}")]
    UnrecognizedToken { line: usize, token: String },

    /// An item id from some other dictionary was handed to this tree.
    #[error("item rank {rank} outside dictionary of {len} items")]
    ItemOutOfRange { rank: u32, len: usize },

    #[error("node arena exhausted")]
    CapacityExceeded,

    #[error("input truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("corrupt input at byte {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },

    #[error("malformed tree after {nodes} nodes: {reason}")]
    MalformedTree { nodes: usize, reason: &'static str },

    #[error("node {node}: rank {rank} outside dictionary of {len} items")]
    RankOutOfRange { node: usize, rank: u32, len: usize },

    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
