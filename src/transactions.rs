//! Reading transaction files and building trees from them.
//!
//! A transaction file has one transaction per line, its tokens separated by tabs. Every
//! token is a property or qualifier (`P…`), an object type (`o/…`) or a subject type
//! (`s/…`); anything else aborts the build.
//!
//! Building takes two passes over the transactions. The first counts, for every token, the
//! transactions containing it; ranks are then fixed by those counts. The second inserts
//! every transaction into a [`SchemaTreeBuilder`]. Both passes run on a dedicated rayon pool.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::dictionary::{FirstSeen, Vocabulary};
use crate::error::{Error, Result};
use crate::item::{ItemKind, OBJECT_TYPE_PREFIX, SUBJECT_TYPE_PREFIX};
use crate::tree::builder::SchemaTreeBuilder;
use crate::tree::SchemaTree;

const PROGRESS_INTERVAL: usize = 100_000;

/// Classifies an ingested token, rejecting unknown prefixes.
pub fn classify_token(line: usize, token: &str) -> Result<ItemKind> {
    if token.starts_with(SUBJECT_TYPE_PREFIX) {
        Ok(ItemKind::SubjectType)
    } else if token.starts_with(OBJECT_TYPE_PREFIX) {
        Ok(ItemKind::ObjectType)
    } else if token.starts_with('P') {
        Ok(ItemKind::Property)
    } else {
        Err(Error::UnrecognizedToken { line, token: token.to_string() })
    }
}

/// One line of a transaction file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// 1-based line number.
    pub line: usize,
    pub tokens: Vec<String>,
}

impl Transaction {
    /// Distinct tokens, each once, in the order they first occur on the line.
    fn distinct(&self) -> Vec<&str> {
        distinct(&self.tokens)
    }
}

fn distinct<S: AsRef<str>>(tokens: &[S]) -> Vec<&str> {
    let mut seen = FxHashSet::default();
    tokens.iter().map(|token| token.as_ref()).filter(|token| seen.insert(*token)).collect()
}

/// Counts each distinct token of the transaction at position `transaction`.
fn observe_all(vocabulary: &Vocabulary, transaction: usize, tokens: Vec<&str>) {
    for (position, token) in tokens.into_iter().enumerate() {
        vocabulary.observe_at(token, FirstSeen::at(transaction as u64, position));
    }
}

/// Iterates over the transactions of a tab-separated file.
pub struct TransactionReader<R> {
    reader: R,
    line: usize,
    buffer: String,
}

impl<R: BufRead> TransactionReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line: 0, buffer: String::new() }
    }
}

impl TransactionReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for TransactionReader<R> {
    type Item = Result<Transaction>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_line(&mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                self.line += 1;
                let line = self.buffer.trim_end_matches(['\n', '\r']);
                let mut tokens = Vec::new();
                for token in line.split('\t').filter(|token| !token.is_empty()) {
                    if let Err(error) = classify_token(self.line, token) {
                        return Some(Err(error));
                    }
                    tokens.push(token.to_string());
                }
                Some(Ok(Transaction { line: self.line, tokens }))
            }
            Err(error) => Some(Err(error.into())),
        }
    }
}

struct Progress {
    label: &'static str,
    seen: AtomicUsize,
}

impl Progress {
    fn new(label: &'static str) -> Self {
        Self { label, seen: AtomicUsize::new(0) }
    }
    fn tick(&self) {
        let seen = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % PROGRESS_INTERVAL == 0 {
            debug!(pass = self.label, transactions = seen, "progress");
        }
    }
    fn total(&self) -> usize {
        self.seen.load(Ordering::Relaxed)
    }
}

/// Builds a tree from a transaction file, reading it once per pass.
pub fn build_from_path(path: impl AsRef<Path>, config: &BuildConfig) -> Result<SchemaTree> {
    let path = path.as_ref();
    let pool = config.thread_pool()?;
    info!(path = %path.display(), workers = pool.current_num_threads(), "building schema tree");
    pool.install(|| {
        let start = Instant::now();
        let vocabulary = Vocabulary::new();
        let counted = Progress::new("count");
        TransactionReader::open(path)?.par_bridge().try_for_each(|transaction| -> Result<()> {
            let transaction = transaction?;
            observe_all(&vocabulary, transaction.line, transaction.distinct());
            counted.tick();
            Ok(())
        })?;
        info!(transactions = counted.total(), items = vocabulary.len(), elapsed = ?start.elapsed(), "counted items");

        let start = Instant::now();
        let builder = SchemaTreeBuilder::new(vocabulary.finalize_ranks());
        let inserted = Progress::new("insert");
        TransactionReader::open(path)?.par_bridge().try_for_each(|transaction| -> Result<()> {
            builder.insert_names(&transaction?.tokens)?;
            inserted.tick();
            Ok(())
        })?;
        info!(transactions = inserted.total(), nodes = builder.len(), elapsed = ?start.elapsed(), "inserted transactions");
        Ok(builder.finish())
    })
}

/// Builds a tree from transactions already in memory.
pub fn build_in_memory<S>(transactions: &[Vec<S>], config: &BuildConfig) -> Result<SchemaTree>
where
    S: AsRef<str> + Sync,
{
    let pool = config.thread_pool()?;
    pool.install(|| {
        let vocabulary = Vocabulary::new();
        transactions.par_iter().enumerate().try_for_each(|(index, tokens)| -> Result<()> {
            for token in tokens {
                classify_token(index + 1, token.as_ref())?;
            }
            observe_all(&vocabulary, index + 1, distinct(tokens));
            Ok(())
        })?;

        let builder = SchemaTreeBuilder::new(vocabulary.finalize_ranks());
        transactions.par_iter().try_for_each(|tokens| builder.insert_names(tokens))?;
        info!(transactions = transactions.len(), nodes = builder.len(), "built schema tree in memory");
        Ok(builder.finish())
    })
}
