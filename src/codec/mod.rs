//! Snapshots of a schema tree and its dictionary.
//!
//! Both encodings carry the same content: the dictionary as `(name, count)` pairs in rank
//! order, then every node in pre-order as `(rank, support, child count)`, the root with rank
//! [`ROOT_SENTINEL`](crate::tree::ROOT_SENTINEL). Parent links and header chains are not
//! stored; decoding rebuilds them from the pre-order positions.
//!
//! Every file starts with an 8-byte magic naming its encoding, so [`decode`] and [`load`]
//! need not be told which one they are reading.

mod columns;
mod sequential;

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::error::{Error, Result};
use crate::tree::SchemaTree;

/// A snapshot encoding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// Aligned typed columns behind a schema of section lengths.
    #[default]
    Structured,
    /// One fixed-width value after another.
    Sequential,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Structured, Format::Sequential];

    /// File name suffix; a snapshot file is named `<corpus><suffix>`.
    pub fn suffix(self) -> &'static str {
        match self {
            Format::Structured => ".schemaTree.typed.cols",
            Format::Sequential => ".schemaTree.typed.seq",
        }
    }

    pub fn magic(self) -> [u8; 8] {
        match self {
            Format::Structured => *b"SCHTCOL1",
            Format::Sequential => *b"SCHTSEQ1",
        }
    }

    /// The encoding named by the magic at the start of `bytes`.
    pub fn detect(bytes: &[u8]) -> Result<Format> {
        let Some(magic) = bytes.get(.. 8) else {
            return Err(Error::Truncated { offset: bytes.len() });
        };
        Format::ALL
            .into_iter()
            .find(|format| format.magic() == magic)
            .ok_or_else(|| Error::Corrupt { offset: 0, reason: "unknown magic".to_string() })
    }

    /// Splits a snapshot file name into its format and corpus name.
    pub fn parse_file_name(file_name: &str) -> Option<(Format, &str)> {
        Format::ALL.into_iter().find_map(|format| {
            file_name
                .strip_suffix(format.suffix())
                .filter(|corpus| !corpus.is_empty())
                .map(|corpus| (format, corpus))
        })
    }

    pub fn file_name(self, corpus: &str) -> String {
        format!("{corpus}{}", self.suffix())
    }
}

/// One snapshot encoding.
trait TreeCodec {
    fn encode(tree: &SchemaTree, out: &mut Vec<u8>) -> Result<()>;
    /// Decodes a whole snapshot, magic included.
    fn decode(bytes: &[u8]) -> Result<SchemaTree>;
}

pub fn encode(tree: &SchemaTree, format: Format) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        Format::Structured => columns::Columns::encode(tree, &mut out)?,
        Format::Sequential => sequential::Sequential::encode(tree, &mut out)?,
    }
    Ok(out)
}

/// Decodes a snapshot in either encoding. Fails without a partial tree on any malformed input.
pub fn decode(bytes: &[u8]) -> Result<SchemaTree> {
    match Format::detect(bytes)? {
        Format::Structured => columns::Columns::decode(bytes),
        Format::Sequential => sequential::Sequential::decode(bytes),
    }
}

pub fn save(tree: &SchemaTree, path: impl AsRef<Path>, format: Format) -> Result<()> {
    let path = path.as_ref();
    let start = Instant::now();
    let bytes = encode(tree, format)?;
    std::fs::write(path, &bytes)?;
    info!(path = %path.display(), ?format, nodes = tree.len(), bytes = bytes.len(), elapsed = ?start.elapsed(), "saved schema tree");
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<SchemaTree> {
    let path = path.as_ref();
    let start = Instant::now();
    let bytes = std::fs::read(path)?;
    let tree = decode(&bytes)?;
    info!(path = %path.display(), nodes = tree.len(), items = tree.dictionary().len(), elapsed = ?start.elapsed(), "loaded schema tree");
    Ok(tree)
}

#[cfg(test)]
mod test {

    use super::{decode, encode, Format};
    use crate::error::Error;
    use crate::tree::test::{build, letters};
    use crate::tree::SchemaTree;

    fn sample() -> SchemaTree {
        build(letters(6), &["ACE", "BDF", "ABCDEF", "F", "", "CDE", "AF", "ACE", "AC", "BE", "DEF"])
    }

    fn triples(tree: &SchemaTree) -> Vec<(Option<u32>, u32, usize)> {
        tree.preorder().map(|node| (node.item().map(|item| item.rank()), node.support(), node.child_count())).collect()
    }

    #[test]
    fn round_trip_both_formats() {
        let tree = sample();
        for format in Format::ALL {
            let bytes = encode(&tree, format).unwrap();
            assert_eq!(Format::detect(&bytes).unwrap(), format);
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded.dictionary(), tree.dictionary());
            assert_eq!(decoded.len(), tree.len());
            assert_eq!(triples(&decoded), triples(&tree));
            for item in tree.dictionary().items() {
                assert_eq!(decoded.header_chain(item.id()).count(), tree.header_chain(item.id()).count());
            }
            // Decoded trees encode to the same bytes.
            assert_eq!(encode(&decoded, format).unwrap(), bytes);
        }
    }

    #[test]
    fn root_only_tree_round_trips() {
        let tree = build(letters(2), &["", ""]);
        for format in Format::ALL {
            let decoded = decode(&encode(&tree, format).unwrap()).unwrap();
            assert_eq!(decoded.len(), 1);
            assert_eq!(decoded.transactions(), 2);
            assert_eq!(decoded.dictionary().len(), 2);
        }
    }

    #[test]
    fn truncated_input_fails() {
        let tree = sample();
        for format in Format::ALL {
            let bytes = encode(&tree, format).unwrap();
            for cut in [0, 5, 8, 16, bytes.len() / 2, bytes.len() - 8, bytes.len() - 1] {
                let result = decode(&bytes[.. cut]);
                assert!(result.is_err(), "{format:?} cut at {cut}");
            }
            assert!(matches!(decode(&bytes[.. bytes.len() - 4]), Err(Error::Truncated { .. } | Error::Corrupt { .. })));
        }
    }

    #[test]
    fn unknown_magic_fails() {
        let mut bytes = encode(&sample(), Format::Sequential).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(Error::Corrupt { offset: 0, .. })));
        assert!(matches!(decode(b"SCH"), Err(Error::Truncated { offset: 3 })));
    }

    #[test]
    fn file_names() {
        assert_eq!(Format::Sequential.file_name("P31"), "P31.schemaTree.typed.seq");
        assert_eq!(Format::parse_file_name("wiki.schemaTree.typed.cols"), Some((Format::Structured, "wiki")));
        assert_eq!(Format::parse_file_name("P17.schemaTree.typed.seq"), Some((Format::Sequential, "P17")));
        assert_eq!(Format::parse_file_name(".schemaTree.typed.seq"), None);
        assert_eq!(Format::parse_file_name("notes.txt"), None);
    }
}
