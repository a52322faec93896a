//! The sequential encoding: values written one after another with `bincode`.
//!
//! ```text
//! magic                     8 raw bytes
//! item count                u64
//! per item, in rank order   (name: string, count: u64)
//! per node, in pre-order    (rank: u32, support: u32, child count: u32)
//! ```
//!
//! Integers are fixed-width little-endian; strings are a `u64` length and UTF-8 bytes.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Format, TreeCodec};
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::tree::{Assembler, SchemaTree, ROOT_SENTINEL};

/// Smallest encoded item: an empty name and its count.
const MIN_ITEM_BYTES: usize = 16;

pub(super) struct Sequential;

fn options(limit: usize) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
        .with_limit(limit as u64)
}

fn write<T: Serialize + ?Sized>(out: &mut Vec<u8>, value: &T) -> Result<()> {
    options(usize::MAX).serialize_into(out, value)?;
    Ok(())
}

/// Reads values off the front of a snapshot, tracking the byte offset for errors.
struct Reader<'a> {
    bytes: &'a [u8],
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    fn offset(&self) -> usize {
        self.bytes.len() - self.rest.len()
    }

    fn read<T: DeserializeOwned>(&mut self) -> Result<T> {
        let offset = self.offset();
        options(self.rest.len()).deserialize_from(&mut self.rest).map_err(|error| match *error {
            bincode::ErrorKind::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => Error::Truncated { offset: self.bytes.len() },
            bincode::ErrorKind::SizeLimit => Error::Truncated { offset: self.bytes.len() },
            other => Error::Corrupt { offset, reason: other.to_string() },
        })
    }
}

impl TreeCodec for Sequential {
    fn encode(tree: &SchemaTree, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&Format::Sequential.magic());
        let dictionary = tree.dictionary();
        write(out, &(dictionary.len() as u64))?;
        for item in dictionary.items() {
            write(out, &(item.name(), item.count()))?;
        }
        for node in tree.preorder() {
            let rank = node.item().map_or(ROOT_SENTINEL, |item| item.rank());
            write(out, &(rank, node.support(), node.child_count() as u32))?;
        }
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<SchemaTree> {
        let Some(rest) = bytes.strip_prefix(&Format::Sequential.magic()) else {
            return Err(Error::Corrupt { offset: 0, reason: "not a sequential snapshot".to_string() });
        };
        let mut reader = Reader { bytes, rest };

        let items: u64 = reader.read()?;
        let mut entries = Vec::with_capacity((items as usize).min(reader.rest.len() / MIN_ITEM_BYTES));
        for _ in 0 .. items {
            let (name, count): (String, u64) = reader.read()?;
            entries.push((name, count));
        }
        let dictionary = Dictionary::from_entries(entries)?;

        let mut assembler = Assembler::new(dictionary, reader.rest.len() / 12);
        while !assembler.is_complete() {
            let (rank, support, children): (u32, u32, u32) = reader.read()?;
            assembler.push(rank, support, children)?;
        }
        if !reader.rest.is_empty() {
            return Err(Error::Corrupt { offset: reader.offset(), reason: "trailing bytes".to_string() });
        }
        Ok(assembler.finish())
    }
}

#[cfg(test)]
mod test {

    use super::{write, Sequential};
    use crate::codec::{Format, TreeCodec};
    use crate::error::Error;
    use crate::tree::test::{build, letters};
    use crate::tree::ROOT_SENTINEL;

    fn header(items: &[(&str, u64)]) -> Vec<u8> {
        let mut bytes = Format::Sequential.magic().to_vec();
        write(&mut bytes, &(items.len() as u64)).unwrap();
        for item in items {
            write(&mut bytes, item).unwrap();
        }
        bytes
    }

    #[test]
    fn layout() {
        let tree = build(letters(2), &["AB"]);
        let mut bytes = Vec::new();
        Sequential::encode(&tree, &mut bytes).unwrap();

        let mut expected = b"SCHTSEQ1".to_vec();
        expected.extend_from_slice(&2u64.to_le_bytes());
        for (name, count) in [("A", 2u64), ("B", 1)] {
            expected.extend_from_slice(&1u64.to_le_bytes());
            expected.extend_from_slice(name.as_bytes());
            expected.extend_from_slice(&count.to_le_bytes());
        }
        for (rank, support, children) in [(ROOT_SENTINEL, 1u32, 1u32), (0, 1, 1), (1, 1, 0)] {
            expected.extend_from_slice(&rank.to_le_bytes());
            expected.extend_from_slice(&support.to_le_bytes());
            expected.extend_from_slice(&children.to_le_bytes());
        }
        assert_eq!(bytes, expected);
    }

    #[test]
    fn rank_out_of_range() {
        let mut bytes = header(&[("A", 1)]);
        write(&mut bytes, &(ROOT_SENTINEL, 1u32, 1u32)).unwrap();
        write(&mut bytes, &(4u32, 1u32, 0u32)).unwrap();
        assert!(matches!(Sequential::decode(&bytes), Err(Error::RankOutOfRange { node: 1, rank: 4, len: 1 })));
    }

    #[test]
    fn missing_children_truncated() {
        let mut bytes = header(&[("A", 1), ("B", 1)]);
        write(&mut bytes, &(ROOT_SENTINEL, 1u32, 2u32)).unwrap();
        write(&mut bytes, &(0u32, 1u32, 0u32)).unwrap();
        let length = bytes.len();
        assert!(matches!(Sequential::decode(&bytes), Err(Error::Truncated { offset }) if offset == length));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = header(&[("A", 1)]);
        write(&mut bytes, &(ROOT_SENTINEL, 1u32, 0u32)).unwrap();
        let offset = bytes.len();
        bytes.push(0);
        assert!(matches!(Sequential::decode(&bytes), Err(Error::Corrupt { offset: o, .. }) if o == offset));
    }

    #[test]
    fn huge_name_length_is_truncation() {
        let mut bytes = Format::Sequential.magic().to_vec();
        write(&mut bytes, &1u64).unwrap();
        write(&mut bytes, &u64::MAX).unwrap();
        assert!(matches!(Sequential::decode(&bytes), Err(Error::Truncated { .. })));
    }
}
