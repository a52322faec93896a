//! The structured encoding: typed columns behind a schema of section lengths.
//!
//! ```text
//! word 0            magic
//! word 1            section count S
//! words 2 .. 2+2S   (alignment, byte length) per section
//! sections          each padded to a multiple of 8 bytes
//! ```
//!
//! Words are little-endian `u64`. The six sections are the dictionary's name offsets and
//! name bytes, item counts, then node ranks, supports and child counts in pre-order.
//! Sections are cast to and from bytes in place, which is little-endian only on
//! little-endian targets.

use super::{Format, TreeCodec};
use crate::bytes::{AsBytes, FromBytes};
use crate::common::{Index, Len, Push};
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::string::Strings;
use crate::tree::{Assembler, SchemaTree, ROOT_SENTINEL};

#[cfg(target_endian = "big")]
compile_error!("the structured snapshot format casts little-endian columns in place");

const SECTIONS: u64 = 6;

type Borrowed<'a> = (Strings<&'a [u64], &'a [u8]>, &'a [u64], &'a [u32], &'a [u32], &'a [u32]);

pub(super) struct Columns;

impl TreeCodec for Columns {
    fn encode(tree: &SchemaTree, out: &mut Vec<u8>) -> Result<()> {
        let dictionary = tree.dictionary();
        let mut names = Strings::with_capacity(dictionary.len(), 0);
        let mut counts = Vec::with_capacity(dictionary.len());
        for item in dictionary.items() {
            names.push(item.name());
            counts.push(item.count());
        }
        let mut ranks = Vec::with_capacity(tree.len());
        let mut supports = Vec::with_capacity(tree.len());
        let mut children = Vec::with_capacity(tree.len());
        for node in tree.preorder() {
            ranks.push(node.item().map_or(ROOT_SENTINEL, |item| item.rank()));
            supports.push(node.support());
            children.push(node.child_count() as u32);
        }

        let columns = (names, counts, ranks, supports, children);
        let sections: Vec<(usize, &[u8])> = columns.as_bytes().collect();
        debug_assert_eq!(sections.len() as u64, SECTIONS);

        out.extend_from_slice(&Format::Structured.magic());
        out.extend_from_slice(&SECTIONS.to_le_bytes());
        for (align, bytes) in sections.iter() {
            out.extend_from_slice(&(*align as u64).to_le_bytes());
            out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        }
        for (_, bytes) in sections.iter() {
            out.extend_from_slice(bytes);
            out.resize(padded(out.len()), 0);
        }
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<SchemaTree> {
        // Copy into words so that every section starts 8-byte aligned.
        let mut words = vec![0u64; padded(bytes.len()) / 8];
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[.. bytes.len()].copy_from_slice(bytes);
        let aligned = &bytemuck::cast_slice::<u64, u8>(&words)[.. bytes.len()];

        let header = |word: usize| -> Result<u64> {
            aligned
                .get(8 * word .. 8 * word + 8)
                .map(|chunk| u64::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7]]))
                .ok_or(Error::Truncated { offset: bytes.len() })
        };

        if header(0)?.to_le_bytes() != Format::Structured.magic() {
            return Err(Error::Corrupt { offset: 0, reason: "not a structured snapshot".to_string() });
        }
        let count = header(1)?;
        if count != SECTIONS {
            return Err(Error::Corrupt { offset: 8, reason: format!("expected {SECTIONS} sections, found {count}") });
        }

        let mut cursor = 8 * (2 + 2 * SECTIONS as usize);
        let mut slices = Vec::with_capacity(SECTIONS as usize);
        for section in 0 .. SECTIONS as usize {
            let align = header(2 + 2 * section)?;
            let length = header(3 + 2 * section)?;
            if !matches!(align, 1 | 2 | 4 | 8) {
                return Err(Error::Corrupt { offset: 8 * (2 + 2 * section), reason: format!("section {section} alignment {align}") });
            }
            let end = usize::try_from(length).ok()
                .and_then(|length| cursor.checked_add(length))
                .filter(|end| *end <= bytes.len())
                .ok_or(Error::Truncated { offset: bytes.len() })?;
            slices.push(&aligned[cursor .. end]);
            cursor = padded(end);
        }
        if cursor != bytes.len() {
            return Err(Error::Corrupt { offset: cursor.min(bytes.len()), reason: "trailing bytes".to_string() });
        }

        let (names, counts, ranks, supports, children): Borrowed<'_> = FromBytes::from_bytes(&mut slices.into_iter())
            .map_err(|error| Error::Corrupt { offset: 16, reason: error.to_string() })?;
        if !names.well_formed() || names.len() != counts.len() {
            return Err(Error::Corrupt { offset: 16, reason: "inconsistent name table".to_string() });
        }
        if ranks.len() != supports.len() || ranks.len() != children.len() {
            return Err(Error::Corrupt { offset: 16, reason: "node columns differ in length".to_string() });
        }

        let mut entries = Vec::with_capacity(names.len());
        for (index, name) in names.index_iter().enumerate() {
            let name = std::str::from_utf8(name)
                .map_err(|_| Error::Corrupt { offset: 16, reason: format!("item {index} is not UTF-8") })?;
            entries.push((name, counts[index]));
        }
        let dictionary = Dictionary::from_entries(entries)?;

        let mut assembler = Assembler::new(dictionary, ranks.len());
        for node in 0 .. ranks.len() {
            assembler.push(ranks[node], supports[node], children[node])?;
        }
        if !assembler.is_complete() {
            return Err(Error::Truncated { offset: bytes.len() });
        }
        Ok(assembler.finish())
    }
}

#[inline(always)]
fn padded(length: usize) -> usize {
    (length + 7) & !7
}
