use crate::common::{HeapSize, Index, IndexAs, Len, Push};

/// A stand-in for `Vec<String>`: the dictionary's name table.
///
/// `bounds[i]` is the end offset of name `i` in `values`; name `i` starts where name `i-1` ends.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Strings<BC = Vec<u64>, VC = Vec<u8>> {
    /// Bounds container; provides indexed access to offsets.
    pub bounds: BC,
    /// Values container; provides slice access to bytes.
    pub values: VC,
}

impl Strings {
    pub fn with_capacity(names: usize, bytes: usize) -> Self {
        Self {
            bounds: Vec::with_capacity(names),
            values: Vec::with_capacity(bytes),
        }
    }
    #[inline(always)]
    pub fn borrow(&self) -> Strings<&[u64], &[u8]> {
        Strings {
            bounds: &self.bounds[..],
            values: &self.values[..],
        }
    }
}

impl<'a> Strings<&'a [u64], &'a [u8]> {
    /// Whether the bounds are non-decreasing and stay within `values`.
    ///
    /// Indexing a column that fails this check panics, so decoded columns must pass it first.
    pub fn well_formed(&self) -> bool {
        let mut lower = 0u64;
        for &upper in self.bounds.iter() {
            if upper < lower { return false; }
            lower = upper;
        }
        lower <= self.values.len() as u64
    }
}

impl<BC: Len, VC> Len for Strings<BC, VC> {
    #[inline(always)] fn len(&self) -> usize { self.bounds.len() }
}

impl<'a, BC: Len+IndexAs<u64>> Index for Strings<BC, &'a [u8]> {
    type Ref = &'a [u8];
    #[inline(always)] fn get(&self, index: usize) -> Self::Ref {
        let lower: u64 = if index == 0 { 0 } else { self.bounds.index_as(index - 1) };
        let upper: u64 = self.bounds.index_as(index);
        &self.values[lower as usize .. upper as usize]
    }
}
impl<'a, BC: Len+IndexAs<u64>> Index for &'a Strings<BC, Vec<u8>> {
    type Ref = &'a [u8];
    #[inline(always)] fn get(&self, index: usize) -> Self::Ref {
        let lower: u64 = if index == 0 { 0 } else { self.bounds.index_as(index - 1) };
        let upper: u64 = self.bounds.index_as(index);
        &self.values[lower as usize .. upper as usize]
    }
}

impl Push<&str> for Strings {
    #[inline(always)] fn push(&mut self, item: &str) {
        self.values.extend_from_slice(item.as_bytes());
        self.bounds.push(self.values.len() as u64);
    }
}
impl Push<&String> for Strings {
    #[inline(always)] fn push(&mut self, item: &String) {
        self.push(item.as_str())
    }
}

impl<BC: HeapSize, VC: HeapSize> HeapSize for Strings<BC, VC> {
    fn heap_size(&self) -> (usize, usize) {
        let (l0, c0) = self.bounds.heap_size();
        let (l1, c1) = self.values.heap_size();
        (l0 + l1, c0 + c1)
    }
}
