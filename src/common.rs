//! Common traits and types that are re-used throughout the crate.
//!
//! These describe the flat containers the snapshot codec works with: node columns
//! and the dictionary's name table are all "a length, a way to push, a way to index".

/// A type with a length.
pub trait Len {
    /// The number of contained elements.
    fn len(&self) -> usize;
    /// Whether this contains no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl<L: Len + ?Sized> Len for &L {
    #[inline(always)] fn len(&self) -> usize { L::len(*self) }
}
impl<T> Len for Vec<T> {
    #[inline(always)] fn len(&self) -> usize { self.len() }
}
impl<T> Len for [T] {
    #[inline(always)] fn len(&self) -> usize { <[T]>::len(self) }
}

/// A type that can accept items of type `T`.
pub trait Push<T> {
    /// Pushes an item onto `self`.
    fn push(&mut self, item: T);
    /// Pushes elements of an iterator onto `self`.
    #[inline(always)] fn extend(&mut self, iter: impl IntoIterator<Item=T>) {
        for item in iter {
            self.push(item);
        }
    }
}
impl<T> Push<T> for Vec<T> {
    #[inline(always)] fn push(&mut self, item: T) { self.push(item) }

    #[inline(always)]
    fn extend(&mut self, iter: impl IntoIterator<Item=T>) {
        std::iter::Extend::extend(self, iter)
    }
}

pub use index::{Index, IndexAs, CopyAs};
pub mod index {
    //! Accessing elements by `usize` index, with results that do not borrow `&self`.

    use super::{IterOwn, Len};

    /// A type that can be accessed by `usize` but without borrowing `self`.
    ///
    /// Borrowed columns (`&'a [u32]`, `Strings<&'a [u64], &'a [u8]>`) return references
    /// with their own lifetime `'a`, which is what lets a decoder walk several columns at once.
    pub trait Index {
        /// The type returned by the `get` method.
        type Ref;
        fn get(&self, index: usize) -> Self::Ref;
        #[inline(always)] fn last(&self) -> Option<Self::Ref> where Self: Len {
            if self.is_empty() { None }
            else { Some(self.get(self.len()-1)) }
        }
        /// Converts `&self` into an iterator.
        ///
        /// This has an awkward name to avoid collision with `iter()`, which may also be implemented.
        #[inline(always)]
        fn index_iter(&self) -> IterOwn<&Self> {
            IterOwn::new(0, self)
        }
    }

    impl<T: Index> Index for &T {
        type Ref = T::Ref;
        #[inline(always)] fn get(&self, index: usize) -> Self::Ref { T::get(*self, index) }
    }
    impl<'a, T> Index for &'a [T] {
        type Ref = &'a T;
        #[inline(always)] fn get(&self, index: usize) -> Self::Ref { &self[index] }
    }
    impl<T: Copy> Index for Vec<T> {
        type Ref = T;
        #[inline(always)] fn get(&self, index: usize) -> Self::Ref { self[index] }
    }

    /// Types that can be converted into another type by copying.
    ///
    /// We use this trait to unify the ability of `T` and `&T` to be converted into `T`.
    pub trait CopyAs<T> : Copy {
        fn copy_as(self) -> T;
    }
    impl<T: Copy> CopyAs<T> for &T {
        #[inline(always)] fn copy_as(self) -> T { *self }
    }
    impl<T: Copy> CopyAs<T> for T {
        #[inline(always)] fn copy_as(self) -> T { self }
    }

    /// Indexed access that copies out a `T`, whether the container hands back `T` or `&T`.
    pub trait IndexAs<T> {
        fn index_as(&self, index: usize) -> T;
    }
    impl<T: Index, S> IndexAs<S> for T where T::Ref: CopyAs<S> {
        #[inline(always)] fn index_as(&self, index: usize) -> S { self.get(index).copy_as() }
    }
}

/// An iterator over an `Index` type, by position.
pub struct IterOwn<S> {
    index: usize,
    slice: S,
}

impl<S> IterOwn<S> {
    pub fn new(index: usize, slice: S) -> Self {
        Self { index, slice }
    }
}

impl<S: Index + Len> Iterator for IterOwn<S> {
    type Item = S::Ref;
    #[inline(always)] fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.slice.len() {
            let result = self.slice.get(self.index);
            self.index += 1;
            Some(result)
        } else {
            None
        }
    }
    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.slice.len() - self.index, Some(self.slice.len() - self.index))
    }
}

impl<S: Index + Len> ExactSizeIterator for IterOwn<S> { }

pub trait HeapSize {
    /// Active (len) and allocated (cap) heap sizes in bytes.
    /// This should not include the size of `self` itself.
    fn heap_size(&self) -> (usize, usize) { (0, 0) }
}

impl HeapSize for u8 { }
impl HeapSize for u32 { }
impl HeapSize for u64 { }

impl HeapSize for String {
    fn heap_size(&self) -> (usize, usize) {
        (self.len(), self.capacity())
    }
}
impl HeapSize for Box<str> {
    fn heap_size(&self) -> (usize, usize) {
        (self.len(), self.len())
    }
}
impl<T: HeapSize> HeapSize for Vec<T> {
    fn heap_size(&self) -> (usize, usize) {
        let mut l = std::mem::size_of::<T>() * self.len();
        let mut c = std::mem::size_of::<T>() * self.capacity();
        for item in (self[..]).iter() {
            let (il, ic) = item.heap_size();
            l += il;
            c += ic;
        }
        (l, c)
    }
}

#[cfg(test)]
mod test {

    use super::{HeapSize, Index, IndexAs, Len, Push};

    #[test]
    fn index_borrowed_and_owned() {
        let mut column: Vec<u32> = Vec::new();
        Push::extend(&mut column, 0 .. 10u32);
        assert_eq!(Len::len(&column), 10);
        assert_eq!(Index::get(&column, 3), 3);
        assert_eq!(Index::last(&column), Some(9));

        let borrowed: &[u32] = &column[..];
        assert_eq!(*Index::get(&borrowed, 4), 4);
        assert_eq!(IndexAs::<u32>::index_as(&borrowed, 5), 5);
        assert_eq!(borrowed.index_iter().copied().sum::<u32>(), 45);
    }

    #[test]
    fn heap_size_counts_nested() {
        let column = vec!["ab".to_string(), "cde".to_string()];
        let (len, cap) = column.heap_size();
        assert_eq!(len, 2 * std::mem::size_of::<String>() + 5);
        assert!(cap >= len);
    }
}
