/// Methods to convert containers to and from byte slices.
///
/// Decoding reads untrusted files, so unlike encoding it can fail: a slice may be
/// missing, or have a length or alignment that does not fit the target type.

pub trait AsBytes {
    /// Presents `self` as a sequence of byte slices, with their required alignment.
    fn as_bytes(&self) -> impl Iterator<Item=(usize, &[u8])>;
}
pub trait FromBytes<'a> : Sized {
    /// Reconstructs `self` from a sequence of correctly aligned and sized bytes slices.
    ///
    /// The implementation is expected to consume the right number of items from the iterator,
    /// which may go on to be used by other implementations of `FromBytes`.
    fn from_bytes(bytes: &mut impl Iterator<Item=&'a [u8]>) -> Result<Self, BytesError>;
}

/// Why a byte slice could not be viewed as a typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytesError {
    /// The iterator ran out of slices.
    Exhausted,
    Cast(bytemuck::PodCastError),
}

impl std::fmt::Display for BytesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BytesError::Exhausted => write!(f, "missing section"),
            BytesError::Cast(error) => write!(f, "section layout: {error:?}"),
        }
    }
}

macro_rules! implement_byteslices {
    ($($index_type:ty),*) => { $(
        impl AsBytes for Vec<$index_type> {
            fn as_bytes(&self) -> impl Iterator<Item=(usize, &[u8])> {
                std::iter::once((std::mem::align_of::<$index_type>(), bytemuck::cast_slice(&self[..])))
            }
        }
        impl<'a> AsBytes for &'a [$index_type] {
            fn as_bytes(&self) -> impl Iterator<Item=(usize, &[u8])> {
                std::iter::once((std::mem::align_of::<$index_type>(), bytemuck::cast_slice(&self[..])))
            }
        }
        impl<'a> FromBytes<'a> for &'a [$index_type] {
            fn from_bytes(bytes: &mut impl Iterator<Item=&'a [u8]>) -> Result<Self, BytesError> {
                let slice = bytes.next().ok_or(BytesError::Exhausted)?;
                bytemuck::try_cast_slice(slice).map_err(BytesError::Cast)
            }
        }
    )* }
}

implement_byteslices!(u8, u32, u64);

use crate::string::Strings;

impl<BC: AsBytes, VC: AsBytes> AsBytes for Strings<BC, VC> {
    fn as_bytes(&self) -> impl Iterator<Item=(usize, &[u8])> {
        self.bounds.as_bytes().chain(self.values.as_bytes())
    }
}
impl<'a, BC: FromBytes<'a>, VC: FromBytes<'a>> FromBytes<'a> for Strings<BC, VC> {
    fn from_bytes(bytes: &mut impl Iterator<Item=&'a [u8]>) -> Result<Self, BytesError> {
        Ok(Self {
            bounds: FromBytes::from_bytes(bytes)?,
            values: FromBytes::from_bytes(bytes)?,
        })
    }
}

macro_rules! tuple_impl {
    ( $($name:ident)+) => (
        impl<$($name: AsBytes),*> AsBytes for ($($name,)*) {
            #[allow(non_snake_case)]
            fn as_bytes(&self) -> impl Iterator<Item=(usize, &[u8])> {
                let ($($name,)*) = self;
                let iter = None.into_iter();
                $( let iter = iter.chain($name.as_bytes()); )*
                iter
            }
        }
        impl<'a, $($name: FromBytes<'a>),*> FromBytes<'a> for ($($name,)*) {
            #[allow(non_snake_case)]
            fn from_bytes(bytes: &mut impl Iterator<Item=&'a [u8]>) -> Result<Self, BytesError> {
                $(let $name = FromBytes::from_bytes(bytes)?;)*
                Ok(($($name,)*))
            }
        }
    )
}

tuple_impl!(A);
tuple_impl!(A B);
tuple_impl!(A B C);
tuple_impl!(A B C D);
tuple_impl!(A B C D E);
