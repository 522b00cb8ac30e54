use std::ffi::{CStr, CString};

use crate::type_tag::TypeTag;

/// A value that can be written as one argument of a binary log record.
///
/// Implementations map a concrete Rust type onto exactly one [`TypeTag`] and
/// append the value's wire encoding to a record buffer. The trait is object
/// safe so that a call site can pass its arguments as `&[&dyn Loggable]`
/// without allocating.
///
/// Integers and floats are encoded little-endian at their natural width.
/// Strings are encoded as a 4-byte little-endian length followed by the bytes,
/// except C strings which are written raw including their terminator.
pub trait Loggable {
    /// Wire type of this value.
    fn type_tag(&self) -> TypeTag;

    /// Whether this argument is a constant of its call site.
    ///
    /// Only [`Const`] returns `true`.
    fn is_constant(&self) -> bool {
        false
    }

    /// Appends the encoded value to `out`.
    fn encode(&self, out: &mut Vec<u8>);
}

/// Marks an argument as constant for its call site.
///
/// The wrapped value is written once, into the index record, when the format
/// string is first registered. Data records for the same format string never
/// carry it again.
///
/// The caller must pass the same value on every call through a given format
/// string. This is not checked: a different value is silently ignored and the
/// decoded output will show the value captured at registration.
///
/// ```
/// use binary_log::{Const, Logger, log_record};
///
/// let mut index = Vec::new();
/// let mut data = Vec::new();
/// let mut logger: Logger<_, _> = Logger::new(&mut index, &mut data);
/// log_record!(logger, "build={} request={}", Const("1.4.2"), 17u32).unwrap();
/// drop(logger);
/// // Only the index byte and the u32 reach the data stream.
/// assert_eq!(data.len(), 1 + 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Const<T>(pub T);

impl<T: Loggable> Loggable for Const<T> {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        self.0.type_tag()
    }

    #[inline(always)]
    fn is_constant(&self) -> bool {
        true
    }

    #[inline(always)]
    fn encode(&self, out: &mut Vec<u8>) {
        self.0.encode(out)
    }
}

impl<T: Loggable + ?Sized> Loggable for &T {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        (**self).type_tag()
    }

    #[inline(always)]
    fn is_constant(&self) -> bool {
        (**self).is_constant()
    }

    #[inline(always)]
    fn encode(&self, out: &mut Vec<u8>) {
        (**self).encode(out)
    }
}

macro_rules! impl_loggable_le {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Loggable for $ty {
                #[inline(always)]
                fn type_tag(&self) -> TypeTag {
                    TypeTag::$tag
                }

                #[inline(always)]
                fn encode(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_loggable_le! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl Loggable for char {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        TypeTag::Char
    }

    #[inline(always)]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(*self as u32).to_le_bytes());
    }
}

impl Loggable for bool {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        TypeTag::U8
    }

    #[inline(always)]
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

impl Loggable for usize {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        TypeTag::U64
    }

    #[inline(always)]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(*self as u64).to_le_bytes());
    }
}

impl Loggable for isize {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        TypeTag::I64
    }

    #[inline(always)]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(*self as i64).to_le_bytes());
    }
}

/// Appends a 4-byte length prefix and the bytes.
///
/// Panics if `bytes` is longer than `u32::MAX`.
#[inline]
fn encode_prefixed(bytes: &[u8], out: &mut Vec<u8>) {
    let len = u32::try_from(bytes.len()).unwrap_or_else(|_| {
        panic!("string argument of {} bytes exceeds the u32 length prefix", bytes.len())
    });
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
}

impl Loggable for str {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        TypeTag::StringSlice
    }

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        encode_prefixed(self.as_bytes(), out);
    }
}

impl Loggable for String {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        TypeTag::LengthPrefixed
    }

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        encode_prefixed(self.as_bytes(), out);
    }
}

impl Loggable for CStr {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        TypeTag::NullTerminated
    }

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_bytes_with_nul());
    }
}

impl Loggable for CString {
    #[inline(always)]
    fn type_tag(&self) -> TypeTag {
        TypeTag::NullTerminated
    }

    #[inline]
    fn encode(&self, out: &mut Vec<u8>) {
        self.as_c_str().encode(out)
    }
}
