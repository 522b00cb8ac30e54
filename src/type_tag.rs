use std::fmt;

/// Wire type of one argument position.
///
/// A tag is written once per argument position into the index record when a
/// format string is first registered. Data records never carry tags; a decoder
/// recovers them from the index record referenced by the format string index.
///
/// The numeric values are part of the wire format and must not change.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Unicode scalar value, 4 bytes.
    Char = 0,
    I8 = 1,
    I16 = 2,
    I32 = 3,
    I64 = 4,
    U8 = 5,
    U16 = 6,
    U32 = 7,
    U64 = 8,
    F32 = 9,
    F64 = 10,
    /// Raw bytes followed by a single `0` terminator.
    NullTerminated = 11,
    /// Owned string: `u32` length prefix followed by the bytes.
    LengthPrefixed = 12,
    /// Borrowed string slice: `u32` length prefix followed by the bytes.
    StringSlice = 13,
}

/// Width in bytes of the length prefix used by [`TypeTag::LengthPrefixed`]
/// and [`TypeTag::StringSlice`] values.
pub const STRING_LENGTH_PREFIX: usize = 4;

impl TypeTag {
    /// Every tag, in wire order.
    pub const ALL: [TypeTag; 14] = [
        TypeTag::Char,
        TypeTag::I8,
        TypeTag::I16,
        TypeTag::I32,
        TypeTag::I64,
        TypeTag::U8,
        TypeTag::U16,
        TypeTag::U32,
        TypeTag::U64,
        TypeTag::F32,
        TypeTag::F64,
        TypeTag::NullTerminated,
        TypeTag::LengthPrefixed,
        TypeTag::StringSlice,
    ];

    #[inline(always)]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Encoded size of a value with this tag, or `None` for the
    /// variable-length string types.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            TypeTag::I8 | TypeTag::U8 => Some(1),
            TypeTag::I16 | TypeTag::U16 => Some(2),
            TypeTag::Char | TypeTag::I32 | TypeTag::U32 | TypeTag::F32 => Some(4),
            TypeTag::I64 | TypeTag::U64 | TypeTag::F64 => Some(8),
            TypeTag::NullTerminated | TypeTag::LengthPrefixed | TypeTag::StringSlice => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::Char => "char",
            TypeTag::I8 => "i8",
            TypeTag::I16 => "i16",
            TypeTag::I32 => "i32",
            TypeTag::I64 => "i64",
            TypeTag::U8 => "u8",
            TypeTag::U16 => "u16",
            TypeTag::U32 => "u32",
            TypeTag::U64 => "u64",
            TypeTag::F32 => "f32",
            TypeTag::F64 => "f64",
            TypeTag::NullTerminated => "cstr",
            TypeTag::LengthPrefixed => "string",
            TypeTag::StringSlice => "str",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a byte does not name a known [`TypeTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownTypeTag(pub u8);

impl fmt::Display for UnknownTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown type tag {}", self.0)
    }
}

impl std::error::Error for UnknownTypeTag {}

impl TryFrom<u8> for TypeTag {
    type Error = UnknownTypeTag;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TypeTag::ALL
            .get(value as usize)
            .copied()
            .ok_or(UnknownTypeTag(value))
    }
}
