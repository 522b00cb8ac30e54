use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::loggable::Loggable;
use crate::type_tag::TypeTag;

mod sealed {
    pub trait Sealed {}
}

/// Integer type used to write the format string index of every data record.
///
/// Implemented for `u8`, `u16`, `u32` and `u64`. The width is a logger-wide
/// setting chosen through the logger's `Ix` type parameter; it bounds how many
/// distinct format strings one logger can register (`0..=Ix::MAX`).
pub trait FormatIndex:
    sealed::Sealed
    + Copy
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + Into<u64>
    + TryFrom<u64>
    + 'static
{
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Appends the little-endian encoding of `self`.
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_format_index {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}

            impl FormatIndex for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline(always)]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_format_index!(u8, u16, u32, u64);

/// Argument shape registered for a format string.
///
/// `tags[i]` and `constants[i]` describe formal argument position `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub tags: Box<[TypeTag]>,
    pub constants: Box<[bool]>,
}

impl Signature {
    /// Captures the shape of an argument list.
    pub fn of(args: &[&dyn Loggable]) -> Self {
        Self {
            tags: args.iter().map(|a| a.type_tag()).collect(),
            constants: args.iter().map(|a| a.is_constant()).collect(),
        }
    }

    pub fn arg_count(&self) -> usize {
        self.tags.len()
    }

    /// Number of positions whose value lives in the index record.
    pub fn constant_count(&self) -> usize {
        self.constants.iter().filter(|&&c| c).count()
    }

    /// Whether an argument list has exactly this shape.
    pub fn matches(&self, args: &[&dyn Loggable]) -> bool {
        self.tags.len() == args.len()
            && self
                .tags
                .iter()
                .zip(&self.constants[..])
                .zip(args)
                .all(|((&tag, &constant), arg)| {
                    arg.type_tag() == tag && arg.is_constant() == constant
                })
    }
}

/// One registered format string.
#[derive(Debug, Clone)]
pub struct FormatEntry {
    pub format: &'static str,
    pub signature: Signature,
}

/// Append-only table of the format strings a logger has registered.
///
/// Format strings are identified by content: two call sites using the same
/// text share one entry. Indices are handed out in first-seen order starting
/// at 0 and are never reused or reordered.
#[derive(Debug)]
pub struct FormatTable<Ix: FormatIndex> {
    by_text: HashMap<&'static str, Ix>,
    entries: Vec<FormatEntry>,
}

impl<Ix: FormatIndex> Default for FormatTable<Ix> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ix: FormatIndex> FormatTable<Ix> {
    pub fn new() -> Self {
        Self {
            by_text: HashMap::new(),
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn lookup(&self, format: &str) -> Option<Ix> {
        self.by_text.get(format).copied()
    }

    /// The index the next registration would receive, or `None` once every
    /// value of `Ix` is taken.
    pub fn next_index(&self) -> Option<Ix> {
        Ix::try_from(self.entries.len() as u64).ok()
    }

    /// Appends a new entry and returns its index.
    ///
    /// Returns `None` without modifying the table when the index space of
    /// `Ix` is exhausted. Callers must have checked that `format` is not
    /// already present.
    pub fn insert(&mut self, format: &'static str, signature: Signature) -> Option<Ix> {
        debug_assert!(!self.by_text.contains_key(format), "duplicate format string {format:?}");
        let index = self.next_index()?;
        self.by_text.insert(format, index);
        self.entries.push(FormatEntry { format, signature });
        Some(index)
    }

    pub fn get(&self, index: Ix) -> Option<&FormatEntry> {
        let i: u64 = index.into();
        usize::try_from(i).ok().and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &FormatEntry> {
        self.entries.iter()
    }
}
