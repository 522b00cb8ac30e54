#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use binary_log::TypeTag;
use parking_lot::Mutex;

/// Sink that appends into a shared buffer the test keeps a handle to.
#[derive(Clone, Default)]
pub struct CollectingSink {
    pub data: Arc<Mutex<Vec<u8>>>,
    pub writes: Arc<AtomicUsize>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// Number of `write` calls seen; the logger issues one per record.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Write for CollectingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.data.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that accepts `remaining` writes and fails every write after that.
pub struct FailingSink {
    pub remaining: usize,
    pub accepted: Vec<u8>,
}

impl FailingSink {
    pub fn after(remaining: usize) -> Self {
        Self {
            remaining,
            accepted: Vec::new(),
        }
    }
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.remaining -= 1;
        self.accepted.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    CStr(Vec<u8>),
    String(String),
    Str(String),
}

/// Format string metadata decoded from one index record.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub format: String,
    pub tags: Vec<TypeTag>,
    /// `Some(value)` for constant positions.
    pub constants: Vec<Option<Value>>,
}

impl IndexEntry {
    pub fn variable_count(&self) -> usize {
        self.constants.iter().filter(|c| c.is_none()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    pub index: u64,
    /// Values read from the data record itself.
    pub variables: Vec<Value>,
    /// All argument values in positional order, constants filled in.
    pub args: Vec<Value>,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        assert!(
            self.pos + len <= self.data.len(),
            "truncated stream at {} (+{len})",
            self.pos
        );
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        slice
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        self.take(N).try_into().unwrap()
    }

    fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    fn uint(&mut self, width: usize) -> u64 {
        let mut bytes = [0u8; 8];
        bytes[..width].copy_from_slice(self.take(width));
        u64::from_le_bytes(bytes)
    }

    fn prefixed(&mut self) -> String {
        let len = u32::from_le_bytes(self.array()) as usize;
        String::from_utf8(self.take(len).to_vec()).unwrap()
    }

    fn value(&mut self, tag: TypeTag) -> Value {
        match tag {
            TypeTag::Char => Value::Char(char::from_u32(u32::from_le_bytes(self.array())).unwrap()),
            TypeTag::I8 => Value::I8(i8::from_le_bytes(self.array())),
            TypeTag::I16 => Value::I16(i16::from_le_bytes(self.array())),
            TypeTag::I32 => Value::I32(i32::from_le_bytes(self.array())),
            TypeTag::I64 => Value::I64(i64::from_le_bytes(self.array())),
            TypeTag::U8 => Value::U8(self.u8()),
            TypeTag::U16 => Value::U16(u16::from_le_bytes(self.array())),
            TypeTag::U32 => Value::U32(u32::from_le_bytes(self.array())),
            TypeTag::U64 => Value::U64(u64::from_le_bytes(self.array())),
            TypeTag::F32 => Value::F32(f32::from_le_bytes(self.array())),
            TypeTag::F64 => Value::F64(f64::from_le_bytes(self.array())),
            TypeTag::NullTerminated => {
                let rest = &self.data[self.pos..];
                let end = rest.iter().position(|&b| b == 0).expect("unterminated C string");
                Value::CStr(self.take(end + 1).to_vec())
            }
            TypeTag::LengthPrefixed => Value::String(self.prefixed()),
            TypeTag::StringSlice => Value::Str(self.prefixed()),
        }
    }
}

/// Decodes a complete index stream.
pub fn decode_index(bytes: &[u8]) -> Vec<IndexEntry> {
    let mut cur = Cursor::new(bytes);
    let mut entries = Vec::new();
    while !cur.at_end() {
        let len = cur.u8() as usize;
        let format = String::from_utf8(cur.take(len).to_vec()).unwrap();
        let count = cur.u8() as usize;
        let tags: Vec<TypeTag> = (0..count)
            .map(|_| TypeTag::try_from(cur.u8()).unwrap())
            .collect();
        let constants = tags
            .iter()
            .map(|&tag| match cur.u8() {
                0 => None,
                1 => Some(cur.value(tag)),
                flag => panic!("bad constant flag {flag}"),
            })
            .collect();
        entries.push(IndexEntry {
            format,
            tags,
            constants,
        });
    }
    entries
}

/// Decodes a complete data stream written with a `width`-byte index.
pub fn decode_data(entries: &[IndexEntry], bytes: &[u8], width: usize) -> Vec<DataRecord> {
    let mut cur = Cursor::new(bytes);
    let mut records = Vec::new();
    while !cur.at_end() {
        let index = cur.uint(width);
        let entry = &entries[index as usize];
        let mut variables = Vec::new();
        let mut args = Vec::new();
        for (&tag, constant) in entry.tags.iter().zip(&entry.constants) {
            match constant {
                Some(value) => args.push(value.clone()),
                None => {
                    let value = cur.value(tag);
                    variables.push(value.clone());
                    args.push(value);
                }
            }
        }
        records.push(DataRecord {
            index,
            variables,
            args,
        });
    }
    records
}

/// Leaks a string so it can serve as a `&'static str` format.
pub fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}
