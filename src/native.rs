//! Native immutable strings.
//!
//! A [`NativeString`] is a shared, immutable buffer of either one-byte
//! (Latin-1) or two-byte (UTF-16) code units. Ownership is counted: cloning
//! a handle takes a reference, dropping it releases one, and the buffer is
//! freed when the last handle goes away.

use std::sync::Arc;

use bytes::Bytes;

/// Identity of a native string buffer.
///
/// Two buffers with equal contents have different keys. A key stays unique
/// only while some handle keeps its buffer alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringKey(usize);

#[derive(Clone)]
pub(crate) enum StringData {
    Latin1(Bytes),
    Utf16(Arc<[u16]>),
}

struct StringImpl {
    data: StringData,
}

/// Reference-counted immutable string buffer.
#[derive(Clone)]
pub struct NativeString(Arc<StringImpl>);

impl NativeString {
    /// Create a one-byte string from Latin-1 code units.
    pub fn from_latin1(bytes: impl Into<Bytes>) -> Self {
        Self::from_data(StringData::Latin1(bytes.into()))
    }

    /// Create a two-byte string from UTF-16 code units.
    pub fn from_utf16(units: impl Into<Arc<[u16]>>) -> Self {
        Self::from_data(StringData::Utf16(units.into()))
    }

    /// Create a string from Rust text, using one-byte storage when every
    /// character fits in Latin-1.
    pub fn new(s: &str) -> Self {
        if s.chars().all(|c| (c as u32) <= 0xFF) {
            let latin1: Vec<u8> = s.chars().map(|c| c as u8).collect();
            Self::from_latin1(latin1)
        } else {
            let units: Vec<u16> = s.encode_utf16().collect();
            Self::from_utf16(units)
        }
    }

    fn from_data(data: StringData) -> Self {
        Self(Arc::new(StringImpl { data }))
    }

    /// Length in code units.
    pub fn len(&self) -> usize {
        match &self.0.data {
            StringData::Latin1(bytes) => bytes.len(),
            StringData::Utf16(units) => units.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the buffer stores one-byte code units.
    pub fn is_8bit(&self) -> bool {
        matches!(self.0.data, StringData::Latin1(_))
    }

    /// Size of the character storage in bytes.
    pub fn byte_len(&self) -> usize {
        match &self.0.data {
            StringData::Latin1(bytes) => bytes.len(),
            StringData::Utf16(units) => units.len() * 2,
        }
    }

    /// Identity key of the underlying buffer.
    #[inline]
    pub fn key(&self) -> StringKey {
        StringKey(Arc::as_ptr(&self.0) as usize)
    }

    /// Number of handles currently sharing this buffer.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Whether both handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &NativeString) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Decode into a Rust string, replacing unpaired surrogates.
    pub fn to_string_lossy(&self) -> String {
        match &self.0.data {
            StringData::Latin1(bytes) => bytes.iter().map(|&b| b as char).collect(),
            StringData::Utf16(units) => String::from_utf16_lossy(units),
        }
    }

    pub(crate) fn data(&self) -> &StringData {
        &self.0.data
    }
}

impl From<&str> for NativeString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Debug for NativeString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeString")
            .field("value", &self.to_string_lossy())
            .field("is_8bit", &self.is_8bit())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
