//! Element kinds selected by BITPIX and the typed buffers that hold them.

use core::fmt::Debug;

use bytemuck::{pod_collect_to_vec, Pod};

use crate::error::{Error, Result};

/// Primitive element type of a content array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ElementKind {
    /// Map a BITPIX code to its element kind.
    pub fn from_bitpix(bitpix: i64) -> Result<Self> {
        match bitpix {
            8 => Ok(ElementKind::U8),
            16 => Ok(ElementKind::I16),
            32 => Ok(ElementKind::I32),
            64 => Ok(ElementKind::I64),
            -32 => Ok(ElementKind::F32),
            -64 => Ok(ElementKind::F64),
            other => Err(Error::UnsupportedDataType(other)),
        }
    }

    pub const fn bitpix(self) -> i64 {
        match self {
            ElementKind::U8 => 8,
            ElementKind::I16 => 16,
            ElementKind::I32 => 32,
            ElementKind::I64 => 64,
            ElementKind::F32 => -32,
            ElementKind::F64 => -64,
        }
    }

    /// `|BITPIX| / 8`.
    pub const fn bytes_per_element(self) -> usize {
        (self.bitpix().unsigned_abs() / 8) as usize
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ElementKind::F32 | ElementKind::F64)
    }
}

/// A Rust type that can be stored as FITS content.
pub trait Element: Pod + PartialEq + Debug + Send + Sync {
    const KIND: ElementKind;

    /// Convert a value read as big-endian bytes into native order.
    fn from_big_endian(self) -> Self;

    /// Convert a native value into big-endian byte order.
    fn to_big_endian(self) -> Self;

    fn wrap(values: Vec<Self>) -> ContentBuffer;

    fn slice(buffer: &ContentBuffer) -> Option<&[Self]>;

    /// Take the values out of a buffer of the same kind, or hand it back.
    fn from_buffer(buffer: ContentBuffer) -> core::result::Result<Vec<Self>, ContentBuffer>;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident, |$v:ident| $from:expr, |$w:ident| $to:expr) => {
        impl Element for $t {
            const KIND: ElementKind = ElementKind::$variant;

            #[inline]
            fn from_big_endian(self) -> Self {
                let $v = self;
                $from
            }

            #[inline]
            fn to_big_endian(self) -> Self {
                let $w = self;
                $to
            }

            fn wrap(values: Vec<Self>) -> ContentBuffer {
                ContentBuffer::$variant(values)
            }

            fn slice(buffer: &ContentBuffer) -> Option<&[Self]> {
                match buffer {
                    ContentBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_buffer(buffer: ContentBuffer) -> core::result::Result<Vec<Self>, ContentBuffer> {
                match buffer {
                    ContentBuffer::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }
        }
    };
}

impl_element!(u8, U8, |v| v, |v| v);
impl_element!(i16, I16, |v| i16::from_be(v), |v| v.to_be());
impl_element!(i32, I32, |v| i32::from_be(v), |v| v.to_be());
impl_element!(i64, I64, |v| i64::from_be(v), |v| v.to_be());
impl_element!(
    f32,
    F32,
    |v| f32::from_bits(u32::from_be(v.to_bits())),
    |v| f32::from_bits(v.to_bits().to_be())
);
impl_element!(
    f64,
    F64,
    |v| f64::from_bits(u64::from_be(v.to_bits())),
    |v| f64::from_bits(v.to_bits().to_be())
);

/// Flat element storage, typed by BITPIX.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBuffer {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! dispatch {
    ($buffer:expr, $v:ident => $body:expr) => {
        match $buffer {
            ContentBuffer::U8($v) => $body,
            ContentBuffer::I16($v) => $body,
            ContentBuffer::I32($v) => $body,
            ContentBuffer::I64($v) => $body,
            ContentBuffer::F32($v) => $body,
            ContentBuffer::F64($v) => $body,
        }
    };
}

fn decode_vec<T: Element>(raw: &[u8]) -> Vec<T> {
    let mut values: Vec<T> = pod_collect_to_vec(raw);
    for v in &mut values {
        *v = v.from_big_endian();
    }
    values
}

fn encode_slice<T: Element>(values: &[T]) -> Vec<u8> {
    let swapped: Vec<T> = values.iter().map(|v| v.to_big_endian()).collect();
    pod_collect_to_vec(&swapped)
}

impl ContentBuffer {
    /// An empty buffer of the given kind.
    pub fn empty(kind: ElementKind) -> Self {
        match kind {
            ElementKind::U8 => ContentBuffer::U8(Vec::new()),
            ElementKind::I16 => ContentBuffer::I16(Vec::new()),
            ElementKind::I32 => ContentBuffer::I32(Vec::new()),
            ElementKind::I64 => ContentBuffer::I64(Vec::new()),
            ElementKind::F32 => ContentBuffer::F32(Vec::new()),
            ElementKind::F64 => ContentBuffer::F64(Vec::new()),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            ContentBuffer::U8(_) => ElementKind::U8,
            ContentBuffer::I16(_) => ElementKind::I16,
            ContentBuffer::I32(_) => ElementKind::I32,
            ContentBuffer::I64(_) => ElementKind::I64,
            ContentBuffer::F32(_) => ElementKind::F32,
            ContentBuffer::F64(_) => ElementKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode big-endian bytes into native-order elements.
    ///
    /// `raw.len()` must be a multiple of the element size; trailing bytes of
    /// an incomplete element are ignored.
    pub fn decode_be(kind: ElementKind, raw: &[u8]) -> Self {
        let whole = raw.len() - raw.len() % kind.bytes_per_element();
        let raw = &raw[..whole];
        match kind {
            ElementKind::U8 => ContentBuffer::U8(raw.to_vec()),
            ElementKind::I16 => ContentBuffer::I16(decode_vec(raw)),
            ElementKind::I32 => ContentBuffer::I32(decode_vec(raw)),
            ElementKind::I64 => ContentBuffer::I64(decode_vec(raw)),
            ElementKind::F32 => ContentBuffer::F32(decode_vec(raw)),
            ElementKind::F64 => ContentBuffer::F64(decode_vec(raw)),
        }
    }

    /// Big-endian bytes of every element, unpadded.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        match self {
            ContentBuffer::U8(v) => v.clone(),
            ContentBuffer::I16(v) => encode_slice(v),
            ContentBuffer::I32(v) => encode_slice(v),
            ContentBuffer::I64(v) => encode_slice(v),
            ContentBuffer::F32(v) => encode_slice(v),
            ContentBuffer::F64(v) => encode_slice(v),
        }
    }
}
