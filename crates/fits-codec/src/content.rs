//! N-dimensional content arrays and their big-endian block encoding.

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::debug;

use crate::addressing::Strides;
use crate::block::DATA_PAD_BYTE;
use crate::element::{ContentBuffer, Element, ElementKind};
use crate::error::{Error, Result};
use crate::io::{BlockReader, BlockWriter};

/// Number of elements described by `axes`; zero for no axes, `None` on
/// overflow.
fn element_count(axes: &[usize]) -> Option<usize> {
    if axes.is_empty() {
        return Some(0);
    }
    axes.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

/// A typed flat buffer plus the axis sizes it is laid out over.
#[derive(Debug, Clone, PartialEq)]
pub struct DataContent {
    strides: Strides,
    buffer: ContentBuffer,
}

impl DataContent {
    /// Fails with [`Error::ElementCountMismatch`] unless the buffer holds
    /// exactly `product(axes)` elements.
    pub fn new(axes: Vec<usize>, buffer: ContentBuffer) -> Result<Self> {
        let expected = element_count(&axes).unwrap_or(usize::MAX);
        if buffer.len() != expected {
            return Err(Error::ElementCountMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(DataContent {
            strides: Strides::new(&axes),
            buffer,
        })
    }

    pub fn from_vec<T: Element>(axes: Vec<usize>, values: Vec<T>) -> Result<Self> {
        DataContent::new(axes, T::wrap(values))
    }

    pub fn kind(&self) -> ElementKind {
        self.buffer.kind()
    }

    pub fn axes(&self) -> &[usize] {
        self.strides.sizes()
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    pub fn buffer(&self) -> &ContentBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> ContentBuffer {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn type_mismatch<T: Element>(&self) -> Error {
        Error::TypeMismatch {
            requested: T::KIND,
            declared: self.kind(),
        }
    }

    /// The flat elements as `T`, which must be the declared kind.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        T::slice(&self.buffer).ok_or_else(|| self.type_mismatch::<T>())
    }

    pub fn into_vec<T: Element>(self) -> Result<Vec<T>> {
        let declared = self.kind();
        T::from_buffer(self.buffer).map_err(|_| Error::TypeMismatch {
            requested: T::KIND,
            declared,
        })
    }

    /// Element at `coords`, one coordinate per axis, axis 0 first.
    pub fn value_at<T: Element>(&self, coords: &[usize]) -> Result<T> {
        let values = self.as_slice::<T>()?;
        let offset = self.strides.offset(coords)?;
        Ok(values[offset])
    }
}

/// Decode `product(axes)` big-endian elements of `kind`.
///
/// Returns whether the stream is exhausted right after the content bytes.
/// The padding up to the next block boundary is left unread. With zero
/// elements nothing is consumed and `false` is returned.
pub async fn decode_content<R>(
    reader: &mut BlockReader<R>,
    axes: &[usize],
    kind: ElementKind,
) -> Result<(bool, ContentBuffer)>
where
    R: AsyncBufRead + Unpin,
{
    let len = element_count(axes)
        .and_then(|count| count.checked_mul(kind.bytes_per_element()))
        .ok_or_else(|| Error::ContentTooLarge {
            axes: axes.to_vec(),
        })?;
    if len == 0 {
        return Ok((false, ContentBuffer::empty(kind)));
    }
    let raw = reader.read_region(len).await?;
    let buffer = ContentBuffer::decode_be(kind, &raw);
    let end_of_stream = reader.is_exhausted().await?;
    debug!(?kind, elements = buffer.len(), end_of_stream, "decoded content");
    Ok((end_of_stream, buffer))
}

/// Encode a buffer as big-endian bytes followed by zero padding to the
/// next block boundary.
pub async fn encode_content<W>(writer: &mut BlockWriter<W>, buffer: &ContentBuffer) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&buffer.to_be_bytes()).await?;
    writer.pad_to_block(DATA_PAD_BYTE).await?;
    debug!(kind = ?buffer.kind(), elements = buffer.len(), "encoded content");
    Ok(())
}
