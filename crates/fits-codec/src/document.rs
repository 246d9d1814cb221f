//! Reading and writing whole documents over async streams.

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, trace};

use crate::content::{decode_content, encode_content, DataContent};
use crate::element::ElementKind;
use crate::error::{Error, Result};
use crate::hdu::{Document, Hdu, HduKind};
use crate::header::{decode_header, encode_header, Header};
use crate::io::{BlockReader, BlockWriter};
use crate::options::CodecOptions;
use crate::validate::ValidatorSet;

/// Bytes of the extension heap that follow `count` content elements.
fn heap_len(header: &Header, kind: ElementKind, count: usize) -> u64 {
    let layout = header.layout();
    let count = count as i128;
    let bytes = kind.bytes_per_element() as i128
        * (layout.gcount() as i128 * (layout.pcount() as i128 + count) - count);
    u64::try_from(bytes).unwrap_or(0)
}

/// Streaming reader yielding one HDU at a time.
#[derive(Debug)]
pub struct FitsReader<R> {
    reader: BlockReader<R>,
    options: CodecOptions,
    index: usize,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> FitsReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_options(inner, CodecOptions::default())
    }

    pub fn with_options(inner: R, options: CodecOptions) -> Self {
        FitsReader {
            reader: BlockReader::new(inner, options.cancellation.clone()),
            options,
            index: 0,
            finished: false,
        }
    }

    /// Bytes consumed from the stream so far.
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    /// Decode the next header without validating it or touching its content.
    pub async fn read_header(&mut self) -> Result<Header> {
        let (header, _) = decode_header(&mut self.reader, self.options.max_header_blocks).await?;
        Ok(header)
    }

    /// Read, validate and return the next HDU, or `None` once the stream is
    /// exhausted.
    pub async fn next_hdu(&mut self) -> Result<Option<Hdu>> {
        if self.finished {
            return Ok(None);
        }
        let (header, _) = decode_header(&mut self.reader, self.options.max_header_blocks).await?;
        let kind = HduKind::detect(&header, self.index)?;
        ValidatorSet::for_kind(kind).check(&header, &self.options.cancellation)?;

        let content = match header.layout().naxis() {
            Some(naxis) if naxis > 0 => Some(self.read_content(&header, kind).await?),
            _ => None,
        };

        let padding = self.reader.skip_to_block_boundary().await?;
        trace!(bytes = padding, "skipped padding");
        self.finished = self.reader.is_exhausted().await?;
        debug!(index = self.index, ?kind, "read hdu");
        self.index += 1;
        Ok(Some(Hdu::new(kind, header, content)))
    }

    async fn read_content(&mut self, header: &Header, kind: HduKind) -> Result<DataContent> {
        let element = kind.element_kind(header)?;
        let axes = header
            .layout()
            .axes()
            .ok_or(Error::MissingKeyword("NAXISn"))?
            .to_vec();
        let (_, buffer) = decode_content(&mut self.reader, &axes, element).await?;

        let heap = heap_len(header, element, buffer.len());
        if heap > 0 {
            let skipped = self.reader.skip(heap).await?;
            trace!(bytes = skipped, "skipped extension heap");
        }
        DataContent::new(axes, buffer)
    }

    /// Read every remaining HDU and check the document as a whole.
    pub async fn read_document(mut self) -> Result<Document> {
        let mut hdus = Vec::new();
        while let Some(hdu) = self.next_hdu().await? {
            hdus.push(hdu);
        }
        let document = Document::new(hdus);
        ValidatorSet::document().check(&document, &self.options.cancellation)?;
        Ok(document)
    }
}

/// Writer that validates and encodes HDUs in order.
#[derive(Debug)]
pub struct FitsWriter<W> {
    writer: BlockWriter<W>,
    options: CodecOptions,
}

impl<W: AsyncWrite + Unpin> FitsWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, CodecOptions::default())
    }

    pub fn with_options(inner: W, options: CodecOptions) -> Self {
        FitsWriter {
            writer: BlockWriter::new(inner, options.cancellation.clone()),
            options,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Write every HDU of `document`.
    ///
    /// HDUs written before a failing one stay on the stream.
    pub async fn write_document(&mut self, document: &Document) -> Result<()> {
        ValidatorSet::document().check(document, &self.options.cancellation)?;
        for hdu in document.iter() {
            self.write_hdu(hdu).await?;
        }
        Ok(())
    }

    /// Validate, encode and flush a single HDU.
    pub async fn write_hdu(&mut self, hdu: &Hdu) -> Result<()> {
        let element = hdu.kind.element_kind(&hdu.header)?;
        ValidatorSet::for_kind(hdu.kind).check(&hdu.header, &self.options.cancellation)?;
        check_content(hdu, element)?;

        let header = encode_header(&hdu.header)?;
        self.writer.write_all(&header).await?;
        if let Some(content) = &hdu.content {
            encode_content(&mut self.writer, content.buffer()).await?;
        }
        self.writer.flush().await?;
        debug!(kind = ?hdu.kind, position = self.writer.position(), "wrote hdu");
        Ok(())
    }
}

/// Content must agree with what the header declares.
fn check_content(hdu: &Hdu, element: ElementKind) -> Result<()> {
    let layout = hdu.header.layout();
    if layout.pcount() > 0 {
        return Err(Error::UnsupportedHeap(layout.pcount()));
    }
    let declared = layout.axes().ok_or(Error::MissingKeyword("NAXISn"))?;
    match &hdu.content {
        Some(content) => {
            if content.kind() != element {
                return Err(Error::TypeMismatch {
                    requested: content.kind(),
                    declared: element,
                });
            }
            if content.axes() != declared {
                return Err(Error::ShapeMismatch {
                    expected: declared.to_vec(),
                    actual: content.axes().to_vec(),
                });
            }
        }
        None => {
            let expected = layout.element_count().unwrap_or(0);
            if expected > 0 {
                return Err(Error::ElementCountMismatch {
                    expected,
                    actual: 0,
                });
            }
        }
    }
    Ok(())
}

/// Decode the first header of a stream.
pub async fn read_header<R: AsyncBufRead + Unpin>(stream: R) -> Result<Header> {
    FitsReader::new(stream).read_header().await
}

/// Element kind declared by the first header of a stream.
pub async fn get_content_kind<R: AsyncBufRead + Unpin>(stream: R) -> Result<ElementKind> {
    let header = read_header(stream).await?;
    HduKind::detect(&header, 0)?.element_kind(&header)
}

/// Read a whole document with default options.
pub async fn read_document<R: AsyncBufRead + Unpin>(stream: R) -> Result<Document> {
    FitsReader::new(stream).read_document().await
}

/// Write a whole document with default options.
pub async fn write_document<W: AsyncWrite + Unpin>(document: &Document, stream: W) -> Result<()> {
    FitsWriter::new(stream).write_document(document).await
}
