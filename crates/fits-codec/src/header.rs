//! FITS headers: entries, the parsed layout view, and block-level decoding
//! and encoding including the CONTINUE long-string convention.

use tokio::io::AsyncBufRead;
use tracing::debug;

use crate::block::{pad_to_block, padded_byte_len, BLOCK_SIZE, CARD_SIZE, HEADER_PAD_BYTE};
use crate::card::{encode_entry, CardImage, CONTINUE_KEY, END_CARD};
use crate::element::ElementKind;
use crate::error::{Error, Result};
use crate::io::BlockReader;
use crate::value::{parse_scalar, split_value_comment, Scalar};

// ── Types ──

/// One keyword record of a header.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderEntry {
    /// Keyword, at most 8 significant characters. Empty for blank cards.
    pub key: String,
    /// Parsed value; `None` for commentary cards and empty values.
    pub value: Option<Scalar>,
    pub comment: Option<String>,
}

impl HeaderEntry {
    pub fn new(key: impl Into<String>, value: Option<Scalar>, comment: Option<String>) -> Self {
        HeaderEntry {
            key: key.into(),
            value,
            comment,
        }
    }

    /// Entry carrying a value and no comment.
    pub fn valued(key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        HeaderEntry::new(key, Some(value.into()), None)
    }

    /// Valueless entry whose text is stored as its comment (COMMENT, HISTORY, blank).
    pub fn commentary(key: impl Into<String>, text: impl Into<String>) -> Self {
        HeaderEntry::new(key, None, Some(text.into()))
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Structural keywords of a header, extracted once when the header is built.
///
/// Values are taken from the first entry with the given key; a missing or
/// non-integer entry leaves the field unset. Validation decides whether an
/// unset field is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLayout {
    bitpix: Option<i64>,
    naxis: Option<i64>,
    axes: Option<Vec<usize>>,
    pcount: Option<i64>,
    gcount: Option<i64>,
}

impl HeaderLayout {
    fn from_entries(entries: &[HeaderEntry]) -> Self {
        let naxis = first_integer(entries, "NAXIS");
        let axes = naxis
            .and_then(|k| usize::try_from(k).ok())
            .and_then(|k| {
                (1..=k)
                    .map(|i| {
                        first_integer(entries, &format!("NAXIS{i}"))
                            .and_then(|n| usize::try_from(n).ok())
                    })
                    .collect::<Option<Vec<usize>>>()
            });
        HeaderLayout {
            bitpix: first_integer(entries, "BITPIX"),
            naxis,
            axes,
            pcount: first_integer(entries, "PCOUNT"),
            gcount: first_integer(entries, "GCOUNT"),
        }
    }

    pub fn bitpix(&self) -> Option<i64> {
        self.bitpix
    }

    pub fn naxis(&self) -> Option<i64> {
        self.naxis
    }

    /// Axis sizes `NAXIS1..NAXISn`, or `None` if NAXIS or one of them is
    /// missing, negative, or not an integer.
    pub fn axes(&self) -> Option<&[usize]> {
        self.axes.as_deref()
    }

    /// Number of content elements; zero when there are no axes.
    ///
    /// Returns `None` when the axes are undeclared or their product overflows.
    pub fn element_count(&self) -> Option<usize> {
        let axes = self.axes()?;
        if axes.is_empty() {
            return Some(0);
        }
        axes.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// PCOUNT, defaulting to 0.
    pub fn pcount(&self) -> i64 {
        self.pcount.unwrap_or(0)
    }

    /// GCOUNT, defaulting to 1.
    pub fn gcount(&self) -> i64 {
        self.gcount.unwrap_or(1)
    }
}

fn first_integer(entries: &[HeaderEntry], key: &str) -> Option<i64> {
    entries
        .iter()
        .find(|e| e.key == key)
        .and_then(|e| e.value.as_ref())
        .and_then(Scalar::as_integer)
}

/// An ordered, immutable sequence of header entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    entries: Vec<HeaderEntry>,
    layout: HeaderLayout,
}

impl Header {
    pub fn new(entries: Vec<HeaderEntry>) -> Self {
        let layout = HeaderLayout::from_entries(&entries);
        Header { entries, layout }
    }

    /// Minimal primary header: SIMPLE, BITPIX, NAXIS, NAXISn.
    pub fn primary(kind: ElementKind, axes: &[usize]) -> Self {
        let mut entries = vec![
            HeaderEntry::valued("SIMPLE", true).with_comment("conforms to FITS standard"),
            HeaderEntry::valued("BITPIX", kind.bitpix()).with_comment("bits per data value"),
            HeaderEntry::valued("NAXIS", axes.len() as i64).with_comment("number of axes"),
        ];
        entries.extend(axis_entries(axes));
        Header::new(entries)
    }

    /// Minimal IMAGE extension header: XTENSION, BITPIX, NAXIS, NAXISn, PCOUNT, GCOUNT.
    pub fn image_extension(kind: ElementKind, axes: &[usize]) -> Self {
        let mut entries = vec![
            HeaderEntry::valued("XTENSION", "IMAGE").with_comment("image extension"),
            HeaderEntry::valued("BITPIX", kind.bitpix()),
            HeaderEntry::valued("NAXIS", axes.len() as i64),
        ];
        entries.extend(axis_entries(axes));
        entries.push(HeaderEntry::valued("PCOUNT", 0i64));
        entries.push(HeaderEntry::valued("GCOUNT", 1i64));
        Header::new(entries)
    }

    pub fn entries(&self) -> &[HeaderEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<HeaderEntry> {
        self.entries
    }

    /// First entry with the given key.
    pub fn get(&self, key: &str) -> Option<&HeaderEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn value(&self, key: &str) -> Option<&Scalar> {
        self.get(key).and_then(|e| e.value.as_ref())
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(Scalar::as_integer)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Scalar::as_str)
    }

    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.iter()
    }
}

impl Default for Header {
    fn default() -> Self {
        Header::new(Vec::new())
    }
}

impl FromIterator<HeaderEntry> for Header {
    fn from_iter<I: IntoIterator<Item = HeaderEntry>>(iter: I) -> Self {
        Header::new(iter.into_iter().collect())
    }
}

fn axis_entries(axes: &[usize]) -> impl Iterator<Item = HeaderEntry> + '_ {
    axes.iter()
        .enumerate()
        .map(|(i, &n)| HeaderEntry::valued(format!("NAXIS{}", i + 1), n as i64))
}

// ── Decoding ──

/// Whether the previous string value announced a CONTINUE card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationState {
    Normal,
    Continuing,
}

/// Card-by-card header decoder.
///
/// In [`ContinuationState::Normal`] every card becomes an entry; a string
/// value ending in `&` loses the marker and switches to
/// [`ContinuationState::Continuing`]. There the next card must be a
/// `CONTINUE` card whose string is appended to the previous entry, and whose
/// comment is appended with a single space.
#[derive(Debug)]
pub struct HeaderDecoder {
    entries: Vec<HeaderEntry>,
    state: ContinuationState,
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderDecoder {
    pub fn new() -> Self {
        HeaderDecoder {
            entries: Vec::new(),
            state: ContinuationState::Normal,
        }
    }

    pub fn state(&self) -> ContinuationState {
        self.state
    }

    /// Feed one card. Returns `true` once the END card is reached.
    pub fn push_card(&mut self, bytes: &[u8; CARD_SIZE]) -> Result<bool> {
        let card = CardImage::new(bytes)?;
        match self.state {
            ContinuationState::Normal => {
                if card.is_end() {
                    return Ok(true);
                }
                let mut entry = card.to_entry()?;
                if let Some(Scalar::String(s)) = &mut entry.value {
                    if s.ends_with('&') {
                        s.pop();
                        self.state = ContinuationState::Continuing;
                    }
                }
                self.entries.push(entry);
            }
            ContinuationState::Continuing => self.continue_entry(&card)?,
        }
        Ok(false)
    }

    fn continue_entry(&mut self, card: &CardImage<'_>) -> Result<()> {
        let previous = self
            .entries
            .last_mut()
            .ok_or(Error::InvalidStream("continuation without a preceding entry"))?;
        if card.key() != CONTINUE_KEY {
            return Err(Error::UnterminatedContinuation {
                key: previous.key.clone(),
            });
        }

        let (text, comment) = split_value_comment(card.value_region());
        match parse_scalar(text)? {
            Some(Scalar::String(mut more)) => {
                let continues = more.ends_with('&');
                if continues {
                    more.pop();
                }
                if let Some(Scalar::String(value)) = &mut previous.value {
                    value.push_str(&more);
                }
                self.state = if continues {
                    ContinuationState::Continuing
                } else {
                    ContinuationState::Normal
                };
            }
            None => self.state = ContinuationState::Normal,
            Some(_) => {
                return Err(Error::UnterminatedContinuation {
                    key: previous.key.clone(),
                })
            }
        }

        if let Some(c) = comment {
            match &mut previous.comment {
                Some(existing) => {
                    existing.push(' ');
                    existing.push_str(c);
                }
                None => previous.comment = Some(String::from(c)),
            }
        }
        Ok(())
    }

    /// Feed every complete card of `data`. Returns `true` at the END card;
    /// cards after it are ignored.
    pub fn push_cards(&mut self, data: &[u8]) -> Result<bool> {
        for chunk in data.chunks_exact(CARD_SIZE) {
            let card: &[u8; CARD_SIZE] = chunk
                .try_into()
                .map_err(|_| Error::InvalidStream("partial header card"))?;
            if self.push_card(card)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn finish(self) -> Header {
        Header::new(self.entries)
    }
}

/// Decode one header from the reader, block by block.
///
/// Returns the header and whether the stream is exhausted right after the
/// block holding the END card. An END card inside a trailing partial block
/// is accepted.
pub async fn decode_header<R>(reader: &mut BlockReader<R>, max_blocks: usize) -> Result<(Header, bool)>
where
    R: AsyncBufRead + Unpin,
{
    let mut decoder = HeaderDecoder::new();
    let mut block = [0u8; BLOCK_SIZE];

    for index in 0..max_blocks {
        let n = reader.read_block(&mut block).await?;
        if n == 0 && index == 0 {
            return Err(Error::InvalidStream("no header data in stream"));
        }
        if decoder.push_cards(&block[..n])? {
            let end_of_stream = reader.is_exhausted().await?;
            let header = decoder.finish();
            debug!(
                entries = header.len(),
                blocks = index + 1,
                end_of_stream,
                "decoded header"
            );
            return Ok((header, end_of_stream));
        }
        if n < BLOCK_SIZE {
            return Err(Error::MissingEndMarker);
        }
    }
    Err(Error::MissingEndMarker)
}

/// Decode a header from an in-memory byte slice.
pub fn parse_header_bytes(data: &[u8]) -> Result<Header> {
    if data.is_empty() {
        return Err(Error::InvalidStream("no header data in stream"));
    }
    let mut decoder = HeaderDecoder::new();
    if decoder.push_cards(data)? {
        Ok(decoder.finish())
    } else {
        Err(Error::MissingEndMarker)
    }
}

// ── Encoding ──

/// Serialize a header into complete blocks.
///
/// Appends the END card and pads the final block with spaces. The returned
/// length is always a positive multiple of [`BLOCK_SIZE`].
pub fn encode_header(header: &Header) -> Result<Vec<u8>> {
    let mut cards = Vec::with_capacity(header.len() + 1);
    for entry in header.iter() {
        encode_entry(entry, &mut cards)?;
    }
    cards.push(END_CARD);

    let mut buf = Vec::with_capacity(padded_byte_len(cards.len() * CARD_SIZE));
    for card in &cards {
        buf.extend_from_slice(card);
    }
    pad_to_block(&mut buf, HEADER_PAD_BYTE);
    Ok(buf)
}
