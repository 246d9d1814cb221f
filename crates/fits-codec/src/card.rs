//! 80-byte card images: parsing one card and rendering entries as cards.

use core::str;

use crate::block::CARD_SIZE;
use crate::error::{Error, Result};
use crate::header::HeaderEntry;
use crate::value::{
    escape_string, format_fixed, is_card_text, parse_scalar, split_value_comment, Scalar,
};

/// The END card: `END` followed by 77 spaces.
pub const END_CARD: [u8; CARD_SIZE] = end_card();

/// Keyword of long-string continuation cards.
pub const CONTINUE_KEY: &str = "CONTINUE";

/// Maximum keyword length in bytes.
pub const KEY_LEN: usize = 8;

/// First byte of the value region (after `KEYWORD= `).
pub const VALUE_REGION_START: usize = 10;

/// Longest escaped string chunk per card; leaves room for both quotes and
/// the `&` continuation marker within the 70-byte value region.
pub const MAX_CHUNK_LEN: usize = 67;

/// Longest commentary text after an 8-byte keyword.
pub const COMMENTARY_LEN: usize = CARD_SIZE - KEY_LEN;

/// Room for one comment fragment on a `CONTINUE  '&' / ` card.
const COMMENT_FRAGMENT_LEN: usize = CARD_SIZE - 16;

const fn end_card() -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[0] = b'E';
    buf[1] = b'N';
    buf[2] = b'D';
    buf
}

// ── Parsing ──

/// Borrowed, ASCII-checked view of one card.
#[derive(Debug, Clone, Copy)]
pub struct CardImage<'a> {
    text: &'a str,
}

impl<'a> CardImage<'a> {
    /// Wrap a raw card. Non-ASCII bytes make the stream invalid.
    pub fn new(bytes: &'a [u8; CARD_SIZE]) -> Result<Self> {
        if !bytes.is_ascii() {
            return Err(Error::InvalidStream("header card contains non-ASCII bytes"));
        }
        let text = str::from_utf8(bytes)
            .map_err(|_| Error::InvalidStream("header card contains non-ASCII bytes"))?;
        Ok(CardImage { text })
    }

    /// Bytes 0..8, trimmed.
    pub fn key(&self) -> &'a str {
        self.text[..KEY_LEN].trim()
    }

    /// Returns `true` for the exact END card.
    pub fn is_end(&self) -> bool {
        self.text.as_bytes() == END_CARD
    }

    /// Returns `true` if bytes 8..10 are the `= ` value indicator.
    pub fn has_value_indicator(&self) -> bool {
        &self.text.as_bytes()[KEY_LEN..VALUE_REGION_START] == b"= "
    }

    /// Bytes 10..80.
    pub fn value_region(&self) -> &'a str {
        &self.text[VALUE_REGION_START..]
    }

    /// Bytes 8..80 with trailing spaces removed, `None` when blank.
    pub fn commentary_text(&self) -> Option<&'a str> {
        let text = self.text[KEY_LEN..].trim_end();
        (!text.is_empty()).then_some(text)
    }

    /// Decode the card as a standalone entry.
    pub fn to_entry(&self) -> Result<HeaderEntry> {
        let key = String::from(self.key());
        if !self.has_value_indicator() {
            return Ok(HeaderEntry {
                key,
                value: None,
                comment: self.commentary_text().map(String::from),
            });
        }
        let (value_text, comment) = split_value_comment(self.value_region());
        Ok(HeaderEntry {
            key,
            value: parse_scalar(value_text)?,
            comment: comment.map(String::from),
        })
    }
}

// ── Writing ──

/// Copy `line` into a space-padded card, truncating at 80 bytes.
fn card_from(line: &str) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    let bytes = line.as_bytes();
    let len = bytes.len().min(CARD_SIZE);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

fn with_comment(mut line: String, comment: Option<&str>) -> String {
    if let Some(c) = comment {
        line.push_str(" / ");
        line.push_str(c);
    }
    line
}

/// Render one entry as one or more cards appended to `out`.
///
/// String values longer than one card are spread over `CONTINUE` cards, and
/// so are comments on string values that do not fit after the last chunk.
/// Other values are right-justified in the fixed 20-column field, or written
/// right after `= ` when that leaves room for the comment. Comments that fit
/// neither way, and commentary text past column 80, are rejected with
/// [`Error::CommentTooLong`].
pub fn encode_entry(entry: &HeaderEntry, out: &mut Vec<[u8; CARD_SIZE]>) -> Result<()> {
    let key = entry.key.as_str();
    if key.len() > KEY_LEN || !is_card_text(key) {
        return Err(Error::InvalidKeyword(entry.key.clone()));
    }
    let comment = entry.comment.as_deref();
    if let Some(c) = comment {
        if !is_card_text(c) {
            return Err(Error::NonAsciiText(String::from(c)));
        }
    }

    match &entry.value {
        None => {
            let text = comment.unwrap_or("");
            if text.len() > COMMENTARY_LEN {
                return Err(Error::CommentTooLong {
                    key: entry.key.clone(),
                    len: text.len(),
                    max: COMMENTARY_LEN,
                });
            }
            // would decode as a valued entry
            if text.starts_with("= ") {
                return Err(Error::AmbiguousCommentary(entry.key.clone()));
            }
            out.push(card_from(&format!("{key:<8}{text}")));
        }
        Some(Scalar::String(s)) => {
            if !is_card_text(s) {
                return Err(Error::NonAsciiText(s.clone()));
            }
            encode_string(key, s, comment, out);
        }
        Some(value) => {
            let fixed = format_fixed(value)?;
            let mut line = format!("{key:<8}= {fixed}");
            if let Some(c) = comment {
                if line.len() + 3 + c.len() > CARD_SIZE {
                    // free format: value right after the indicator
                    line = format!("{key:<8}= {}", fixed.trim_start());
                }
                let max = CARD_SIZE.saturating_sub(line.len() + 3);
                if c.len() > max {
                    return Err(Error::CommentTooLong {
                        key: entry.key.clone(),
                        len: c.len(),
                        max,
                    });
                }
            }
            out.push(card_from(&with_comment(line, comment)));
        }
    }
    Ok(())
}

fn encode_string(key: &str, value: &str, comment: Option<&str>, out: &mut Vec<[u8; CARD_SIZE]>) {
    let chunks = split_string(value, MAX_CHUNK_LEN);
    let last = chunks.len() - 1;

    for (i, chunk) in chunks.iter().enumerate() {
        let prefix = if i == 0 {
            format!("{key:<8}= ")
        } else {
            format!("{CONTINUE_KEY:<10}")
        };
        if i < last {
            out.push(card_from(&format!("{prefix}'{chunk}&'")));
            continue;
        }

        let terminal = format!("{prefix}'{chunk}'");
        let comment_fits = comment.map_or(true, |c| terminal.len() + 3 + c.len() <= CARD_SIZE);
        // A chunk ending in `&` would read as a continuation marker, so it
        // always gets an explicit terminating card.
        if comment_fits && !chunk.ends_with('&') {
            out.push(card_from(&with_comment(terminal, comment)));
        } else {
            out.push(card_from(&format!("{prefix}'{chunk}&'")));
            push_comment_cards(comment, out);
        }
    }
}

/// Emit the trailing `CONTINUE` cards that carry a comment (or just close
/// the continuation when there is none).
fn push_comment_cards(comment: Option<&str>, out: &mut Vec<[u8; CARD_SIZE]>) {
    let Some(comment) = comment else {
        out.push(card_from(&format!("{CONTINUE_KEY:<10}''")));
        return;
    };
    let fragments = split_comment(comment, COMMENT_FRAGMENT_LEN);
    let last = fragments.len() - 1;
    for (i, fragment) in fragments.iter().enumerate() {
        let marker = if i < last { "'&'" } else { "''" };
        out.push(card_from(&format!("{CONTINUE_KEY:<10}{marker} / {fragment}")));
    }
}

/// Split `value` into escaped chunks of at most `max` bytes without ever
/// separating the two halves of a doubled quote. Always returns at least
/// one chunk.
fn split_string(value: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in value.chars() {
        let piece_len = if ch == '\'' { 2 } else { 1 };
        if current.len() + piece_len > max {
            chunks.push(core::mem::take(&mut current));
        }
        if ch == '\'' {
            current.push_str("''");
        } else {
            current.push(ch);
        }
    }
    chunks.push(current);
    debug_assert!(chunks.iter().all(|c| c.len() <= max));
    debug_assert_eq!(chunks.concat(), escape_string(value));
    chunks
}

/// Split a comment into fragments of at most `max` bytes, cutting at a
/// space and dropping it, so that joining with single spaces restores the
/// comment. Words longer than `max` are cut hard.
fn split_comment(comment: &str, max: usize) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut rest = comment;
    while rest.len() > max {
        match rest[..=max].rfind(' ').filter(|&i| i > 0) {
            Some(i) => {
                fragments.push(&rest[..i]);
                rest = &rest[i + 1..];
            }
            None => {
                fragments.push(&rest[..max]);
                rest = &rest[max..];
            }
        }
    }
    fragments.push(rest);
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_card(s: &str) -> [u8; CARD_SIZE] {
        card_from(s)
    }

    fn card_str(card: &[u8; CARD_SIZE]) -> &str {
        str::from_utf8(card).unwrap()
    }

    fn encode(entry: &HeaderEntry) -> Vec<[u8; CARD_SIZE]> {
        let mut out = Vec::new();
        encode_entry(entry, &mut out).unwrap();
        out
    }

    // ---- parsing ----

    #[test]
    fn parse_string_value_with_comment() {
        let raw = make_card("TELESCOP= 'Hubble'           / telescope name");
        let entry = CardImage::new(&raw).unwrap().to_entry().unwrap();
        assert_eq!(entry.key, "TELESCOP");
        assert_eq!(entry.value, Some(Scalar::String(String::from("Hubble"))));
        assert_eq!(entry.comment.as_deref(), Some("telescope name"));
    }

    #[test]
    fn parse_integer_value() {
        let raw = make_card("BITPIX  =                  -32 / IEEE float");
        let entry = CardImage::new(&raw).unwrap().to_entry().unwrap();
        assert_eq!(entry.value, Some(Scalar::Integer(-32)));
    }

    #[test]
    fn parse_without_value_indicator_is_commentary() {
        let raw = make_card("HISTORY Created by fits-codec");
        let entry = CardImage::new(&raw).unwrap().to_entry().unwrap();
        assert_eq!(entry.key, "HISTORY");
        assert!(entry.value.is_none());
        assert_eq!(entry.comment.as_deref(), Some("Created by fits-codec"));
    }

    #[test]
    fn parse_blank_card() {
        let raw = [b' '; CARD_SIZE];
        let entry = CardImage::new(&raw).unwrap().to_entry().unwrap();
        assert_eq!(entry.key, "");
        assert!(entry.value.is_none());
        assert!(entry.comment.is_none());
    }

    #[test]
    fn parse_empty_value_keeps_comment() {
        let raw = make_card("BLANK   =                      / undefined value");
        let entry = CardImage::new(&raw).unwrap().to_entry().unwrap();
        assert!(entry.value.is_none());
        assert_eq!(entry.comment.as_deref(), Some("undefined value"));
    }

    #[test]
    fn parse_malformed_number_fails() {
        let raw = make_card("NAXIS   =                 2x");
        assert!(matches!(
            CardImage::new(&raw).unwrap().to_entry(),
            Err(Error::MalformedNumericLiteral(_))
        ));
    }

    #[test]
    fn end_card_detection_is_exact() {
        assert!(CardImage::new(&END_CARD).unwrap().is_end());
        let raw = make_card("END     = 1");
        assert!(!CardImage::new(&raw).unwrap().is_end());
    }

    #[test]
    fn non_ascii_card_rejected() {
        let mut raw = make_card("OBJECT  = 'x'");
        raw[12] = 0xE9;
        assert!(matches!(CardImage::new(&raw), Err(Error::InvalidStream(_))));
    }

    // ---- writing ----

    #[test]
    fn encode_string_with_comment() {
        let entry = HeaderEntry::valued("Entry1", "Value1").with_comment("Comment1");
        let cards = encode(&entry);
        assert_eq!(cards.len(), 1);
        assert_eq!(card_str(&cards[0]), format!("{:<80}", "Entry1  = 'Value1' / Comment1"));
    }

    #[test]
    fn encode_integer_right_justified() {
        let cards = encode(&HeaderEntry::valued("NAXIS", 2i64));
        assert_eq!(&cards[0][0..10], b"NAXIS   = ");
        assert_eq!(cards[0][29], b'2');
        assert_eq!(cards[0][28], b' ');
    }

    #[test]
    fn encode_commentary_entry() {
        let cards = encode(&HeaderEntry::commentary("COMMENT", "free text"));
        assert_eq!(card_str(&cards[0]).trim_end(), "COMMENT free text");
    }

    #[test]
    fn encode_long_string_uses_continue() {
        let value = "x".repeat(150);
        let cards = encode(&HeaderEntry::valued("LONGSTR", value.as_str()));
        assert_eq!(cards.len(), 3);
        assert!(card_str(&cards[0]).starts_with("LONGSTR = 'xxx"));
        assert!(card_str(&cards[0]).trim_end().ends_with("&'"));
        assert!(card_str(&cards[1]).starts_with("CONTINUE  '"));
        assert!(card_str(&cards[2]).trim_end().ends_with("x'"));
    }

    #[test]
    fn encode_string_ending_in_ampersand_is_terminated() {
        let cards = encode(&HeaderEntry::valued("AMP", "AT&"));
        assert_eq!(cards.len(), 2);
        assert!(card_str(&cards[0]).starts_with("AMP     = 'AT&&'"));
        assert_eq!(card_str(&cards[1]).trim_end(), "CONTINUE  ''");
    }

    #[test]
    fn encode_long_comment_on_short_string() {
        let comment = "word ".repeat(30);
        let comment = comment.trim_end();
        let entry = HeaderEntry::valued("OBJECT", "M31").with_comment(comment);
        let cards = encode(&entry);
        assert!(cards.len() >= 3);
        assert!(card_str(&cards[0]).starts_with("OBJECT  = 'M31&'"));
        assert!(card_str(&cards[1]).starts_with("CONTINUE  '&' / word"));
        assert!(card_str(cards.last().unwrap()).starts_with("CONTINUE  '' / word"));
    }

    #[test]
    fn encode_rejects_long_keyword() {
        let mut out = Vec::new();
        let entry = HeaderEntry::valued("TOOLONGKEY", 1i64);
        assert!(matches!(
            encode_entry(&entry, &mut out),
            Err(Error::InvalidKeyword(_))
        ));
    }

    #[test]
    fn encode_rejects_non_ascii_value() {
        let mut out = Vec::new();
        let entry = HeaderEntry::valued("OBJECT", "caf\u{e9}");
        assert!(matches!(
            encode_entry(&entry, &mut out),
            Err(Error::NonAsciiText(_))
        ));
    }

    #[test]
    fn encode_comment_filling_the_fixed_card() {
        let comment = "c".repeat(47);
        let entry = HeaderEntry::valued("EXPOSURE", 30i64).with_comment(comment.as_str());
        let cards = encode(&entry);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0][29], b'0');
        let back = CardImage::new(&cards[0]).unwrap().to_entry().unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn encode_long_comment_uses_free_format() {
        let comment = "an exposure comment that would not fit after the fixed field";
        let entry = HeaderEntry::valued("EXPOSURE", 30i64).with_comment(comment);
        let cards = encode(&entry);
        assert_eq!(cards.len(), 1);
        assert!(card_str(&cards[0]).starts_with("EXPOSURE= 30 / an exposure"));
        let back = CardImage::new(&cards[0]).unwrap().to_entry().unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn encode_rejects_comment_past_the_card() {
        let comment = "a comment on an integer value that runs past column eighty of the card";
        let entry = HeaderEntry::valued("EXPOSURE", 30i64).with_comment(comment);
        let mut out = Vec::new();
        assert!(matches!(
            encode_entry(&entry, &mut out),
            Err(Error::CommentTooLong { len: 70, max: 65, .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn encode_commentary_limits() {
        let text = "h".repeat(COMMENTARY_LEN);
        let entry = HeaderEntry::commentary("HISTORY", text.as_str());
        let back = CardImage::new(&encode(&entry)[0]).unwrap().to_entry().unwrap();
        assert_eq!(back, entry);

        let mut out = Vec::new();
        let entry = HeaderEntry::commentary("HISTORY", "h".repeat(COMMENTARY_LEN + 1));
        assert!(matches!(
            encode_entry(&entry, &mut out),
            Err(Error::CommentTooLong { len: 73, max: 72, .. })
        ));
    }

    #[test]
    fn encode_rejects_commentary_with_value_indicator() {
        let mut out = Vec::new();
        let entry = HeaderEntry::commentary("HISTORY", "= 5");
        assert!(matches!(
            encode_entry(&entry, &mut out),
            Err(Error::AmbiguousCommentary(_))
        ));
        let entry = HeaderEntry::commentary("HISTORY", " = 5");
        let back = CardImage::new(&encode(&entry)[0]).unwrap().to_entry().unwrap();
        assert_eq!(back, entry);
    }

    // ---- splitting ----

    #[test]
    fn split_string_keeps_doubled_quotes_together() {
        let value = format!("{}'tail", "a".repeat(66));
        let chunks = split_string(&value, MAX_CHUNK_LEN);
        assert_eq!(chunks[0], "a".repeat(66));
        assert_eq!(chunks[1], "''tail");
    }

    #[test]
    fn split_string_empty_gives_one_chunk() {
        assert_eq!(split_string("", MAX_CHUNK_LEN), vec![String::new()]);
    }

    #[test]
    fn split_comment_at_spaces() {
        let fragments = split_comment("alpha beta gamma", 11);
        assert_eq!(fragments, vec!["alpha beta", "gamma"]);
        assert_eq!(fragments.join(" "), "alpha beta gamma");
    }

    #[test]
    fn split_comment_hard_cut_without_spaces() {
        let fragments = split_comment("abcdefghij", 4);
        assert_eq!(fragments, vec!["abcd", "efgh", "ij"]);
    }
}
