use thiserror::Error;

use crate::element::ElementKind;

/// All errors that can occur while decoding, encoding or validating FITS data.
#[derive(Debug, Error)]
pub enum Error {
    /// The stream holds nothing decodable where a header was expected.
    #[error("invalid stream: {0}")]
    InvalidStream(&'static str),

    /// The stream ended before the END card of a header.
    #[error("header is missing the END card")]
    MissingEndMarker,

    /// An entry announced a CONTINUE card with a trailing `&` but none followed.
    #[error("entry {key} expects a CONTINUE card that never follows")]
    UnterminatedContinuation { key: String },

    /// A header value could not be parsed as the number it claims to be.
    #[error("malformed numeric literal: {0}")]
    MalformedNumericLiteral(String),

    /// BITPIX value outside 8, 16, 32, 64, -32, -64.
    #[error("unsupported BITPIX value: {0}")]
    UnsupportedDataType(i64),

    /// Typed access with an element kind other than the declared one.
    #[error("element type mismatch: requested {requested:?}, declared {declared:?}")]
    TypeMismatch {
        requested: ElementKind,
        declared: ElementKind,
    },

    /// A coordinate lies outside its axis.
    #[error("index {index} out of range for axis {axis} of size {size}")]
    IndexOutOfRange {
        axis: usize,
        index: usize,
        size: usize,
    },

    /// The number of coordinates does not match the number of axes.
    #[error("expected {expected} coordinates, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A buffer length disagrees with the product of its axis sizes.
    #[error("axes describe {expected} elements but the buffer holds {actual}")]
    ElementCountMismatch { expected: usize, actual: usize },

    /// Content axes disagree with the axes declared by the header.
    #[error("header declares axes {expected:?} but content has {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Declared axes describe more bytes than can be addressed.
    #[error("content size of axes {axes:?} overflows")]
    ContentTooLarge { axes: Vec<usize> },

    /// The stream ended inside a content region.
    #[error("content truncated: expected {expected} bytes, got {actual}")]
    TruncatedContent { expected: usize, actual: usize },

    /// One or more validators rejected a header or document.
    #[error("validation failed: {}", .messages.join("; "))]
    ValidationFailure { messages: Vec<String> },

    /// A keyword cannot be written as a card (too long or not printable ASCII).
    #[error("invalid keyword: {0:?}")]
    InvalidKeyword(String),

    /// A value or comment cannot be written as card text.
    #[error("text is not printable ASCII: {0:?}")]
    NonAsciiText(String),

    /// A comment or commentary text does not fit on its card.
    #[error("comment on {key} is {len} bytes but only {max} fit on the card")]
    CommentTooLong { key: String, len: usize, max: usize },

    /// Commentary text starting with `= ` would read back as a value.
    #[error("commentary text of {0} starts with the value indicator")]
    AmbiguousCommentary(String),

    /// A required keyword was not found in the header.
    #[error("missing required keyword: {0}")]
    MissingKeyword(&'static str),

    /// XTENSION names an extension type the assembly does not know.
    #[error("unsupported XTENSION type: {0}")]
    UnsupportedExtension(String),

    /// Writing a heap (PCOUNT > 0) is not supported.
    #[error("cannot write an extension heap of {0} bytes")]
    UnsupportedHeap(i64),

    /// The operation observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// An I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_end_marker() {
        assert_eq!(
            Error::MissingEndMarker.to_string(),
            "header is missing the END card"
        );
    }

    #[test]
    fn display_unsupported_data_type() {
        let e = Error::UnsupportedDataType(-99);
        assert_eq!(e.to_string(), "unsupported BITPIX value: -99");
    }

    #[test]
    fn display_validation_failure_joins_messages() {
        let e = Error::ValidationFailure {
            messages: vec![String::from("first"), String::from("second")],
        };
        assert_eq!(e.to_string(), "validation failed: first; second");
    }

    #[test]
    fn display_type_mismatch() {
        let e = Error::TypeMismatch {
            requested: ElementKind::F32,
            declared: ElementKind::I16,
        };
        assert_eq!(
            e.to_string(),
            "element type mismatch: requested F32, declared I16"
        );
    }

    #[test]
    fn io_error_from_conversion() {
        let e: Error = std::io::Error::other("oops").into();
        assert!(matches!(e, Error::Io(_)));
    }

    #[test]
    fn std_error_source() {
        use std::error::Error as StdError;

        assert!(Error::MissingEndMarker.source().is_none());
        let e = Error::Io(std::io::Error::other("inner"));
        assert!(e.source().is_some());
    }
}
