//! Async codec for FITS headers and N-dimensional content.
//!
//! The crate decodes and encodes 2880-byte header blocks (including the
//! CONTINUE long-string convention), big-endian typed arrays, and whole
//! documents of Header Data Units, gating both directions with a validation
//! pipeline.

pub mod addressing;
#[cfg(feature = "array")]
pub mod array;
pub mod block;
pub mod card;
pub mod content;
pub mod document;
pub mod element;
pub mod error;
pub mod hdu;
pub mod header;
pub mod io;
pub mod options;
pub mod validate;
pub mod value;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use content::DataContent;
pub use document::{get_content_kind, read_document, read_header, write_document};
pub use document::{FitsReader, FitsWriter};
pub use element::{ContentBuffer, Element, ElementKind};
pub use error::{Error, Result};
pub use hdu::{Document, Hdu, HduKind};
pub use header::{Header, HeaderEntry, HeaderLayout};
pub use options::CodecOptions;
pub use value::Scalar;
