//! Header Data Units and the documents made of them.

use crate::content::DataContent;
use crate::element::ElementKind;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::value::Scalar;

/// The role an HDU plays in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HduKind {
    Primary,
    Image,
    Table,
}

impl HduKind {
    /// Classify a decoded header found at position `index` of a stream.
    ///
    /// A leading `SIMPLE` card marks a primary HDU and a leading `XTENSION`
    /// card names the extension type. Headers with neither fall back to their
    /// position and are left for validation to reject.
    pub fn detect(header: &Header, index: usize) -> Result<Self> {
        match header.entries().first() {
            Some(entry) if entry.key == "SIMPLE" => Ok(HduKind::Primary),
            Some(entry) if entry.key == "XTENSION" => match &entry.value {
                Some(Scalar::String(name)) => match name.trim() {
                    "IMAGE" => Ok(HduKind::Image),
                    "TABLE" | "BINTABLE" => Ok(HduKind::Table),
                    other => Err(Error::UnsupportedExtension(String::from(other))),
                },
                other => Err(Error::UnsupportedExtension(format!("{other:?}"))),
            },
            _ if index == 0 => Ok(HduKind::Primary),
            _ => Ok(HduKind::Image),
        }
    }

    /// Element kind of this HDU's content according to its header.
    ///
    /// Tables are carried as raw bytes, so they require `BITPIX = 8`.
    pub fn element_kind(self, header: &Header) -> Result<ElementKind> {
        let bitpix = header
            .layout()
            .bitpix()
            .ok_or(Error::MissingKeyword("BITPIX"))?;
        if self == HduKind::Table && bitpix != 8 {
            return Err(Error::UnsupportedDataType(bitpix));
        }
        ElementKind::from_bitpix(bitpix)
    }
}

/// One header plus its optional content.
#[derive(Debug, Clone, PartialEq)]
pub struct Hdu {
    pub kind: HduKind,
    pub header: Header,
    pub content: Option<DataContent>,
}

impl Hdu {
    pub fn new(kind: HduKind, header: Header, content: Option<DataContent>) -> Self {
        Hdu {
            kind,
            header,
            content,
        }
    }

    /// Primary HDU whose header is built from the content's kind and axes.
    pub fn primary(content: DataContent) -> Self {
        let header = Header::primary(content.kind(), content.axes());
        Hdu::new(HduKind::Primary, header, Some(content))
    }

    /// Primary HDU without content (`BITPIX = 8`, `NAXIS = 0`).
    pub fn empty_primary() -> Self {
        Hdu::new(HduKind::Primary, Header::primary(ElementKind::U8, &[]), None)
    }

    /// IMAGE extension whose header is built from the content's kind and axes.
    pub fn image(content: DataContent) -> Self {
        let header = Header::image_extension(content.kind(), content.axes());
        Hdu::new(HduKind::Image, header, Some(content))
    }
}

/// An ordered sequence of HDUs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub hdus: Vec<Hdu>,
}

impl Document {
    pub fn new(hdus: Vec<Hdu>) -> Self {
        Document { hdus }
    }

    /// The first HDU, if it is primary.
    pub fn primary(&self) -> Option<&Hdu> {
        self.hdus.first().filter(|h| h.kind == HduKind::Primary)
    }

    pub fn get(&self, index: usize) -> Option<&Hdu> {
        self.hdus.get(index)
    }

    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hdu> {
        self.hdus.iter()
    }
}

impl IntoIterator for Document {
    type Item = Hdu;
    type IntoIter = std::vec::IntoIter<Hdu>;

    fn into_iter(self) -> Self::IntoIter {
        self.hdus.into_iter()
    }
}

impl FromIterator<Hdu> for Document {
    fn from_iter<I: IntoIterator<Item = Hdu>>(iter: I) -> Self {
        Document::new(iter.into_iter().collect())
    }
}
