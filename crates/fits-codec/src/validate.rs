//! Header and document validators, grouped into per-context sets.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{Error, Result};
use crate::hdu::{Document, HduKind};
use crate::header::Header;
use crate::value::Scalar;

/// Outcome of a single validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub success: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        ValidationResult {
            success: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ValidationResult {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// A pure check over a header or a document.
pub trait Validator<T: ?Sized>: Send + Sync {
    fn validate(&self, subject: &T) -> ValidationResult;
}

// ── Header validators ──

/// Structural keywords that may occur at most once.
const UNIQUE_KEYS: [&str; 4] = ["SIMPLE", "XTENSION", "BITPIX", "NAXIS"];

/// None of SIMPLE, XTENSION, BITPIX, NAXIS occurs more than once.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordsMustBeUnique;

impl Validator<Header> for KeywordsMustBeUnique {
    fn validate(&self, header: &Header) -> ValidationResult {
        let repeated: Vec<&str> = UNIQUE_KEYS
            .iter()
            .copied()
            .filter(|key| header.iter().filter(|e| e.key == *key).count() > 1)
            .collect();
        if repeated.is_empty() {
            return ValidationResult::ok();
        }
        ValidationResult::fail(format!(
            "Non unique KEYWORDS found. The header entries {} are contained more than once within the header.",
            repeated.join(", ")
        ))
    }
}

const MISSING_REQUIRED: &str = "The FITS header does not contain required fields.";
const NAXIS_NOT_INTEGER: &str =
    "The FITS header contains the field 'NAXIS' but it is not of type integer.";

/// The header starts with the given keys in order, followed by
/// `NAXIS1..NAXISk` when the leading keys include `NAXIS = k`.
#[derive(Debug, Clone)]
pub struct MandatoryHeaderEntries {
    required: Vec<String>,
}

impl MandatoryHeaderEntries {
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MandatoryHeaderEntries {
            required: required.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator<Header> for MandatoryHeaderEntries {
    fn validate(&self, header: &Header) -> ValidationResult {
        let entries = header.entries();
        if entries.len() < self.required.len()
            || entries
                .iter()
                .zip(&self.required)
                .any(|(entry, key)| entry.key != *key)
        {
            return ValidationResult::fail(MISSING_REQUIRED);
        }

        let Some(naxis_at) = self.required.iter().position(|k| k == "NAXIS") else {
            return ValidationResult::ok();
        };
        let naxis = match &entries[naxis_at].value {
            Some(Scalar::Integer(n)) => *n,
            _ => return ValidationResult::fail(NAXIS_NOT_INTEGER),
        };
        let Ok(naxis) = usize::try_from(naxis) else {
            return ValidationResult::fail(MISSING_REQUIRED);
        };

        let axes = &entries[self.required.len()..];
        if axes.len() < naxis
            || axes
                .iter()
                .take(naxis)
                .enumerate()
                .any(|(i, entry)| entry.key != format!("NAXIS{}", i + 1))
        {
            return ValidationResult::fail(MISSING_REQUIRED);
        }
        ValidationResult::ok()
    }
}

/// Keys use only `A-Z`, `0-9`, `_` and `-`. The empty key is allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInvalidCharactersInKeywords;

fn is_keyword_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-'
}

impl Validator<Header> for NoInvalidCharactersInKeywords {
    fn validate(&self, header: &Header) -> ValidationResult {
        match header.iter().find(|e| !e.key.chars().all(is_keyword_char)) {
            Some(entry) => ValidationResult::fail(format!(
                "The header key \"{}\" contains not allowed characters!",
                entry.key
            )),
            None => ValidationResult::ok(),
        }
    }
}

// ── Document validators ──

/// The document is non-empty and starts with a primary HDU.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasPrimaryDataUnit;

impl Validator<Document> for HasPrimaryDataUnit {
    fn validate(&self, document: &Document) -> ValidationResult {
        match document.hdus.first() {
            Some(hdu) if hdu.kind == HduKind::Primary => ValidationResult::ok(),
            _ => ValidationResult::fail(
                "The FITS document does not contain a primary header data unit.",
            ),
        }
    }
}

// ── Sets ──

/// An ordered list of validators for one context.
pub struct ValidatorSet<T: ?Sized> {
    validators: Vec<Box<dyn Validator<T>>>,
}

impl<T: ?Sized> Default for ValidatorSet<T> {
    fn default() -> Self {
        ValidatorSet {
            validators: Vec::new(),
        }
    }
}

impl<T: ?Sized> ValidatorSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run every validator and return all outcomes in order.
    pub fn results(&self, subject: &T) -> Vec<ValidationResult> {
        self.validators.iter().map(|v| v.validate(subject)).collect()
    }

    /// Run every validator, then fail with all collected messages if any
    /// of them rejected the subject.
    pub fn check(&self, subject: &T, cancel: &CancellationToken) -> Result<()> {
        let mut messages = Vec::new();
        for validator in &self.validators {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let result = validator.validate(subject);
            if !result.success {
                messages.push(
                    result
                        .message
                        .unwrap_or_else(|| String::from("validation failed")),
                );
            }
        }
        if messages.is_empty() {
            return Ok(());
        }
        warn!(failures = messages.len(), first = %messages[0], "validation rejected subject");
        Err(Error::ValidationFailure { messages })
    }
}

impl ValidatorSet<Header> {
    fn header_with_leading(first: &str) -> Self {
        ValidatorSet::new()
            .with(KeywordsMustBeUnique)
            .with(MandatoryHeaderEntries::new([first, "BITPIX", "NAXIS"]))
            .with(NoInvalidCharactersInKeywords)
    }

    pub fn primary_header() -> Self {
        Self::header_with_leading("SIMPLE")
    }

    pub fn extension_header() -> Self {
        Self::header_with_leading("XTENSION")
    }

    /// The set matching an HDU kind.
    pub fn for_kind(kind: HduKind) -> Self {
        match kind {
            HduKind::Primary => Self::primary_header(),
            HduKind::Image | HduKind::Table => Self::extension_header(),
        }
    }
}

impl ValidatorSet<Document> {
    pub fn document() -> Self {
        ValidatorSet::new().with(HasPrimaryDataUnit)
    }
}
