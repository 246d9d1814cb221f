//! Shared plumbing for the `fitsinfo` and `fitscopy` binaries.
//!
//! Everything here owns paths and console text; decoding and encoding go
//! through the boundary functions of `fits-codec`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use fits_codec::card::COMMENTARY_LEN;
use fits_codec::{Document, Hdu, HduKind, Header, HeaderEntry, Scalar};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr subscriber honouring `RUST_LOG`, falling back to
/// `info` (or `debug` when verbose) for the codec and the tools.
pub fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "fits_codec=debug,fits_tools=debug"
    } else {
        "fits_codec=info,fits_tools=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Keywords that describe the HDU structure and are rebuilt on extraction.
const STRUCTURAL_KEYS: [&str; 6] = ["SIMPLE", "XTENSION", "BITPIX", "NAXIS", "PCOUNT", "GCOUNT"];

fn is_structural(key: &str) -> bool {
    STRUCTURAL_KEYS.contains(&key)
        || key
            .strip_prefix("NAXIS")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn kind_label(kind: HduKind) -> &'static str {
    match kind {
        HduKind::Primary => "Primary",
        HduKind::Image => "IMAGE extension",
        HduKind::Table => "TABLE extension",
    }
}

/// One block of summary text per HDU.
pub fn format_hdu(index: usize, hdu: &Hdu) -> String {
    let layout = hdu.header.layout();
    let mut out = format!("HDU {}: {}", index, kind_label(hdu.kind));
    if let Some(name) = hdu.header.string("EXTNAME") {
        out.push_str(&format!(" (EXTNAME: {})", name.trim()));
    }
    out.push('\n');
    if let Some(bitpix) = layout.bitpix() {
        out.push_str(&format!("  BITPIX: {bitpix}\n"));
    }
    if let Some(naxis) = layout.naxis() {
        out.push_str(&format!("  NAXIS: {naxis}\n"));
    }
    if let Some(axes) = layout.axes().filter(|a| !a.is_empty()) {
        out.push_str(&format!("  Dimensions: {axes:?}\n"));
    }
    out.push_str(&format!("  Header entries: {}\n", hdu.header.len()));
    let elements = hdu.content.as_ref().map_or(0, |c| c.len());
    out.push_str(&format!("  Elements: {elements}\n"));
    out
}

/// One header entry as `KEY = value / comment`.
pub fn format_entry(entry: &HeaderEntry) -> String {
    let mut out = format!("{:<8}", entry.key);
    match &entry.value {
        Some(Scalar::Bool(b)) => out.push_str(&format!(" = {}", if *b { "T" } else { "F" })),
        Some(Scalar::Integer(n)) => out.push_str(&format!(" = {n}")),
        Some(Scalar::Float(f)) => out.push_str(&format!(" = {f}")),
        Some(Scalar::String(s)) => out.push_str(&format!(" = '{s}'")),
        None => {}
    }
    match (&entry.value, &entry.comment) {
        (Some(_), Some(c)) => out.push_str(&format!(" / {c}")),
        (None, Some(c)) => out.push_str(&format!(" {c}")),
        _ => {}
    }
    out.trim_end().to_string()
}

/// Summary of every HDU, separated by blank lines.
pub fn describe(document: &Document) -> String {
    document
        .iter()
        .enumerate()
        .map(|(i, hdu)| format_hdu(i, hdu))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A document holding only the HDU at `index`.
///
/// An IMAGE extension becomes the primary HDU of the new document; its
/// non-structural entries are carried over after the rebuilt mandatory ones.
pub fn extract(document: &Document, index: usize) -> Result<Document> {
    let Some(hdu) = document.get(index) else {
        bail!(
            "HDU index {} out of range (file has {} HDUs)",
            index,
            document.len()
        );
    };
    let primary = match hdu.kind {
        HduKind::Primary => hdu.clone(),
        HduKind::Image => {
            let kind = hdu.kind.element_kind(&hdu.header)?;
            let axes = hdu.header.layout().axes().unwrap_or_default();
            let mut entries = Header::primary(kind, axes).into_entries();
            entries.extend(
                hdu.header
                    .iter()
                    .filter(|e| !is_structural(&e.key))
                    .cloned(),
            );
            Hdu::new(HduKind::Primary, Header::new(entries), hdu.content.clone())
        }
        HduKind::Table => bail!("HDU {index} is a table and cannot become a primary HDU"),
    };
    Ok(Document::new(vec![primary]))
}

/// Append HISTORY entries to the primary header, one per card-sized piece
/// of `text`.
pub fn add_history(document: &mut Document, text: &str) {
    if let Some(primary) = document.hdus.first_mut() {
        let mut entries = std::mem::take(&mut primary.header).into_entries();
        let chars: Vec<char> = text.chars().collect();
        entries.extend(
            chars
                .chunks(COMMENTARY_LEN)
                .map(|piece| HeaderEntry::commentary("HISTORY", piece.iter().collect::<String>())),
        );
        primary.header = Header::new(entries);
    }
}

pub async fn read_file(path: &Path) -> Result<Document> {
    let file = File::open(path)
        .await
        .with_context(|| format!("Error opening '{}'", path.display()))?;
    let document = fits_codec::read_document(BufReader::new(file))
        .await
        .with_context(|| format!("Error reading '{}'", path.display()))?;
    info!(path = %path.display(), hdus = document.len(), "read document");
    Ok(document)
}

pub async fn write_file(path: &Path, document: &Document) -> Result<()> {
    let file = File::create(path)
        .await
        .with_context(|| format!("Error creating '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    fits_codec::write_document(document, &mut writer)
        .await
        .with_context(|| format!("Error writing '{}'", path.display()))?;
    writer.shutdown().await?;
    info!(path = %path.display(), hdus = document.len(), "wrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fits_codec::{DataContent, ElementKind};

    fn sample() -> Document {
        let mut image_entries = Header::image_extension(ElementKind::I16, &[3, 2]).into_entries();
        image_entries.push(HeaderEntry::valued("EXTNAME", "SCI"));
        let content = DataContent::from_vec(vec![3, 2], vec![1i16, 2, 3, 4, 5, 6]).unwrap();
        Document::new(vec![
            Hdu::empty_primary(),
            Hdu::new(HduKind::Image, Header::new(image_entries), Some(content)),
        ])
    }

    #[test]
    fn structural_keys() {
        assert!(is_structural("NAXIS"));
        assert!(is_structural("NAXIS12"));
        assert!(is_structural("GCOUNT"));
        assert!(!is_structural("NAXISX"));
        assert!(!is_structural("EXTNAME"));
    }

    #[test]
    fn describe_lists_each_hdu() {
        let text = describe(&sample());
        assert!(text.contains("HDU 0: Primary\n"));
        assert!(text.contains("HDU 1: IMAGE extension (EXTNAME: SCI)\n"));
        assert!(text.contains("  Dimensions: [3, 2]\n"));
        assert!(text.contains("  Elements: 6\n"));
    }

    #[test]
    fn extract_image_as_primary() {
        let doc = extract(&sample(), 1).unwrap();
        let hdu = doc.primary().unwrap();
        assert_eq!(hdu.header.entries()[0].key, "SIMPLE");
        assert_eq!(hdu.header.string("EXTNAME"), Some("SCI"));
        assert!(hdu.header.get("XTENSION").is_none());
        assert_eq!(hdu.content.as_ref().unwrap().len(), 6);
    }

    #[test]
    fn extract_out_of_range() {
        let err = extract(&sample(), 5).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn entry_formatting() {
        let entry = HeaderEntry::valued("EXPTIME", 30.5).with_comment("seconds");
        assert_eq!(format_entry(&entry), "EXPTIME  = 30.5 / seconds");
        let entry = HeaderEntry::commentary("HISTORY", "made");
        assert_eq!(format_entry(&entry), "HISTORY  made");
    }

    #[test]
    fn history_goes_to_primary() {
        let mut doc = sample();
        add_history(&mut doc, "copied");
        let last = doc.hdus[0].header.entries().last().unwrap();
        assert_eq!(last.key, "HISTORY");
        assert_eq!(last.comment.as_deref(), Some("copied"));
    }

    #[test]
    fn long_history_is_split_into_cards() {
        let mut doc = sample();
        let before = doc.hdus[0].header.len();
        let text = "x".repeat(100);
        add_history(&mut doc, &text);
        let entries = doc.hdus[0].header.entries();
        assert_eq!(entries.len(), before + 2);
        assert_eq!(entries[before].comment.as_deref().map(str::len), Some(72));
        assert_eq!(entries[before + 1].comment.as_deref().map(str::len), Some(28));
    }
}
