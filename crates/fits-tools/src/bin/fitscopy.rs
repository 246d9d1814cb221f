use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Copy a FITS file through the codec, optionally extracting one HDU.
#[derive(Parser, Debug)]
#[command(name = "fitscopy", version)]
struct Args {
    /// Source FITS file
    input: PathBuf,

    /// Destination FITS file
    output: PathBuf,

    /// Extract only this HDU; an IMAGE extension becomes the primary HDU
    #[arg(long)]
    hdu: Option<usize>,

    /// Append a HISTORY entry to the primary header
    #[arg(long)]
    history: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    fits_tools::init_logging(args.verbose);

    let document = fits_tools::read_file(&args.input).await?;
    let mut document = match args.hdu {
        Some(index) => fits_tools::extract(&document, index)?,
        None => document,
    };
    if let Some(text) = &args.history {
        fits_tools::add_history(&mut document, text);
    }
    fits_tools::write_file(&args.output, &document).await?;
    println!(
        "Copied {} HDU(s) from '{}' to '{}'",
        document.len(),
        args.input.display(),
        args.output.display()
    );
    Ok(())
}
