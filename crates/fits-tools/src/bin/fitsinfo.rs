use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Print a summary of every HDU in a FITS file.
#[derive(Parser, Debug)]
#[command(name = "fitsinfo", version)]
struct Args {
    /// FITS file to inspect
    input: PathBuf,

    /// Also print every header entry
    #[arg(short, long)]
    entries: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    fits_tools::init_logging(args.verbose);

    let document = fits_tools::read_file(&args.input).await?;
    print!("{}", fits_tools::describe(&document));
    if args.entries {
        for (i, hdu) in document.iter().enumerate() {
            println!("\nHDU {i} entries:");
            for entry in hdu.header.iter() {
                println!("  {}", fits_tools::format_entry(entry));
            }
        }
    }
    Ok(())
}
