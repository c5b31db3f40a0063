use std::io::Write;
use std::path::PathBuf;
use chrono::Local;
use clap::Parser;
use log::LevelFilter;

use voicemap::Result;
use voicemap::output::renamer::{read_match_result, ClipRenamer};

#[derive(Debug, Parser)]
#[command(
    name = "rename_voices",
    about = "Copies legacy voice clips under the remake file names listed in a match result"
)]
struct Args {
    /// Match result written by match_voices.
    #[arg(short, long, default_value = "match_result.csv")]
    file: PathBuf,

    /// Only copy clips for these remake character ids. Each id gets its own
    /// output directory.
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    remake_character_ids: Vec<String>,

    /// Directory holding the legacy `ch*.wav` clips.
    #[arg(long)]
    old_voice_wav: PathBuf,

    #[arg(long)]
    output: PathBuf,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .init();

    let rows = read_match_result(&args.file)?;
    let renamer = ClipRenamer::new(&args.old_voice_wav, &args.output, &args.remake_character_ids);
    if renamer.select(&rows).is_empty() {
        println!("No matching voice files to process.");
        return Ok(());
    }

    let summary = renamer.copy_rows(&rows)?;
    println!(
        "\nCopied {} clips to {} ({} sources missing, {} rows without a legacy clip)",
        summary.copied.len(),
        args.output.display(),
        summary.missing.len(),
        summary.unmapped
    );
    Ok(())
}
