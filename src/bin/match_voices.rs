use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use chrono::Local;
use clap::Parser;
use log::{info, LevelFilter};

use voicemap::{
    AlignmentPipeline,
    AlignmentReport,
    ArtifactWriter,
    Result,
    VoicemapConfig,
    corpus::{OriginalCorpus, RemakeCorpus, RemakeTable},
    embedding::build_provider,
};

#[derive(Debug, Parser)]
#[command(
    name = "match_voices",
    about = "Maps remake voice lines onto the voice clips of the original release"
)]
struct Args {
    /// INI configuration file. Defaults are used when it does not exist.
    #[arg(long, default_value = "voicemap.ini")]
    config: PathBuf,

    /// Restrict matching to these remake character ids (comma separated).
    #[arg(long, value_delimiter = ',')]
    character_ids: Vec<String>,

    #[arg(long)]
    match_active: bool,

    #[arg(long)]
    match_battle: bool,

    #[arg(long)]
    match_other: bool,

    #[arg(long)]
    match_sfx: bool,

    /// Skip the semantic pass.
    #[arg(long)]
    no_similarity_search: bool,

    #[arg(long)]
    similarity_threshold: Option<f32>,

    /// Leave unmatched entries pointing at their remake clip.
    #[arg(long)]
    no_map_failed_to_empty: bool,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command line flags win over the configuration file.
    fn apply(&self, config: &mut VoicemapConfig) -> Result<()> {
        if !self.character_ids.is_empty() {
            config.filter.character_ids = self
                .character_ids
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
        }
        config.filter.match_active |= self.match_active;
        config.filter.match_battle |= self.match_battle;
        config.filter.match_other |= self.match_other;
        config.filter.match_sfx |= self.match_sfx;

        if self.no_similarity_search {
            config.matcher.use_semantic = false;
        }
        if let Some(threshold) = self.similarity_threshold {
            config.matcher.similarity_threshold = threshold;
        }
        if self.no_map_failed_to_empty {
            config.output.map_failed_to_empty = false;
        }
        if let Some(dir) = &self.output_dir {
            config.files.output_dir = dir.clone();
        }
        if self.verbose {
            config.output.set_log_level(LevelFilter::Debug);
        }
        config.validate()
    }
}

fn init_logging(config: &VoicemapConfig) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = config.files.log_dir.join(format!("match_voices_{}.log", timestamp));
    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(config.output.log_level())
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    Ok(log_path)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start_time = Instant::now();

    let mut config = VoicemapConfig::from_ini_or_default(&args.config)?;
    args.apply(&mut config)?;
    config.files.ensure_directories()?;
    let log_path = init_logging(&config)?;

    info!("Starting voice matching with log level: {:?}", config.output.log_level());
    info!("Matcher settings: {}", config.matcher.describe());
    println!("Logging to {}", log_path.display());

    let table = RemakeTable::load(&config.files.remake_voice_file)?;
    let remakes = RemakeCorpus::from_table(&table, &config.filter);
    println!(
        "Remake lines: {} to align, {} skipped",
        remakes.utterances.len(),
        remakes.skipped.len()
    );

    let corpus = OriginalCorpus::from_files(&config.files)?;
    println!(
        "Original lines: {} voices, {} script lines, {} rejected",
        corpus.voices.len(),
        corpus.script.len(),
        corpus.rejected.len()
    );

    let provider = if config.matcher.use_semantic {
        build_provider(&config.embedding)?
    } else {
        None
    };

    let pipeline = AlignmentPipeline::new(config.matcher.clone(), corpus, provider);
    let alignment = pipeline.run(&remakes.utterances)?;
    let report = AlignmentReport::assemble(&alignment, &remakes, pipeline.index());

    let writer = ArtifactWriter::new(&config.files.output_dir, &config.output);
    let summary = writer.write_all(&report, &alignment.audit, &table, pipeline.index())?;

    let stats = &report.stats;
    println!("\nAlignment summary:");
    println!("  Blockwise anchors:   {}", stats.blockwise);
    println!("  Exact:               {}", stats.exact);
    println!("  Normalized:          {}", stats.normalized);
    println!("  Verified:            {}", stats.verified);
    println!("  Kept (unique text):  {}", stats.kept_unique);
    println!("  Reverted:            {}", stats.reverted);
    println!("  Context triplet:     {}", stats.context_triplet);
    println!("  Semantic:            {}", stats.semantic);
    println!("  Matched:             {}/{}", stats.matched(), stats.total);
    println!("  Unmatched:           {}", stats.unmatched);
    println!("  Skipped:             {}", report.skipped.len());
    println!(
        "\nWrote {} files to {} in {:.2?}",
        summary.files.len(),
        config.files.output_dir.display(),
        start_time.elapsed()
    );

    info!("Finished in {:.2?}", start_time.elapsed());
    Ok(())
}
