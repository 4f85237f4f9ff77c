//! REFIX: overlap-guided read repair
//!
//! Usage: refix [OPTIONS] <db> <overlaps> <out.fasta>

use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

use refix::errors::Result;
use refix::fix::{FixConfig, Fixer, Stats};
use refix::overlap::OverlapFile;
use refix::store::{QvStore, ReadStore};
use refix::track::{track_path, IntervalTrack, QualityTrack};

#[derive(Parser)]
#[command(name = "refix")]
#[command(version)]
#[command(
    about = "REFIX: patch weak regions and chimeric breaks in long reads using overlap evidence",
    long_about = None
)]
struct Cli {
    /// Minimum length for patched sequences
    #[arg(short = 'x', long = "min-length", default_value_t = 1000)]
    min_length: i32,

    /// Segment quality threshold; segments with Q >= N (or without data)
    /// are candidates for patching
    #[arg(short = 'Q', long = "low-quality", default_value_t = 28)]
    low_quality: u16,

    /// Maximum gap length for patching; -1 disables the cap
    #[arg(
        short = 'g',
        long = "max-gap",
        default_value_t = 500,
        allow_hyphen_values = true
    )]
    max_gap: i32,

    /// Trim reads based on this track
    #[arg(short = 't', long = "trim")]
    trim: Option<String>,

    /// Convert track intervals onto the patched reads (repeatable)
    #[arg(short = 'c', long = "convert")]
    convert: Vec<String>,

    /// Also write patched quality streams to this path
    #[arg(short = 'q', long = "quality-out")]
    quality_out: Option<PathBuf>,

    /// Number of threads to use (default: number of CPUs)
    #[arg(long)]
    threads: Option<usize>,

    /// Print patching statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Read database (FASTA; tracks live in sibling <db>.<name> files)
    db: PathBuf,

    /// Overlap file, sorted by (aread, bread, abpos)
    overlaps: PathBuf,

    /// Output FASTA of patched reads
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .expect("Failed to initialize thread pool");
    }

    match run(&cli) {
        Ok(stats) => {
            if cli.stats {
                eprintln!("Patching stats: {}", stats);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<Stats> {
    let store = ReadStore::from_path(&cli.db)?;
    let nreads = store.count();

    let qv = match &cli.quality_out {
        Some(_) => Some(QvStore::from_path(track_path(&cli.db, "qv"), &store)?),
        None => None,
    };

    let qtrack = QualityTrack::from_path(track_path(&cli.db, "q"), "q", nreads)?;
    let dust = IntervalTrack::from_path(track_path(&cli.db, "dust"), "dust", nreads)?;

    let trim = cli
        .trim
        .as_deref()
        .map(|name| IntervalTrack::from_path(track_path(&cli.db, name), name, nreads))
        .transpose()?;

    let convert: Vec<IntervalTrack> = cli
        .convert
        .iter()
        .map(|name| IntervalTrack::from_path(track_path(&cli.db, name), name, nreads))
        .collect::<Result<_>>()?;

    let overlaps = OverlapFile::from_path(&cli.overlaps)?;

    let cfg = FixConfig {
        minlen: cli.min_length,
        lowq: cli.low_quality,
        maxgap: if cli.max_gap < 0 {
            None
        } else {
            Some(cli.max_gap)
        },
        twidth: overlaps.twidth(),
    };

    let fixer = Fixer {
        cfg: &cfg,
        store: &store,
        qv: qv.as_ref(),
        qtrack: &qtrack,
        dust: &dust,
        trim: trim.as_ref(),
        convert: &convert,
    };

    let mut fasta_out = BufWriter::new(File::create(&cli.output)?);

    let stats = match &cli.quality_out {
        Some(path) => {
            let mut qv_out = BufWriter::new(File::create(path)?);
            fixer.run(&overlaps, &mut fasta_out, Some(&mut qv_out))?
        }
        None => fixer.run::<_, BufWriter<File>>(&overlaps, &mut fasta_out, None)?,
    };

    Ok(stats)
}
