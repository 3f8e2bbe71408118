use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use chanmr::{
    map_reduce_apps::{stages, WordCount},
    Entry, MapReduceConfig, ParallelMapReduce,
};
use clap::Parser;
use tracing::{debug, trace};

/// Count words across every file in a directory.
#[derive(Parser, Debug)]
#[command(name = "chanmr", version)]
struct Cli {
    /// Directory whose regular files are the inputs
    dir: PathBuf,

    /// Give up on a phase after this many milliseconds
    #[arg(long)]
    phase_timeout_ms: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();
    debug!("chanmr started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let inputs = read_files_from_dir(&cli.dir)?;
    let mut config = MapReduceConfig::default();
    if let Some(ms) = cli.phase_timeout_ms {
        config = config.with_phase_timeout(Duration::from_millis(ms));
    }

    let (map, reduce) = stages(Arc::new(WordCount::new()));
    let output = ParallelMapReduce::from_stages(inputs, map, reduce)
        .with_config(config)
        .run_blocking()
        .context("word count failed")?;

    let mut counts: Vec<(String, u64)> = output
        .into_iter()
        .map(|(word, values)| {
            let count = values.iter().filter_map(|v| v.parse::<u64>().ok()).sum();
            (word, count)
        })
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (word, count) in counts {
        println!("{} {}", word, count);
    }
    Ok(())
}

/// One entry per regular file: key is the file name, the single value its contents.
fn read_files_from_dir(dir: &Path) -> anyhow::Result<Vec<Entry>> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {:?}", dir))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let contents =
            fs::read_to_string(&path).with_context(|| format!("failed to read {:?}", path))?;
        inputs.push(Entry::single(name, contents));
    }
    Ok(inputs)
}
