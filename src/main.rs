use std::path::PathBuf;

use clap::Parser;
use review_scraping::{
    config::Config,
    extract::Strategy,
    runner::{run, RunOptions, RunOutcome},
};

#[derive(Parser)]
struct Opts {
    /// TOML file with `input`, `output_dir`, `provider`, `state_variable` and `location`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Saved profile page. Overrides the config file.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Detected from the page when omitted.
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,
    /// Collapse duplicate reviews. Defaults depend on the strategy.
    #[arg(long)]
    dedup: Option<bool>,
    /// Drop reviews that carry only a rating. Defaults depend on the strategy.
    #[arg(long)]
    require_text: Option<bool>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();

    let mut config = Config::load(opts.config.as_deref())?;
    if let Some(input) = opts.input {
        config.input = input;
    }
    if let Some(output_dir) = opts.output_dir {
        config.output_dir = output_dir;
    }
    println!("Reading HTML from {:?}", config.input);

    let run_options = RunOptions {
        strategy: opts.strategy,
        dedup: opts.dedup,
        require_text: opts.require_text,
    };
    match run(&config, &run_options, chrono::Local::now().date_naive())? {
        RunOutcome::Written {
            strategy, summary, ..
        } => println!(
            "Done: {} reviews extracted with {strategy:?}",
            summary.total_reviews()
        ),
        RunOutcome::ReviewsNotLocated {
            markup_strategy, ..
        } => {
            println!("Done: the page state was saved, but no review list was found in it");
            if let Some(strategy) = markup_strategy {
                println!("The markup has review blocks; rerun with --strategy {}", strategy.cli_name());
            }
        }
    }

    Ok(())
}
