use std::path::PathBuf;

use clap::Parser;
use review_scraping::{
    config::Config,
    website::{average_rating, export, ExportPaths},
};

#[derive(Parser)]
struct Opts {
    /// Same file as the extractor's. Its `output_dir` and `location` are used.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Defaults to the tag-boundary records file under `output_dir`.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Defaults to `website-reviews.ts` under `output_dir`.
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    location: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let config = Config::load(opts.config.as_deref())?;
    let paths = ExportPaths::from_config(&config);
    let input = opts.input.unwrap_or(paths.input);
    let output = opts.output.unwrap_or(paths.output);
    let location = opts.location.unwrap_or(config.location);

    let exported = export(&input, &output, &location)?;
    println!(
        "Found {} reviews with text and 5-star ratings",
        exported.reviews.len()
    );
    println!("{}", exported.typescript);
    println!("Saved to {output:?}");

    println!("Total reviews: {}", exported.reviews.len());
    match average_rating(&exported.reviews) {
        Some(average) => println!("Average rating: {average:.2}"),
        None => println!("Average rating: n/a"),
    }

    Ok(())
}
