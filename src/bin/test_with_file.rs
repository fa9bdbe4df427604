use std::path::PathBuf;

use clap::Parser;
use review_scraping::{
    extract::{extract, ExtractOptions, Extraction, Strategy},
    schema::ReviewRecord,
};
use strum::IntoEnumIterator;

#[derive(Parser)]
struct Opts {
    file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();
    let html = fs_err::read_to_string(&opts.file)?;

    for strategy in Strategy::iter() {
        let records = match extract(strategy, &html, &ExtractOptions::default()) {
            Ok(Extraction::Found(reviews)) => reviews.records,
            Ok(Extraction::ReviewsNotLocated { .. }) => {
                println!("{strategy:?}: state found, but no review list in it");
                continue;
            }
            Err(e) => {
                println!("{strategy:?}: {e}");
                continue;
            }
        };
        let with_text = records.iter().filter(|r| r.has_text()).count();
        println!(
            "{strategy:?}: {} records, {with_text} with text",
            records.len()
        );
        dbg!(records.first());

        let serialized = serde_json::to_string_pretty(&records)?;
        let deserialized: Vec<ReviewRecord> = serde_json::from_str(&serialized)?;
        assert_eq!(records, deserialized);
    }

    Ok(())
}
