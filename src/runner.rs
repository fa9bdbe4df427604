use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use itertools::Itertools;
use log::{info, warn};

use crate::{
    config::Config,
    error::ExtractError,
    extract::{extract, ExtractOptions, Extraction, Strategy},
    fs_json_util::{write_json_pretty, write_text},
    normalize::normalize,
    schema::ReviewRecord,
    summary::Summary,
};

/// Head of the undecodable state payload.
pub const RAW_PAYLOAD_FILE: &str = "raw-json-string.txt";
/// The whole decoded state when no review list was found in it.
pub const STATE_DUMP_FILE: &str = "redux-state-full.json";
/// Review entries exactly as they appear in the embedded state.
pub const RAW_ENTRIES_FILE: &str = "zocdoc-reviews-raw.json";

const PREVIEW_TEXT_CHARS: usize = 100;

/// Per-run choices on top of [`Config`]. `None` keeps the strategy's default.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    pub strategy: Option<Strategy>,
    pub dedup: Option<bool>,
    pub require_text: Option<bool>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Written {
        strategy: Strategy,
        records_path: PathBuf,
        summary_path: PathBuf,
        summary: Summary,
    },
    ReviewsNotLocated {
        state_dump_path: PathBuf,
        /// Set when the markup itself has review blocks another strategy can read.
        markup_strategy: Option<Strategy>,
    },
}

pub fn run(config: &Config, opts: &RunOptions, today: NaiveDate) -> anyhow::Result<RunOutcome> {
    let html = fs_err::read_to_string(&config.input)?;
    println!("HTML file size: {} characters", html.chars().count());

    let strategy = match opts.strategy {
        Some(strategy) => strategy,
        None => {
            let detected = Strategy::detect(&html, &config.state_variable);
            info!("Detected strategy: {detected:?}");
            detected
        }
    };
    fs_err::create_dir_all(&config.output_dir)?;
    let output_path = |name: &str| config.output_dir.join(name);

    let extract_options = ExtractOptions {
        state_variable: config.state_variable.clone(),
    };
    let reviews = match extract(strategy, &html, &extract_options) {
        Ok(Extraction::Found(reviews)) => reviews,
        Ok(Extraction::ReviewsNotLocated { state, .. }) => {
            let state_dump_path = output_path(STATE_DUMP_FILE);
            write_json_pretty(&state_dump_path, &state)?;
            println!("Could not find reviews in the expected format");
            println!("Saved full state to {state_dump_path:?} for manual inspection");
            if let Some(map) = state.as_object() {
                println!("Top-level keys: {}", map.keys().join(", "));
            }
            let markup_strategy = Strategy::detect_markup(&html);
            if let Some(markup_strategy) = markup_strategy {
                warn!(
                    "The markup has review blocks; try `--strategy {}`",
                    markup_strategy.cli_name()
                );
            }
            return Ok(RunOutcome::ReviewsNotLocated {
                state_dump_path,
                markup_strategy,
            });
        }
        Err(e) => {
            if let ExtractError::Decode { fragment, .. } = &e {
                let path = output_path(RAW_PAYLOAD_FILE);
                write_text(&path, fragment)?;
                warn!("Saved the head of the undecodable payload to {path:?}");
            }
            return Err(e).with_context(|| format!("While extracting reviews from {:?}", config.input));
        }
    };

    if let Some(raw_entries) = &reviews.raw_entries {
        let path = output_path(RAW_ENTRIES_FILE);
        write_json_pretty(&path, raw_entries)?;
        println!("Saved {} raw entries to {path:?}", raw_entries.len());
    }

    let policy = strategy
        .default_normalization()
        .with_overrides(opts.dedup, opts.require_text);
    let records = normalize(reviews.records, policy);
    print_overview(&records, strategy.preview_len());

    let records_path = output_path(strategy.records_file_name());
    write_json_pretty(&records_path, &records)?;
    println!("Saved {} reviews to {records_path:?}", records.len());

    let provider = reviews.provider.unwrap_or_default();
    let summary = Summary::compute(
        &records,
        provider.name().clone().unwrap_or_else(|| config.provider.clone()),
        *provider.average_rating(),
        strategy.source_label(),
        today,
    );
    let summary_path = output_path(strategy.summary_file_name());
    write_json_pretty(&summary_path, &summary)?;
    println!("Created summary file {summary_path:?}");

    println!("Rating distribution:");
    for (stars, count) in summary.rating_distribution().entries() {
        if count > 0 {
            println!("  {}: {count} reviews", stars.key());
        }
    }

    Ok(RunOutcome::Written {
        strategy,
        records_path,
        summary_path,
        summary,
    })
}

fn print_overview(records: &[ReviewRecord], preview_len: usize) {
    let with_text = records.iter().filter(|r| r.has_text()).count();
    println!("Total reviews: {}", records.len());
    println!("  with text: {with_text}");
    println!("  rating only: {}", records.len() - with_text);
    for (i, record) in records.iter().take(preview_len).enumerate() {
        println!("Review {}:", i + 1);
        println!("  Name: {}", record.author());
        println!("  Rating: {}", record.rating());
        println!("  Date: {}", record.date());
        let text = record.text();
        if text.chars().count() > PREVIEW_TEXT_CHARS {
            let head = text.chars().take(PREVIEW_TEXT_CHARS).collect::<String>();
            println!("  Review: {head}...");
        } else {
            println!("  Review: {text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use crate::{
        config::Config,
        extract::{tests::PROFILE_PAGE, Strategy},
        fs_json_util::read_json,
        schema::ReviewRecord,
        summary::Summary,
    };

    use super::{run, RunOptions, RunOutcome, RAW_ENTRIES_FILE, RAW_PAYLOAD_FILE, STATE_DUMP_FILE};

    fn setup(html: &str) -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        fs_err::write(&input, html).unwrap();
        let config = Config {
            input,
            output_dir: dir.path().join("out"),
            ..Config::default()
        };
        (dir, config)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 18).unwrap()
    }

    fn written(outcome: RunOutcome) -> (Strategy, std::path::PathBuf, std::path::PathBuf, Summary) {
        match outcome {
            RunOutcome::Written {
                strategy,
                records_path,
                summary_path,
                summary,
            } => (strategy, records_path, summary_path, summary),
            RunOutcome::ReviewsNotLocated { .. } => panic!("reviews not located"),
        }
    }

    #[test]
    fn tag_events_run_writes_records_and_summary() {
        let (_dir, config) = setup(PROFILE_PAGE);
        let opts = RunOptions {
            strategy: Some(Strategy::TagEvents),
            ..Default::default()
        };
        let (strategy, records_path, summary_path, summary) =
            written(run(&config, &opts, today()).unwrap());
        assert_eq!(strategy, Strategy::TagEvents);
        assert!(records_path.ends_with("zocdoc-reviews-extracted.json"));
        assert!(summary_path.ends_with("summary.json"));

        let records: Vec<ReviewRecord> = read_json(&records_path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text(), "Great doctor & staff");
        // Serializing what was read back gives the same file.
        let rewritten = serde_json::to_string_pretty(&records).unwrap();
        assert_eq!(rewritten, fs_err::read_to_string(&records_path).unwrap());

        let on_disk: Summary = read_json(&summary_path).unwrap();
        assert_eq!(on_disk, summary);
        assert_eq!(summary.total_reviews(), 2);
        assert_eq!(summary.rating_distribution().total(), 2);
        assert_eq!(summary.provider(), "Dr. Joanna Latek, OD");
        assert_eq!(summary.source(), "ZocDoc HTML profile");
        assert!(!config.output_dir.join(RAW_ENTRIES_FILE).exists());
    }

    #[test]
    fn overrides_change_the_policy() {
        let (_dir, config) = setup(PROFILE_PAGE);
        let opts = RunOptions {
            strategy: Some(Strategy::TagEvents),
            require_text: Some(false),
            ..Default::default()
        };
        let (.., summary) = written(run(&config, &opts, today()).unwrap());
        assert_eq!(summary.total_reviews(), 3);
        assert_eq!(summary.reviews_rating_only(), 1);
        assert_eq!(summary.reviews_with_names(), 2);
    }

    #[test]
    fn detected_embedded_state_uses_provider_info() {
        let (_dir, config) = setup(PROFILE_PAGE);
        let (strategy, records_path, _, summary) =
            written(run(&config, &RunOptions::default(), today()).unwrap());
        assert_eq!(strategy, Strategy::EmbeddedState);
        assert!(records_path.ends_with("zocdoc-reviews-state.json"));
        assert_eq!(summary.provider(), "Dr. Example, OD");
        assert_eq!(summary.average_rating(), Some(4.9));
        let raw: Vec<Value> = read_json(config.output_dir.join(RAW_ENTRIES_FILE)).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0]["id"], "r1");
    }

    #[test]
    fn decode_failure_leaves_only_the_diagnostic() {
        let (_dir, config) = setup(r#"<script>window.__REDUX_STATE__ = JSON.parse("{not json");</script>"#);
        assert!(run(&config, &RunOptions::default(), today()).is_err());
        assert_eq!(
            fs_err::read_to_string(config.output_dir.join(RAW_PAYLOAD_FILE)).unwrap(),
            "{not json"
        );
        assert!(!config.output_dir.join("zocdoc-reviews-state.json").exists());
        assert!(!config.output_dir.join("summary.json").exists());
    }

    #[test]
    fn unlocated_reviews_dump_the_state() {
        let (_dir, config) =
            setup(r#"<script>window.__REDUX_STATE__ = JSON.parse("{\"a\":{\"b\":1}}");</script>"#);
        let outcome = run(&config, &RunOptions::default(), today()).unwrap();
        let RunOutcome::ReviewsNotLocated {
            state_dump_path,
            markup_strategy,
        } = outcome
        else {
            panic!("unexpected reviews");
        };
        assert!(state_dump_path.ends_with(STATE_DUMP_FILE));
        assert_eq!(markup_strategy, None);
        let state: Value = read_json(&state_dump_path).unwrap();
        assert_eq!(state, json!({"a": {"b": 1}}));
        assert!(!config.output_dir.join("summary.json").exists());
    }

    #[test]
    fn unlocated_reviews_point_at_markup_blocks() {
        let html = r#"<div data-test="review" id="re_1"><div itemprop="reviewBody"><span>Kind</span></div></div>
            <script>window.__REDUX_STATE__ = JSON.parse("{\"profile\":{}}");</script>"#;
        let (_dir, config) = setup(html);
        let outcome = run(&config, &RunOptions::default(), today()).unwrap();
        let RunOutcome::ReviewsNotLocated {
            markup_strategy, ..
        } = outcome
        else {
            panic!("unexpected reviews");
        };
        assert_eq!(markup_strategy, Some(Strategy::TagEvents));
    }

    #[test]
    fn missing_state_is_an_error() {
        let (_dir, config) = setup("<html></html>");
        let opts = RunOptions {
            strategy: Some(Strategy::EmbeddedState),
            ..Default::default()
        };
        assert!(run(&config, &opts, today()).is_err());
    }

    #[test]
    fn missing_input_is_an_error() {
        let config = Config {
            input: Path::new("/nonexistent/page.html").to_owned(),
            ..Config::default()
        };
        assert!(run(&config, &RunOptions::default(), today()).is_err());
    }
}
