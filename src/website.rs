//! Turns extracted records into the review list the website is built from.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::info;

use crate::{
    config::Config,
    extract::Strategy,
    fs_json_util::{read_json, write_text},
    schema::{AuthorName, ReviewRecord},
};

pub const DEFAULT_NAME: &str = "Anonymous Patient";
pub const DEFAULT_DATE: &str = "Recently";
pub const DEFAULT_LOCATION: &str = "Eye & Health";
pub const ANONYMOUS_INITIALS: &str = "AP";
pub const WEBSITE_FILE: &str = "website-reviews.ts";

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WebsiteReview {
    pub id: usize,
    pub name: String,
    pub rating: u8,
    pub date: String,
    pub review: String,
    pub initials: String,
    pub location: String,
}

/// Written five-star reviews, numbered from 1 in input order.
pub fn website_reviews(records: &[ReviewRecord], location: &str) -> Vec<WebsiteReview> {
    records
        .iter()
        .filter(|r| !r.text().trim().is_empty() && r.rating().get() == 5)
        .enumerate()
        .map(|(i, r)| WebsiteReview {
            id: i + 1,
            name: non_empty_or(r.author().as_str(), DEFAULT_NAME),
            rating: r.rating().get(),
            date: non_empty_or(r.date(), DEFAULT_DATE),
            review: r.text().clone(),
            initials: initials(r.author()),
            location: location.to_owned(),
        })
        .collect()
}

fn non_empty_or(s: &str, default: &str) -> String {
    let s = if s.is_empty() { default } else { s };
    s.to_owned()
}

/// `"Alison V."` gives `AV`, `"al"` gives `AL`, `"Fernando"` gives `FE`.
pub fn initials(name: &AuthorName) -> String {
    let lower = name.as_str().to_lowercase();
    if lower.trim().is_empty()
        || lower.contains(&AuthorName::WITHHELD.to_lowercase())
        || lower.contains("anonymous")
    {
        return ANONYMOUS_INITIALS.to_owned();
    }
    let words = name.as_str().split_whitespace().collect_vec();
    match words[..] {
        [word] if word.chars().count() <= 3 => word.to_uppercase(),
        [word] => word.chars().take(2).collect::<String>().to_uppercase(),
        [first, .., last] => [first, last]
            .iter()
            .filter_map(|w| w.chars().next())
            .flat_map(char::to_uppercase)
            .collect(),
        [] => ANONYMOUS_INITIALS.to_owned(),
    }
}

/// Renders `const reviews = [...] as Review[];` for pasting into the site data.
pub fn render_typescript(reviews: &[WebsiteReview]) -> anyhow::Result<String> {
    let quoted = |s: &str| serde_json::to_string(s);
    let entries = reviews
        .iter()
        .map(|review| -> anyhow::Result<String> {
            Ok(format!(
                "  {{\n    id: {},\n    name: {},\n    rating: {},\n    date: {},\n    review: {},\n    initials: {},\n    location: {}\n  }}",
                review.id,
                quoted(&review.name)?,
                review.rating,
                quoted(&review.date)?,
                quoted(&review.review.replace(['\r', '\n'], " "))?,
                quoted(&review.initials)?,
                quoted(&review.location)?,
            ))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut out = String::from("const reviews = [\n");
    if !entries.is_empty() {
        out.push_str(&entries.join(",\n"));
        out.push('\n');
    }
    out.push_str("] as Review[];\n");
    Ok(out)
}

/// Files the export reads from and writes to, under the configured output directory.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExportPaths {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ExportPaths {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input: config
                .output_dir
                .join(Strategy::TagBoundary.records_file_name()),
            output: config.output_dir.join(WEBSITE_FILE),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Export {
    pub reviews: Vec<WebsiteReview>,
    pub typescript: String,
}

/// Reads extracted records, writes the TypeScript array and returns what was written.
pub fn export(input: &Path, output: &Path, location: &str) -> anyhow::Result<Export> {
    let records: Vec<ReviewRecord> = read_json(input)?;
    let reviews = website_reviews(&records, location);
    info!(
        "{} of {} records are written five-star reviews",
        reviews.len(),
        records.len()
    );
    let typescript = render_typescript(&reviews)?;
    write_text(output, &typescript)?;
    Ok(Export {
        reviews,
        typescript,
    })
}

pub fn average_rating(reviews: &[WebsiteReview]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum = reviews.iter().map(|r| f64::from(r.rating)).sum::<f64>();
    Some(sum / reviews.len() as f64)
}
