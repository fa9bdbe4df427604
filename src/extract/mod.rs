pub mod embedded_state;
pub mod tag_boundary;
pub mod tag_events;

use clap::ValueEnum;
use log::info;
use scraper::Html;
use serde_json::Value;
use strum::EnumIter;

use crate::{
    error::ExtractError,
    normalize::Normalization,
    schema::{ProviderInfo, ReviewRecord},
};

/// How reviews are pulled out of the saved page.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, ValueEnum)]
pub enum Strategy {
    /// Regex scan over each `id="re_..."` block.
    TagBoundary,
    /// Single pass over the parsed tag stream.
    TagEvents,
    /// Decode the state blob the page hydrates from.
    EmbeddedState,
}

impl Strategy {
    /// Picks the strategy that fits the page: embedded state wins when present.
    pub fn detect(html: &str, state_variable: &str) -> Self {
        if embedded_state::locate_payload(html, state_variable).is_some() {
            Strategy::EmbeddedState
        } else {
            Self::detect_markup(html).unwrap_or(Strategy::TagBoundary)
        }
    }

    /// A markup strategy, when the page carries review blocks at all.
    pub fn detect_markup(html: &str) -> Option<Self> {
        if html.contains(r#"data-test="review""#) {
            Some(Strategy::TagEvents)
        } else if regex!(r#"\sid="re_"#).is_match(html) {
            Some(Strategy::TagBoundary)
        } else {
            None
        }
    }

    pub fn default_normalization(self) -> Normalization {
        use Strategy::*;
        match self {
            TagEvents => Normalization::builder()
                .dedup(true)
                .require_text(true)
                .build(),
            TagBoundary | EmbeddedState => Normalization::KEEP_ALL,
        }
    }

    pub fn records_file_name(self) -> &'static str {
        use Strategy::*;
        match self {
            TagBoundary => "zocdoc-reviews-all.json",
            TagEvents => "zocdoc-reviews-extracted.json",
            EmbeddedState => "zocdoc-reviews-state.json",
        }
    }

    pub fn summary_file_name(self) -> &'static str {
        use Strategy::*;
        match self {
            TagBoundary => "summary-complete.json",
            TagEvents | EmbeddedState => "summary.json",
        }
    }

    pub fn source_label(self) -> &'static str {
        use Strategy::*;
        match self {
            TagBoundary => "ZocDoc HTML profile (complete extraction)",
            TagEvents => "ZocDoc HTML profile",
            EmbeddedState => "ZocDoc embedded state",
        }
    }

    /// The value `--strategy` accepts for this strategy.
    pub fn cli_name(self) -> String {
        self.to_possible_value()
            .map(|value| value.get_name().to_owned())
            .unwrap_or_else(|| format!("{self:?}"))
    }

    /// Number of records shown on the console after a run.
    pub fn preview_len(self) -> usize {
        match self {
            Strategy::TagBoundary => 5,
            _ => 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExtractOptions {
    pub state_variable: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            state_variable: embedded_state::DEFAULT_STATE_VARIABLE.to_owned(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Extraction {
    Found(Reviews),
    /// The state decoded fine but holds nothing that looks like a review list.
    ReviewsNotLocated {
        state: Value,
        provider: Option<ProviderInfo>,
    },
}

#[derive(Clone, Debug, Default)]
pub struct Reviews {
    pub records: Vec<ReviewRecord>,
    pub provider: Option<ProviderInfo>,
    /// The review entries exactly as found in the embedded state.
    pub raw_entries: Option<Vec<Value>>,
}

impl From<Vec<ReviewRecord>> for Reviews {
    fn from(records: Vec<ReviewRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }
}

pub fn extract(
    strategy: Strategy,
    html: &str,
    options: &ExtractOptions,
) -> Result<Extraction, ExtractError> {
    let extraction = match strategy {
        Strategy::TagBoundary => Extraction::Found(tag_boundary::parse(html).into()),
        Strategy::TagEvents => Extraction::Found(tag_events::parse(html).into()),
        Strategy::EmbeddedState => embedded_state::parse(html, &options.state_variable)?,
    };
    if let Extraction::Found(reviews) = &extraction {
        info!(
            "{strategy:?} extracted {} review records",
            reviews.records.len()
        );
    }
    Ok(extraction)
}

/// Decodes character references and drops inline tags from a markup snippet.
pub(crate) fn markup_to_text(markup: &str) -> String {
    Html::parse_fragment(markup)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_owned()
}

#[cfg(test)]
pub(crate) mod tests {
    use strum::IntoEnumIterator;

    use super::{extract, markup_to_text, ExtractOptions, Extraction, Strategy};

    /// A trimmed-down profile page with the markup all strategies look at.
    pub(crate) const PROFILE_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Dr. Example, OD</title></head>
<body>
<div itemprop="aggregateRating"><meta content="4.9" itemprop="ratingValue"></div>
<div class="review" id="re_first" data-test="review">
  <meta content="5" itemprop="ratingValue">
  <div itemprop="reviewBody"><span>Great doctor &amp; staff</span></div>
  <span data-test="review-dateRange">Less than 1 month ago</span>
  <div data-test="review-author"><span itemprop="name">Alison V.</span></div>
</div>
<div class="review" id="re_second" data-test="review">
  <span data-test="review-dateRange">2 months ago</span>
  <div data-test="review-author"><span itemprop="name">Initials hidden</span></div>
</div>
<div class="review" id="re_third" data-test="review">
  <meta content="3" itemprop="ratingValue">
  <div itemprop="reviewBody"><span>Long wait, good exam.</span></div>
  <span data-test="review-dateRange">3 months ago</span>
  <div data-test="review-author"><span itemprop="name">Rory M.</span></div>
</div>
<script>
window.__REDUX_STATE__ = JSON.parse("{\"profile\":{\"data\":{\"provider\":{\"approvedFullName\":\"Dr. Example, OD\",\"averageRating\":4.9}}},\"reviews\":{\"items\":[{\"id\":\"r1\",\"rating\":5,\"review\":\"Great doctor \\u0026 staff\",\"name\":\"Alison V.\",\"date\":\"Less than 1 month ago\"},{\"id\":\"r2\",\"rating\":3,\"review\":\"Long wait, good exam.\",\"name\":\"Rory M.\",\"date\":\"3 months ago\"}]}}");
</script>
</body></html>"#;

    #[test]
    fn detect_prefers_embedded_state() {
        assert_eq!(
            Strategy::detect(PROFILE_PAGE, "__REDUX_STATE__"),
            Strategy::EmbeddedState
        );
        assert_eq!(
            Strategy::detect(PROFILE_PAGE, "__OTHER_STATE__"),
            Strategy::TagEvents
        );
        assert_eq!(
            Strategy::detect(r#"<div id="re_x"></div>"#, "__REDUX_STATE__"),
            Strategy::TagBoundary
        );
    }

    #[test]
    fn detect_markup_needs_review_blocks() {
        assert_eq!(Strategy::detect_markup(PROFILE_PAGE), Some(Strategy::TagEvents));
        assert_eq!(
            Strategy::detect_markup(r#"<div id="re_x"></div>"#),
            Some(Strategy::TagBoundary)
        );
        assert_eq!(
            Strategy::detect_markup(r#"<a data-review-id="re_x"></a>"#),
            None
        );
        assert_eq!(
            Strategy::detect(r#"<a data-review-id="re_x"></a>"#, "__REDUX_STATE__"),
            Strategy::TagBoundary
        );
    }

    #[test]
    fn cli_names_are_kebab_case() {
        assert_eq!(Strategy::TagBoundary.cli_name(), "tag-boundary");
        assert_eq!(Strategy::EmbeddedState.cli_name(), "embedded-state");
    }

    #[test]
    fn every_strategy_emits_ratings_in_range() {
        for strategy in Strategy::iter() {
            let Extraction::Found(reviews) =
                extract(strategy, PROFILE_PAGE, &ExtractOptions::default()).unwrap()
            else {
                panic!("{strategy:?} did not locate reviews");
            };
            assert!(!reviews.records.is_empty(), "{strategy:?}");
            for record in &reviews.records {
                assert!((1..=5).contains(&record.rating().get()), "{strategy:?}");
            }
        }
    }

    #[test]
    fn strategies_agree_on_written_reviews() {
        let written = |strategy: Strategy| {
            let Ok(Extraction::Found(reviews)) =
                extract(strategy, PROFILE_PAGE, &ExtractOptions::default())
            else {
                panic!("{strategy:?} failed");
            };
            crate::normalize::normalize(
                reviews.records,
                Strategy::TagEvents.default_normalization(),
            )
            .into_iter()
            .map(|r| (r.text().clone(), r.author().as_str().to_owned(), r.rating().get()))
            .collect::<Vec<_>>()
        };
        let expected = vec![
            ("Great doctor & staff".to_owned(), "Alison V.".to_owned(), 5),
            ("Long wait, good exam.".to_owned(), "Rory M.".to_owned(), 3),
        ];
        for strategy in Strategy::iter() {
            assert_eq!(written(strategy), expected, "{strategy:?}");
        }
    }

    #[test]
    fn markup_to_text_decodes_entities() {
        assert_eq!(markup_to_text("  Tom &amp; Jerry&#39;s  "), "Tom & Jerry's");
        assert_eq!(markup_to_text("Caf&eacute; <b>visit</b>"), "Café visit");
        assert_eq!(markup_to_text(""), "");
    }
}
