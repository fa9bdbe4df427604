use getset::CopyGetters;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::schema::{AuthorName, ReviewRecord};

/// Number of leading characters of the review text that take part in [`DedupKey`].
pub const DEDUP_TEXT_PREFIX_CHARS: usize = 50;

/// Two records with the same key are treated as the same review.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DedupKey {
    author: AuthorName,
    text_prefix: String,
    stars: u8,
}

impl From<&ReviewRecord> for DedupKey {
    fn from(record: &ReviewRecord) -> Self {
        Self {
            author: record.author().clone(),
            text_prefix: record
                .text()
                .chars()
                .take(DEDUP_TEXT_PREFIX_CHARS)
                .collect(),
            stars: record.rating().get(),
        }
    }
}

/// What happens to the extracted list before it is written.
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, TypedBuilder, CopyGetters, Serialize, Deserialize,
)]
#[getset(get_copy = "pub")]
pub struct Normalization {
    /// Collapse records sharing a [`DedupKey`], keeping the first.
    dedup: bool,
    /// Drop rating-only records.
    require_text: bool,
}

impl Normalization {
    pub const KEEP_ALL: Normalization = Normalization {
        dedup: false,
        require_text: false,
    };

    pub fn with_overrides(self, dedup: Option<bool>, require_text: Option<bool>) -> Self {
        Self {
            dedup: dedup.unwrap_or(self.dedup),
            require_text: require_text.unwrap_or(self.require_text),
        }
    }
}

pub fn normalize(records: Vec<ReviewRecord>, policy: Normalization) -> Vec<ReviewRecord> {
    let before = records.len();
    let records = records
        .into_iter()
        .map(ReviewRecord::trimmed)
        .filter(|record| !policy.require_text || record.has_text());
    let records = if policy.dedup {
        dedup(records)
    } else {
        records.collect()
    };
    debug!(
        "Normalized {before} records into {} with {policy:?}",
        records.len()
    );
    records
}

pub fn dedup(records: impl IntoIterator<Item = ReviewRecord>) -> Vec<ReviewRecord> {
    records
        .into_iter()
        .unique_by(|record| DedupKey::from(record))
        .collect()
}
