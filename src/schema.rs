use std::str::FromStr;

use deranged::RangedU8;
use derive_more::{AsRef, Display, From};
use getset::{CopyGetters, Getters};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use typed_builder::TypedBuilder;

/// One review as it appears on the profile page.
///
/// Field names in JSON follow the files consumed by the website:
/// `id`, `rating`, `review`, `name`, `date`.
#[derive(
    Clone, PartialEq, Eq, Debug, TypedBuilder, Getters, CopyGetters, Serialize, Deserialize,
)]
pub struct ReviewRecord {
    #[builder(default, setter(into))]
    #[getset(get = "pub")]
    id: ReviewId,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    rating: Rating,
    #[builder(default, setter(into))]
    #[serde(rename = "review")]
    #[getset(get = "pub")]
    text: String,
    #[builder(default, setter(into))]
    #[serde(rename = "name")]
    #[getset(get = "pub")]
    author: AuthorName,
    #[builder(default, setter(into))]
    #[getset(get = "pub")]
    date: String,
}

impl ReviewRecord {
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn has_date(&self) -> bool {
        !self.date.is_empty()
    }

    pub(crate) fn trimmed(self) -> Self {
        fn trim(s: String) -> String {
            let trimmed = s.trim();
            if trimmed.len() == s.len() {
                s
            } else {
                trimmed.to_owned()
            }
        }
        Self {
            id: ReviewId(trim(self.id.0)),
            rating: self.rating,
            text: trim(self.text),
            author: AuthorName(trim(self.author.0)),
            date: trim(self.date),
        }
    }
}

/// Opaque block identifier such as `re_4Hk2...`. Empty when the source has none.
#[derive(
    Clone, PartialEq, Eq, Hash, Debug, Default, From, AsRef, Display, Serialize, Deserialize,
)]
#[as_ref(forward)]
#[serde(transparent)]
pub struct ReviewId(String);

impl From<&str> for ReviewId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl ReviewId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Star rating, always within `1..=5`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(RangedU8<1, 5>);

impl Rating {
    /// Used whenever a review carries no usable rating.
    pub const FALLBACK: Rating = Rating(RangedU8::MAX);

    pub fn new(stars: u8) -> Option<Self> {
        RangedU8::new(stars).map(Self)
    }

    pub fn get(self) -> u8 {
        self.0.get()
    }

    /// Rounds to the nearest star count.
    pub fn from_number(value: f64) -> Result<Self, RatingParseError> {
        let rounded = value.round();
        if (1.0..=5.0).contains(&rounded) {
            Self::new(rounded as u8).ok_or(RatingParseError::OutOfRange(value))
        } else {
            Err(RatingParseError::OutOfRange(value))
        }
    }

    pub fn parse_or_fallback(s: &str) -> Self {
        s.parse().unwrap_or_else(|e| {
            warn!("{e}; falling back to {} stars", Self::FALLBACK);
            Self::FALLBACK
        })
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self::FALLBACK
    }
}

#[derive(PartialEq, Debug, Error)]
pub enum RatingParseError {
    #[error("Rating is not a number: {0:?}")]
    NotANumber(String),
    #[error("Rating is outside 1..=5: {0}")]
    OutOfRange(f64),
}

impl FromStr for Rating {
    type Err = RatingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value = s
            .parse::<f64>()
            .map_err(|_| RatingParseError::NotANumber(s.to_owned()))?;
        Self::from_number(value)
    }
}

/// Reviewer display name, e.g. `"Alison V."` or the withheld placeholder.
#[derive(
    Clone, PartialEq, Eq, Hash, Debug, Default, From, AsRef, Display, Serialize, Deserialize,
)]
#[as_ref(forward)]
#[serde(transparent)]
pub struct AuthorName(String);

impl From<&str> for AuthorName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AuthorName {
    /// Shown by the site instead of a name when the reviewer hid their identity.
    pub const WITHHELD: &'static str = "Initials hidden";

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// False for an empty name and for placeholders that hide the reviewer.
    pub fn is_named(&self) -> bool {
        let lower = self.0.trim().to_lowercase();
        !(lower.is_empty()
            || lower.contains(&Self::WITHHELD.to_lowercase())
            || lower.contains("anonymous"))
    }
}

/// Aggregate data the profile exposes about the provider.
#[derive(Clone, PartialEq, Debug, Default, TypedBuilder, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct ProviderInfo {
    #[builder(default)]
    name: Option<String>,
    #[builder(default)]
    average_rating: Option<f64>,
    #[builder(default)]
    highly_recommend_percentage: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::{AuthorName, Rating, RatingParseError, ReviewRecord};

    #[test]
    fn parse_rating() {
        assert_eq!("4".parse::<Rating>().map(Rating::get), Ok(4));
        assert_eq!(" 1 ".parse::<Rating>().map(Rating::get), Ok(1));
        assert_eq!("4.6".parse::<Rating>().map(Rating::get), Ok(5));
        assert_eq!("0".parse::<Rating>(), Err(RatingParseError::OutOfRange(0.)));
        assert_eq!("6".parse::<Rating>(), Err(RatingParseError::OutOfRange(6.)));
        assert_eq!(
            "five".parse::<Rating>(),
            Err(RatingParseError::NotANumber("five".to_owned()))
        );
    }

    #[test]
    fn rating_fallback_is_five() {
        assert_eq!(Rating::default().get(), 5);
        assert_eq!(Rating::parse_or_fallback("").get(), 5);
        assert_eq!(Rating::parse_or_fallback("10").get(), 5);
        assert_eq!(Rating::parse_or_fallback("2").get(), 2);
    }

    #[test]
    fn rating_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<Rating>("3").is_ok());
        assert!(serde_json::from_str::<Rating>("0").is_err());
        assert!(serde_json::from_str::<Rating>("6").is_err());
    }

    #[test]
    fn author_is_named() {
        assert!(AuthorName::from("Alison V.").is_named());
        assert!(!AuthorName::from("").is_named());
        assert!(!AuthorName::from("Initials hidden").is_named());
        assert!(!AuthorName::from("Anonymous patient").is_named());
    }

    #[test]
    fn record_json_round_trip() {
        let records = vec![
            ReviewRecord::builder()
                .id("re_1")
                .rating(Rating::new(4).unwrap())
                .text("Very thorough exam.")
                .author("Kerry M.")
                .date("Less than 1 month ago")
                .build(),
            ReviewRecord::builder().author(AuthorName::WITHHELD).build(),
        ];
        let json = serde_json::to_string_pretty(&records).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value[0],
            serde_json::json!({
                "id": "re_1",
                "rating": 4,
                "review": "Very thorough exam.",
                "name": "Kerry M.",
                "date": "Less than 1 month ago",
            })
        );
        let parsed: Vec<ReviewRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn trimmed_strips_every_field() {
        let record = ReviewRecord::builder()
            .id(" re_1 ")
            .text("\n  Great doctor  ")
            .author(" Jane ")
            .date(" 2024-01-01\t")
            .build()
            .trimmed();
        assert_eq!(record.id().as_str(), "re_1");
        assert_eq!(record.text(), "Great doctor");
        assert_eq!(record.author().as_str(), "Jane");
        assert_eq!(record.date(), "2024-01-01");
    }
}
