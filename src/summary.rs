use chrono::NaiveDate;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::schema::{Rating, ReviewRecord};

/// Aggregate written next to the review list.
#[derive(Clone, PartialEq, Debug, Getters, CopyGetters, Serialize, Deserialize)]
pub struct Summary {
    #[getset(get_copy = "pub")]
    total_reviews: usize,
    #[getset(get_copy = "pub")]
    reviews_with_text: usize,
    #[getset(get_copy = "pub")]
    reviews_rating_only: usize,
    #[getset(get_copy = "pub")]
    reviews_with_names: usize,
    #[getset(get_copy = "pub")]
    reviews_with_dates: usize,
    #[getset(get = "pub")]
    provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[getset(get_copy = "pub")]
    average_rating: Option<f64>,
    #[getset(get_copy = "pub")]
    extraction_date: NaiveDate,
    #[getset(get = "pub")]
    source: String,
    #[getset(get = "pub")]
    rating_distribution: RatingDistribution,
}

impl Summary {
    pub fn compute(
        records: &[ReviewRecord],
        provider: impl Into<String>,
        average_rating: Option<f64>,
        source: impl Into<String>,
        extraction_date: NaiveDate,
    ) -> Self {
        let count = |pred: fn(&ReviewRecord) -> bool| records.iter().filter(|r| pred(r)).count();
        let reviews_with_text = count(ReviewRecord::has_text);
        Self {
            total_reviews: records.len(),
            reviews_with_text,
            reviews_rating_only: records.len() - reviews_with_text,
            reviews_with_names: count(|r| r.author().is_named()),
            reviews_with_dates: count(ReviewRecord::has_date),
            provider: provider.into(),
            average_rating,
            extraction_date,
            source: source.into(),
            rating_distribution: records.iter().map(|r| r.rating()).collect(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter)]
pub enum Stars {
    Five,
    Four,
    Three,
    Two,
    One,
}

impl Stars {
    fn of(rating: Rating) -> Self {
        match rating.get() {
            1 => Stars::One,
            2 => Stars::Two,
            3 => Stars::Three,
            4 => Stars::Four,
            _ => Stars::Five,
        }
    }

    /// The key used in the summary file, e.g. `5_stars` or `1_star`.
    pub fn key(self) -> &'static str {
        match self {
            Stars::Five => "5_stars",
            Stars::Four => "4_stars",
            Stars::Three => "3_stars",
            Stars::Two => "2_stars",
            Stars::One => "1_star",
        }
    }
}

/// Review counts per star value. Every bucket is serialized, even when empty.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct RatingDistribution {
    #[serde(rename = "5_stars")]
    five: usize,
    #[serde(rename = "4_stars")]
    four: usize,
    #[serde(rename = "3_stars")]
    three: usize,
    #[serde(rename = "2_stars")]
    two: usize,
    #[serde(rename = "1_star")]
    one: usize,
}

impl RatingDistribution {
    fn bucket_mut(&mut self, stars: Stars) -> &mut usize {
        match stars {
            Stars::Five => &mut self.five,
            Stars::Four => &mut self.four,
            Stars::Three => &mut self.three,
            Stars::Two => &mut self.two,
            Stars::One => &mut self.one,
        }
    }

    pub fn add(&mut self, rating: Rating) {
        *self.bucket_mut(Stars::of(rating)) += 1;
    }

    pub fn get(&self, stars: Stars) -> usize {
        match stars {
            Stars::Five => self.five,
            Stars::Four => self.four,
            Stars::Three => self.three,
            Stars::Two => self.two,
            Stars::One => self.one,
        }
    }

    /// Buckets from five stars down to one.
    pub fn entries(&self) -> impl Iterator<Item = (Stars, usize)> + '_ {
        Stars::iter().map(|stars| (stars, self.get(stars)))
    }

    pub fn total(&self) -> usize {
        self.entries().map(|(_, count)| count).sum()
    }
}

impl FromIterator<Rating> for RatingDistribution {
    fn from_iter<T: IntoIterator<Item = Rating>>(iter: T) -> Self {
        let mut ret = Self::default();
        for rating in iter {
            ret.add(rating);
        }
        ret
    }
}
