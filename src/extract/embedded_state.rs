//! Reviews from the serialized store state the page hydrates from.
//!
//! The page carries something like
//! `window.__REDUX_STATE__ = JSON.parse("{\"profile\":...}");`, that is, JSON
//! text wrapped in a JavaScript string literal. The literal is unescaped first,
//! then parsed, then searched for the first list of review-like objects.

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::{
    error::ExtractError,
    extract::{Extraction, Reviews},
    schema::{ProviderInfo, Rating, ReviewRecord},
};

pub const DEFAULT_STATE_VARIABLE: &str = "__REDUX_STATE__";

/// How far below the root the review list is looked for.
pub const MAX_SEARCH_DEPTH: usize = 15;

/// Size of the payload head kept when the payload is not valid JSON.
pub const DIAGNOSTIC_FRAGMENT_CHARS: usize = 10_000;

const ID_KEYS: [&str; 2] = ["id", "reviewId"];
const RATING_KEYS: [&str; 2] = ["rating", "overallRating"];
const TEXT_KEYS: [&str; 3] = ["review", "text", "comment"];
const AUTHOR_KEYS: [&str; 3] = ["name", "author", "patientName"];
const DATE_KEYS: [&str; 3] = ["date", "reviewDate", "createdAt"];

pub fn parse(html: &str, variable: &str) -> Result<Extraction, ExtractError> {
    let payload =
        locate_payload(html, variable).ok_or_else(|| ExtractError::EmbeddedStateNotFound {
            variable: variable.to_owned(),
        })?;
    debug!("Found embedded state payload of {} bytes", payload.len());
    let state = decode(payload)?;
    info!("Successfully parsed the embedded state");

    let provider = provider_info(&state);
    if let Some(provider) = &provider {
        info!(
            "Provider: {:?}, average rating: {:?}",
            provider.name(),
            provider.average_rating()
        );
    }

    let Some(entries) = find_review_list(&state).cloned() else {
        warn!("No review list found in the embedded state");
        return Ok(Extraction::ReviewsNotLocated { state, provider });
    };
    let records = entries.iter().filter_map(record_from_entry).collect();
    Ok(Extraction::Found(Reviews {
        records,
        provider,
        raw_entries: Some(entries),
    }))
}

/// Returns the still-escaped string literal body of `window.<variable> = JSON.parse("...");`.
pub fn locate_payload<'a>(html: &'a str, variable: &str) -> Option<&'a str> {
    regex!(r#"(?s)window\.([A-Za-z_$][\w$]*)\s*=\s*JSON\.parse\("((?:[^"\\]|\\.)*)"\);"#)
        .captures_iter(html)
        .find(|c| &c[1] == variable)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

pub fn decode(payload: &str) -> Result<Value, ExtractError> {
    let json = unescape_js_string(payload);
    serde_json::from_str(&json).map_err(|source| ExtractError::Decode {
        source,
        fragment: json.chars().take(DIAGNOSTIC_FRAGMENT_CHARS).collect(),
    })
}

/// Resolves the escape sequences of a JavaScript string literal body.
///
/// Malformed `\x` / `\u` sequences are kept as written.
pub fn unescape_js_string(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut rest = literal;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let mut chars = rest[pos + 1..].chars();
        let Some(escaped) = chars.next() else {
            out.push('\\');
            return out;
        };
        rest = chars.as_str();
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            'x' => match take_hex(rest, 2).and_then(|(code, tail)| Some((char::from_u32(code)?, tail))) {
                Some((c, tail)) => {
                    out.push(c);
                    rest = tail;
                }
                None => out.push_str("\\x"),
            },
            'u' => match unicode_escape(rest) {
                Some((c, tail)) => {
                    out.push(c);
                    rest = tail;
                }
                None => out.push_str("\\u"),
            },
            // Line continuation
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => rest = rest.strip_prefix('\n').unwrap_or(rest),
            c => out.push(c),
        }
    }
    out.push_str(rest);
    out
}

fn take_hex(s: &str, len: usize) -> Option<(u32, &str)> {
    let digits = s.get(..len)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some((u32::from_str_radix(digits, 16).ok()?, &s[len..]))
}

/// Parses what follows `\u`: `XXXX`, a surrogate pair `XXXX\uXXXX`, or `{X...}`.
fn unicode_escape(s: &str) -> Option<(char, &str)> {
    if let Some(braced) = s.strip_prefix('{') {
        let end = braced.find('}')?;
        let code = u32::from_str_radix(&braced[..end], 16).ok()?;
        return Some((char::from_u32(code)?, &braced[end + 1..]));
    }
    let (unit, tail) = take_hex(s, 4)?;
    match unit {
        0xD800..=0xDBFF => {
            let low = tail
                .strip_prefix("\\u")
                .and_then(|t| take_hex(t, 4))
                .filter(|(low, _)| (0xDC00..=0xDFFF).contains(low));
            match low {
                Some((low, tail)) => {
                    let code = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                    Some((char::from_u32(code)?, tail))
                }
                None => Some((char::REPLACEMENT_CHARACTER, tail)),
            }
        }
        0xDC00..=0xDFFF => Some((char::REPLACEMENT_CHARACTER, tail)),
        _ => Some((char::from_u32(unit)?, tail)),
    }
}

/// Depth-first search for the first list that looks like reviews.
///
/// A list matches when one of its entries is an object with `rating`, `review`
/// and `name`. A list under a key containing "review" also matches when its
/// first entry is an object with `rating`.
pub fn find_review_list(state: &Value) -> Option<&Vec<Value>> {
    search(state, 0)
}

fn search(value: &Value, depth: usize) -> Option<&Vec<Value>> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                if item.as_object().is_some_and(looks_like_review) {
                    return Some(items);
                }
                if let Some(found) = search(item, depth + 1) {
                    return Some(found);
                }
            }
            None
        }
        Value::Object(map) => map.iter().find_map(|(key, child)| match child {
            Value::Array(items)
                if key.to_lowercase().contains("review")
                    && items
                        .first()
                        .and_then(Value::as_object)
                        .is_some_and(|entry| entry.contains_key("rating")) =>
            {
                Some(items)
            }
            _ => search(child, depth + 1),
        }),
        _ => None,
    }
}

fn looks_like_review(entry: &Map<String, Value>) -> bool {
    ["rating", "review", "name"]
        .iter()
        .all(|key| entry.contains_key(*key))
}

pub fn provider_info(state: &Value) -> Option<ProviderInfo> {
    let provider = state.pointer("/profile/data/provider")?;
    Some(
        ProviderInfo::builder()
            .name(provider["approvedFullName"].as_str().map(str::to_owned))
            .average_rating(provider["averageRating"].as_f64())
            .highly_recommend_percentage(provider["highlyRecommendPercentage"].as_f64())
            .build(),
    )
}

fn record_from_entry(entry: &Value) -> Option<ReviewRecord> {
    let entry = entry.as_object()?;
    let rating = RATING_KEYS
        .iter()
        .find_map(|key| match entry.get(*key)? {
            Value::Number(n) => n.as_f64().map(Rating::from_number),
            Value::String(s) => Some(s.parse()),
            _ => None,
        })
        .map_or(Rating::FALLBACK, |parsed| {
            parsed.unwrap_or_else(|e| {
                warn!("{e}; falling back to {} stars", Rating::FALLBACK);
                Rating::FALLBACK
            })
        });
    Some(
        ReviewRecord::builder()
            .id(first_string(entry, &ID_KEYS))
            .rating(rating)
            .text(first_string(entry, &TEXT_KEYS))
            .author(first_string(entry, &AUTHOR_KEYS))
            .date(first_string(entry, &DATE_KEYS))
            .build(),
    )
}

fn first_string(entry: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match entry.get(*key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}
