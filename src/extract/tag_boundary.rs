use itertools::Itertools;
use log::trace;

use crate::{
    extract::markup_to_text,
    schema::{Rating, ReviewRecord},
};

/// One record per review block identifier, in document order.
pub fn parse(html: &str) -> Vec<ReviewRecord> {
    block_spans(html)
        .into_iter()
        .map(|(id, block)| parse_block(id, block))
        .collect()
}

/// Each identifier owns the text from the tag that opens its block up to the
/// next identifier's start, so fields never leak across blocks.
///
/// An identifier may be repeated by links or anchors elsewhere in the page.
/// The tag carrying `data-test="review"` wins; otherwise the first tag does.
fn block_spans(html: &str) -> Vec<(&str, &str)> {
    let mut starts: Vec<(&str, usize, bool)> = vec![];
    for c in regex!(r#"<[A-Za-z][^>]*?\sid="(re_[^"]+)"[^>]*>"#).captures_iter(html) {
        let (Some(tag), Some(id)) = (c.get(0), c.get(1)) else {
            continue;
        };
        let opens_block = tag.as_str().contains(r#"data-test="review""#);
        let id = id.as_str();
        match starts.iter_mut().find(|(known, ..)| *known == id) {
            Some(entry) if opens_block && !entry.2 => *entry = (id, tag.start(), true),
            Some(_) => {}
            None => starts.push((id, tag.start(), opens_block)),
        }
    }
    starts.sort_by_key(|&(_, start, _)| start);
    let ends = starts
        .iter()
        .skip(1)
        .map(|&(_, start, _)| start)
        .chain([html.len()])
        .collect_vec();
    starts
        .into_iter()
        .zip(ends)
        .map(|((id, start, _), end)| (id, &html[start..end]))
        .collect()
}

fn parse_block(id: &str, block: &str) -> ReviewRecord {
    trace!("Parsing review block {id} ({} bytes)", block.len());
    let rating = regex!(r#"(?s)<meta\b[^>]*\bitemprop="ratingValue"[^>]*>"#)
        .find(block)
        .and_then(|tag| regex!(r#"\bcontent="([^"]*)""#).captures(tag.as_str()))
        .map_or(Rating::FALLBACK, |c| Rating::parse_or_fallback(&c[1]));
    let text = capture_text(
        regex!(r#"(?s)itemprop="reviewBody"[^>]*>\s*<span\b[^>]*>(.*?)</span>"#),
        block,
    );
    let date = capture_text(
        regex!(r#"(?s)data-test="review-dateRange"[^>]*>(.*?)</span>"#),
        block,
    );
    let author = capture_text(
        regex!(r#"(?s)data-test="review-author".*?<span\b[^>]*\bitemprop="name"[^>]*>(.*?)</span>"#),
        block,
    );
    ReviewRecord::builder()
        .id(id)
        .rating(rating)
        .text(text)
        .author(author)
        .date(date)
        .build()
}

fn capture_text(pattern: &regex::Regex, block: &str) -> String {
    pattern
        .captures(block)
        .map(|c| markup_to_text(&c[1]))
        .unwrap_or_default()
}
