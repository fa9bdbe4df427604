use ego_tree::{iter::Edge, NodeId};
use log::{debug, trace};
use scraper::{ElementRef, Html};

use crate::schema::{Rating, ReviewRecord};

/// Runs the tag-stream parser over a whole document.
///
/// Records come out in document order without any clean-up; callers decide
/// about trimming, deduplication and rating-only entries.
pub fn parse(html: &str) -> Vec<ReviewRecord> {
    let html = Html::parse_document(html);
    let mut parser = ReviewParser::default();
    for event in events(&html) {
        parser.feed(event);
    }
    parser.finish()
}

#[derive(Clone, Copy, Debug)]
pub enum TagEvent<'a> {
    Start(ElementRef<'a>),
    End(NodeId),
    Text(&'a str),
}

/// Flattens the parsed document into start / end / text events.
///
/// The tree builder already balanced the markup, so every `Start` is followed
/// by exactly one matching `End`.
pub fn events(html: &Html) -> impl Iterator<Item = TagEvent<'_>> {
    html.root_element().traverse().filter_map(|edge| match edge {
        Edge::Open(node) => match ElementRef::wrap(node) {
            Some(element) => Some(TagEvent::Start(element)),
            None => node.value().as_text().map(|text| TagEvent::Text(&**text)),
        },
        Edge::Close(node) => node.value().is_element().then(|| TagEvent::End(node.id())),
    })
}

/// Which field the text currently being read belongs to.
/// The node id is the element that switched the state on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FieldState {
    Idle,
    InBody(NodeId),
    InAuthor(NodeId),
    InDate(NodeId),
}

impl FieldState {
    fn opened_by(self) -> Option<NodeId> {
        use FieldState::*;
        match self {
            Idle => None,
            InBody(id) | InAuthor(id) | InDate(id) => Some(id),
        }
    }
}

#[derive(Debug)]
struct OpenReview {
    block: NodeId,
    id: String,
    rating: Rating,
    body: Vec<String>,
    author: Option<String>,
    date: Option<String>,
    field: FieldState,
}

impl OpenReview {
    fn new(block: ElementRef) -> Self {
        Self {
            block: block.id(),
            id: block.value().attr("id").unwrap_or_default().to_owned(),
            rating: Rating::FALLBACK,
            body: vec![],
            author: None,
            date: None,
            field: FieldState::Idle,
        }
    }

    fn into_record(self) -> ReviewRecord {
        ReviewRecord::builder()
            .id(self.id)
            .rating(self.rating)
            .text(self.body.join(" "))
            .author(self.author.unwrap_or_default())
            .date(self.date.unwrap_or_default())
            .build()
    }
}

#[derive(Debug, Default)]
pub struct ReviewParser {
    open: Option<OpenReview>,
    finished: Vec<ReviewRecord>,
}

impl ReviewParser {
    pub fn feed(&mut self, event: TagEvent) {
        match event {
            TagEvent::Start(element) => self.start(element),
            TagEvent::End(node) => self.end(node),
            TagEvent::Text(text) => self.text(text),
        }
    }

    pub fn finish(mut self) -> Vec<ReviewRecord> {
        self.close_review();
        debug!("Tag stream yielded {} review blocks", self.finished.len());
        self.finished
    }

    fn start(&mut self, element: ElementRef) {
        if selector!(r#"[data-test="review"]"#).matches(&element) {
            self.close_review();
            self.open = Some(OpenReview::new(element));
            return;
        }
        let Some(open) = self.open.as_mut() else {
            return;
        };
        if selector!(r#"meta[itemprop="ratingValue"]"#).matches(&element) {
            open.rating = element
                .value()
                .attr("content")
                .map_or(Rating::FALLBACK, Rating::parse_or_fallback);
        } else if selector!(r#"[itemprop="reviewBody"]"#).matches(&element) {
            open.field = FieldState::InBody(element.id());
        } else if selector!(r#"[data-test="review-author"]"#).matches(&element) {
            open.field = FieldState::InAuthor(element.id());
        } else if selector!(r#"[data-test="review-dateRange"]"#).matches(&element) {
            open.field = FieldState::InDate(element.id());
        }
    }

    fn end(&mut self, node: NodeId) {
        let Some(open) = self.open.as_mut() else {
            return;
        };
        if open.block == node {
            self.close_review();
        } else if open.field.opened_by() == Some(node) {
            open.field = FieldState::Idle;
        }
    }

    fn text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Some(open) = self.open.as_mut() else {
            return;
        };
        match open.field {
            FieldState::Idle => {}
            FieldState::InBody(_) => open.body.push(text.to_owned()),
            FieldState::InAuthor(_) => {
                open.author.get_or_insert_with(|| text.to_owned());
            }
            FieldState::InDate(_) => {
                open.date.get_or_insert_with(|| text.to_owned());
            }
        }
    }

    fn close_review(&mut self) {
        if let Some(open) = self.open.take() {
            trace!("Closing review block {:?}", open.id);
            self.finished.push(open.into_record());
        }
    }
}
