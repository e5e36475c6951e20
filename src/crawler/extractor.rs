use scraper::{ElementRef, Html, Selector};

use crate::models::signals::{Signals, NO_DESCRIPTION, NO_TITLE};

pub const MAX_H2: usize = 5;
pub const MAX_SNIPPET_CHARS: usize = 5000;
const MISSING_ALT_PENALTY: usize = 5;

/// Turn raw HTML into [`Signals`]. Never fails: broken markup just yields fewer signals.
pub fn extract(html: &str, url: &str) -> Signals {
    let document = Html::parse_document(html);

    let title = select_all(&document, "title")
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let description = select_all(&document, "meta[name]")
        .find(|el| {
            el.value()
                .attr("name")
                .map(|n| n.trim().eq_ignore_ascii_case("description"))
                .unwrap_or(false)
        })
        .and_then(|el| el.value().attr("content").map(|c| c.trim().to_string()))
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let h1 = headings(&document, "h1");
    let h2 = headings(&document, "h2").into_iter().take(MAX_H2).collect();

    let paragraphs: Vec<String> = select_all(&document, "p")
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .collect();
    let content_snippet = truncate_chars(&paragraphs.join(" "), MAX_SNIPPET_CHARS);

    let images: Vec<ElementRef> = select_all(&document, "img").collect();
    let images_missing_alt = images
        .iter()
        .filter(|img| {
            img.value()
                .attr("alt")
                .map(|alt| alt.trim().is_empty())
                .unwrap_or(true)
        })
        .count();

    Signals {
        url: url.to_string(),
        title,
        description,
        h1,
        h2,
        content_snippet,
        image_count: images.len(),
        images_missing_alt,
        accessibility_score: accessibility_score(images_missing_alt),
    }
}

/// `max(0, 100 - 5m)` for `m` images without alt text.
pub fn accessibility_score(images_missing_alt: usize) -> u8 {
    100usize.saturating_sub(images_missing_alt.saturating_mul(MISSING_ALT_PENALTY)) as u8
}

fn select_all<'a>(document: &'a Html, selector: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = Selector::parse(selector).ok();
    selector
        .into_iter()
        .flat_map(move |s| document.select(&s).collect::<Vec<_>>())
}

fn headings(document: &Html, tag: &str) -> Vec<String> {
    select_all(document, tag)
        .map(|el| element_text(&el))
        .collect()
}

/// All descendant text with runs of whitespace collapsed to one space.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
