//! HTML helpers shared by the table-based scrapers.

use itertools::Itertools;
use scraper::{ElementRef, Html};

/// Find the first `<table>` that follows a heading containing `needle`.
///
/// Walks the document in order, so the table may sit anywhere after the
/// heading (sibling, cousin, or deeper), mirroring how the contests pages wrap
/// their tables in layout `div`s.
pub fn table_after_heading<'a>(
    doc: &'a Html,
    heading_tags: &[&str],
    needle: &str,
) -> Option<ElementRef<'a>> {
    let mut heading_seen = false;
    for el in doc.root_element().descendants().filter_map(ElementRef::wrap) {
        let tag = el.value().name();
        if !heading_seen {
            heading_seen = heading_tags.contains(&tag) && text_of(el).contains(needle);
        } else if tag == "table" {
            return Some(el);
        }
    }
    None
}

/// Visible text of an element with whitespace runs collapsed to single spaces.
pub fn text_of(el: ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<String>())
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().join(" ")
}
