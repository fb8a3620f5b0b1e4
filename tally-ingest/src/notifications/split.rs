//! Batch splitter: cut a pasted blob into one segment per notification.
//!
//! Bank SMS texts start with one of a handful of fixed phrases. The text is
//! cut right before each phrase so the phrase stays at the head of its own
//! segment.

use regex::Regex;
use std::sync::LazyLock;

/// Phrases that open a new notification. A phrase nested in another one
/// (`E-Com oplata:` inside `OTMENA E-Com oplata:`) is a cut point of its own.
const BOUNDARY_MARKERS: &[&str] = &[
    r"Karta\s+\*\d{4}",
    r"Schet\s+po\s+karte\s+\*\d{4}",
    r"OTMENA\s+E-Com\s+oplata:",
    r"Pokupka:",
    r"E-Com\s+oplata:",
    r"Platezh:",
    r"Perevod na kartu:",
];

static BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&BOUNDARY_MARKERS.join("|")).expect("boundary markers are valid regex")
});

/// Split `text` into trimmed, non-empty notification segments in input order.
///
/// Text before the first marker is kept as its own segment. Without any
/// marker the whole (trimmed) input is a single segment.
pub fn split_notifications(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;

    for cut in cut_points(text) {
        push_segment(&mut segments, &text[start..cut]);
        start = cut;
    }
    push_segment(&mut segments, &text[start..]);

    segments
}

/// Every byte offset where some marker begins, overlapping matches included.
fn cut_points(text: &str) -> Vec<usize> {
    let mut cuts = Vec::new();
    let mut pos = 0;

    while let Some(m) = BOUNDARY.find_at(text, pos) {
        cuts.push(m.start());
        let step = text[m.start()..].chars().next().map_or(1, char::len_utf8);
        pos = m.start() + step;
    }
    cuts
}

fn push_segment<'a>(segments: &mut Vec<&'a str>, raw: &'a str) {
    let s = raw.trim();
    if !s.is_empty() {
        segments.push(s);
    }
}
