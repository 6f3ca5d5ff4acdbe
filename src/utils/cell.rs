use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::utils::dom::CellNode;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br[^>]*>").expect("line break pattern"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));

pub fn strip_tags(markup: &str) -> String {
    TAG.replace_all(markup, "").into_owned()
}

// `<br>` variants become newlines, every other tag is dropped.
pub fn markup_to_text(markup: &str) -> String {
    let with_newlines = LINE_BREAK.replace_all(markup, "\n");
    strip_tags(&with_newlines).trim().to_string()
}

/// Display text of a table cell.
///
/// Cells that wrap their content in `<nobr>` keep their line breaks; anything
/// else, including a failed lookup, falls back to the plain rendered text.
pub fn cell_text<C: CellNode>(cell: &C) -> String {
    match cell.wrapped_markup() {
        Ok(Some(markup)) => markup_to_text(&markup),
        Ok(None) => cell.plain_text().trim().to_string(),
        Err(e) => {
            debug!("Wrapped text lookup failed, using plain text: {}", e);
            cell.plain_text().trim().to_string()
        }
    }
}
