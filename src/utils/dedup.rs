use std::collections::HashSet;

use crate::utils::cell::cell_text;
use crate::utils::dom::CellNode;
use crate::utils::layout::GridLayout;

const KEY_SEPARATOR: &str = "|";

// code|name|professor|time of a grid row; one key per real-world offering.
pub fn course_key<C: CellNode>(cells: &[C], layout: &GridLayout) -> String {
    [layout.code, layout.name, layout.professor, layout.time]
        .iter()
        .map(|&i| cell_text(&cells[i]))
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Keys already emitted in one scan session.
///
/// Only answers membership; output order always comes from the rows themselves.
#[derive(Debug, Default)]
pub struct CourseKeys {
    seen: HashSet<String>,
}

impl CourseKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn mark(&mut self, key: String) {
        self.seen.insert(key);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
