//! Lecture-plan grid replayed from a saved HTML dump.
//!
//! The live page renders its result grid lazily: only the rows that intersect
//! the scroll viewport (plus one overscan row) exist in the DOM at any time,
//! followed by an empty "loading" row while more results remain. [`VirtualGrid`]
//! reproduces that behaviour over a fixed row set so the scanners can run
//! without a browser.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use scraper::{ElementRef, Html};

use crate::utils::cell::cell_text;
use crate::utils::dom::{
    selector, table_rows, CellNode, GridSurface, LecturePlanSource, RowNode, ScrollMetrics,
    SearchField, SearchQuery,
};
use crate::utils::layout::GridLayout;

const GRID_BODY_ID: &str = "grid01_body_tbody";

#[derive(Debug, Clone, PartialEq)]
pub struct OwnedCell {
    text: String,
    markup: String,
}

impl OwnedCell {
    pub fn from_element(element: &ElementRef<'_>) -> Self {
        OwnedCell {
            text: element.plain_text(),
            markup: element.inner_markup(),
        }
    }
}

impl CellNode for OwnedCell {
    fn plain_text(&self) -> String {
        self.text.clone()
    }

    fn inner_markup(&self) -> String {
        self.markup.clone()
    }

    fn wrapped_markup(&self) -> Result<Option<String>> {
        let fragment = Html::parse_fragment(&self.markup);
        let nobr = selector("nobr")?;
        Ok(fragment.select(&nobr).next().map(|el| el.inner_html()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnedRow {
    headers: Vec<OwnedCell>,
    cells: Vec<OwnedCell>,
}

impl OwnedRow {
    pub fn from_element(row: &ElementRef<'_>) -> Self {
        OwnedRow {
            headers: row.header_cells().iter().map(OwnedCell::from_element).collect(),
            cells: row.data_cells().iter().map(OwnedCell::from_element).collect(),
        }
    }

    fn loading() -> Self {
        OwnedRow {
            headers: Vec::new(),
            cells: vec![OwnedCell { text: String::new(), markup: String::new() }],
        }
    }
}

impl RowNode for OwnedRow {
    type Cell = OwnedCell;

    fn header_cells(&self) -> Vec<OwnedCell> {
        self.headers.clone()
    }

    fn data_cells(&self) -> Vec<OwnedCell> {
        self.cells.clone()
    }
}

// Rows of the grid body, or of every table in the fragment when the grid id is absent.
pub fn rows_from_html(html_content: &str) -> Result<Vec<OwnedRow>> {
    let document = Html::parse_document(html_content);
    let body = selector(&format!("tbody#{}", GRID_BODY_ID))?;
    let rows = match document.select(&body).next() {
        Some(tbody) => tbody
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "tr")
            .collect::<Vec<_>>(),
        None => table_rows(document.root_element())?,
    };
    Ok(rows.iter().map(OwnedRow::from_element).collect())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub row_height: f64,
    pub client_height: f64,
    pub loading_row: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { row_height: 30.0, client_height: 300.0, loading_row: true }
    }
}

#[derive(Debug, Clone)]
pub struct VirtualGrid {
    rows: Vec<OwnedRow>,
    viewport: Viewport,
    scroll_top: f64,
    pub scroll_commands: usize,
}

impl VirtualGrid {
    pub fn new(rows: Vec<OwnedRow>, viewport: Viewport) -> Self {
        VirtualGrid { rows, viewport, scroll_top: 0.0, scroll_commands: 0 }
    }

    fn metrics_now(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: self.scroll_top,
            scroll_height: self.rows.len() as f64 * self.viewport.row_height,
            client_height: self.viewport.client_height,
        }
    }

    fn clamp(&self, offset: f64) -> f64 {
        offset.clamp(0.0, self.metrics_now().max_offset())
    }

    fn window(&self) -> Vec<OwnedRow> {
        let height = self.viewport.row_height;
        let first = (self.scroll_top / height).floor() as usize;
        let visible_end = ((self.scroll_top + self.viewport.client_height) / height).ceil() as usize;
        let end = visible_end.saturating_add(1).min(self.rows.len());
        let mut window = self.rows.get(first..end).map(<[OwnedRow]>::to_vec).unwrap_or_default();
        if self.viewport.loading_row {
            window.push(OwnedRow::loading());
        }
        window
    }
}

impl GridSurface for VirtualGrid {
    type Row = OwnedRow;

    async fn rendered_rows(&mut self) -> Result<Vec<OwnedRow>> {
        Ok(self.window())
    }

    async fn metrics(&mut self) -> Result<ScrollMetrics> {
        Ok(self.metrics_now())
    }

    async fn scroll_to(&mut self, offset: f64) -> Result<()> {
        self.scroll_commands += 1;
        self.scroll_top = self.clamp(offset);
        Ok(())
    }

    async fn scroll_by(&mut self, delta: f64) -> Result<()> {
        self.scroll_commands += 1;
        self.scroll_top = self.clamp(self.scroll_top + delta);
        Ok(())
    }
}

/// Answers lecture-plan searches from a saved result grid.
///
/// Code searches keep rows whose code cell matches exactly; name searches keep
/// rows whose name cell contains the keyword. The dump is assumed to already
/// be the requested opening year and semester.
pub struct SnapshotSource {
    rows: Vec<OwnedRow>,
    layout: GridLayout,
    viewport: Viewport,
}

impl SnapshotSource {
    pub fn new(rows: Vec<OwnedRow>, layout: GridLayout, viewport: Viewport) -> Self {
        SnapshotSource { rows, layout, viewport }
    }

    pub fn open(path: &Path, layout: GridLayout, viewport: Viewport) -> Result<Self> {
        let html = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lecture-plan dump {}", path.display()))?;
        let rows = rows_from_html(&html)?;
        if rows.is_empty() {
            return Err(anyhow!("Lecture-plan dump {} has no grid rows", path.display()));
        }
        info!("Loaded {} lecture-plan rows from {}", rows.len(), path.display());
        Ok(Self::new(rows, layout, viewport))
    }

    fn matches(&self, row: &OwnedRow, query: &SearchQuery) -> bool {
        let column = match query.field {
            SearchField::Code => self.layout.code,
            SearchField::Name => self.layout.name,
        };
        let Some(cell) = row.cells.get(column) else {
            return false;
        };
        let value = cell_text(cell);
        let text = query.text.trim();
        match query.field {
            SearchField::Code => value == text,
            SearchField::Name => value.contains(text),
        }
    }
}

impl LecturePlanSource for SnapshotSource {
    type Grid = VirtualGrid;

    async fn search(&mut self, query: &SearchQuery) -> Result<VirtualGrid> {
        debug!(
            "Searching {} {} by {:?} for \"{}\"",
            query.opening_year, query.semester, query.field, query.text
        );
        let rows: Vec<OwnedRow> = self
            .rows
            .iter()
            .filter(|row| self.matches(row, query))
            .cloned()
            .collect();
        Ok(VirtualGrid::new(rows, self.viewport))
    }
}
