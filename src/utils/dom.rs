// Narrow view of a rendered page: the only DOM queries the extraction code performs.
#![allow(async_fn_in_trait)]

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

use crate::models::Semester;

pub trait CellNode {
    fn plain_text(&self) -> String;
    fn inner_markup(&self) -> String;
    /// Inner markup of the first `<nobr>` child, `Ok(None)` when there is none.
    fn wrapped_markup(&self) -> Result<Option<String>>;
}

pub trait RowNode {
    type Cell: CellNode;
    fn header_cells(&self) -> Vec<Self::Cell>;
    fn data_cells(&self) -> Vec<Self::Cell>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn at_bottom(&self) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height
    }

    pub fn max_offset(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }
}

/// A scrollable container whose rendered rows change as it scrolls.
///
/// Reads right after a scroll may be stale; callers sleep for a settle delay
/// before calling [`GridSurface::rendered_rows`].
pub trait GridSurface {
    type Row: RowNode;
    async fn rendered_rows(&mut self) -> Result<Vec<Self::Row>>;
    async fn metrics(&mut self) -> Result<ScrollMetrics>;
    async fn scroll_to(&mut self, offset: f64) -> Result<()>;
    async fn scroll_by(&mut self, delta: f64) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Code,
    Name,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub opening_year: String,
    pub semester: Semester,
    pub field: SearchField,
    pub text: String,
}

// The lecture-plan page: fill in the search form, submit, hand back the result grid.
pub trait LecturePlanSource {
    type Grid: GridSurface;
    async fn search(&mut self, query: &SearchQuery) -> Result<Self::Grid>;
}

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {}: {:?}", css, e))
}

fn child_elements<'a>(element: &ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == tag)
        .collect()
}

impl CellNode for ElementRef<'_> {
    fn plain_text(&self) -> String {
        self.text().collect::<String>()
    }

    fn inner_markup(&self) -> String {
        self.inner_html()
    }

    fn wrapped_markup(&self) -> Result<Option<String>> {
        let nobr = selector("nobr")?;
        Ok(self.select(&nobr).next().map(|el| el.inner_html()))
    }
}

impl<'a> RowNode for ElementRef<'a> {
    type Cell = ElementRef<'a>;

    fn header_cells(&self) -> Vec<Self::Cell> {
        child_elements(self, "th")
    }

    fn data_cells(&self) -> Vec<Self::Cell> {
        child_elements(self, "td")
    }
}

// Rows of every `tbody` under `scope`, in document order.
pub fn table_rows<'a>(scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>> {
    let tbody = selector("tbody")?;
    Ok(scope
        .select(&tbody)
        .flat_map(|body| child_elements(&body, "tr"))
        .collect())
}

pub fn find_by_id<'a>(document: &'a Html, id: &str) -> Result<Option<ElementRef<'a>>> {
    let by_id = selector(&format!("[id=\"{}\"]", id))?;
    Ok(document.select(&by_id).next())
}
