use std::time::Duration;

use anyhow::Result;
use log::debug;

use crate::models::DetailedSubject;
use crate::utils::cell::cell_text;
use crate::utils::dedup::{course_key, CourseKeys};
use crate::utils::dom::{GridSurface, RowNode};
use crate::utils::layout::GridLayout;

/// When a scan of the virtualized grid stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Absolute offsets stepped by `increment`; stop at the bottom or after a pass with no new rows.
    Bounded,
    /// Relative steps of `step`; stop once the scroll position no longer moves.
    Stable,
    /// Relative steps; stop after a pass that found no new rows at a position
    /// that was already the bottom, or that the next step could not move.
    Converged,
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub settle: Duration,
    pub increment: f64,
    pub step: f64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            settle: Duration::from_millis(800),
            increment: 150.0,
            step: 320.0,
        }
    }
}

// Which rendered rows a pass may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowWindow {
    All,
    /// The final rendered row is the grid's loading row for the next page.
    SkipTrailing,
}

/// Accumulated output of one scan session.
pub struct Scan<'a, F> {
    keys: &'a mut CourseKeys,
    layout: &'a GridLayout,
    build: F,
    found: Vec<DetailedSubject>,
}

impl<'a, F> Scan<'a, F> {
    pub fn new(keys: &'a mut CourseKeys, layout: &'a GridLayout, build: F) -> Self {
        Scan { keys, layout, build, found: Vec::new() }
    }

    pub fn found(&self) -> &[DetailedSubject] {
        &self.found
    }

    pub fn into_found(self) -> Vec<DetailedSubject> {
        self.found
    }

    /// Reads one batch of rendered rows, returning how many records it added.
    ///
    /// A row's key is marked even when the row is then dropped for an empty
    /// code, so such rows are never revisited.
    pub fn absorb<R>(&mut self, rows: &[R], window: RowWindow) -> usize
    where
        R: RowNode,
        F: FnMut(&[R::Cell], String) -> DetailedSubject,
    {
        let count = match window {
            RowWindow::All => rows.len(),
            RowWindow::SkipTrailing => rows.len().saturating_sub(1),
        };
        let before = self.found.len();
        for row in &rows[..count] {
            let cells = row.data_cells();
            if cells.len() < self.layout.required_cells() {
                continue;
            }
            let key = course_key(&cells, self.layout);
            if self.keys.seen(&key) {
                continue;
            }
            self.keys.mark(key);
            let code = cell_text(&cells[self.layout.code]);
            if code.is_empty() {
                continue;
            }
            self.found.push((self.build)(cells.as_slice(), code));
        }
        self.found.len() - before
    }
}

async fn settle(settings: &ScanSettings) {
    if !settings.settle.is_zero() {
        tokio::time::sleep(settings.settle).await;
    }
}

pub async fn scan<G, F>(
    grid: &mut G,
    scan: &mut Scan<'_, F>,
    termination: Termination,
    window: RowWindow,
    settings: &ScanSettings,
) -> Result<()>
where
    G: GridSurface,
    F: FnMut(&[<G::Row as RowNode>::Cell], String) -> DetailedSubject,
{
    match termination {
        Termination::Bounded => scan_bounded(grid, scan, window, settings).await,
        Termination::Stable => scan_until_stable(grid, scan, window, settings).await,
        Termination::Converged => scan_until_converged(grid, scan, window, settings).await,
    }
}

async fn scan_bounded<G, F>(
    grid: &mut G,
    scan: &mut Scan<'_, F>,
    window: RowWindow,
    settings: &ScanSettings,
) -> Result<()>
where
    G: GridSurface,
    F: FnMut(&[<G::Row as RowNode>::Cell], String) -> DetailedSubject,
{
    let metrics = grid.metrics().await?;
    let mut offset = 0.0;
    loop {
        grid.scroll_to(offset).await?;
        settle(settings).await;
        let rows = grid.rendered_rows().await?;
        let added = scan.absorb(&rows, window);
        debug!("Scan at offset {}: {} rendered, {} new", offset, rows.len(), added);

        if offset + metrics.client_height >= metrics.scroll_height || added == 0 {
            return Ok(());
        }
        offset = (offset + settings.increment).min(metrics.max_offset());
    }
}

async fn scan_until_stable<G, F>(
    grid: &mut G,
    scan: &mut Scan<'_, F>,
    window: RowWindow,
    settings: &ScanSettings,
) -> Result<()>
where
    G: GridSurface,
    F: FnMut(&[<G::Row as RowNode>::Cell], String) -> DetailedSubject,
{
    let mut last_top: Option<f64> = None;
    loop {
        let rows = grid.rendered_rows().await?;
        let added = scan.absorb(&rows, window);

        grid.scroll_by(settings.step).await?;
        settle(settings).await;
        let top = grid.metrics().await?.scroll_top;
        debug!("Scan moved to {}: {} rendered, {} new", top, rows.len(), added);

        if last_top == Some(top) {
            return Ok(());
        }
        last_top = Some(top);
    }
}

async fn scan_until_converged<G, F>(
    grid: &mut G,
    scan: &mut Scan<'_, F>,
    window: RowWindow,
    settings: &ScanSettings,
) -> Result<()>
where
    G: GridSurface,
    F: FnMut(&[<G::Row as RowNode>::Cell], String) -> DetailedSubject,
{
    loop {
        let rows = grid.rendered_rows().await?;
        let added = scan.absorb(&rows, window);
        // Metrics of the position these rows were read at.
        let read_at = grid.metrics().await?;

        grid.scroll_by(settings.step).await?;
        settle(settings).await;
        let after = grid.metrics().await?;
        debug!("Scan moved {} -> {}: {} rendered, {} new", read_at.scroll_top, after.scroll_top, rows.len(), added);

        if added == 0 && (read_at.at_bottom() || after.scroll_top == read_at.scroll_top) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Offering;
    use crate::utils::snapshot::tests::{grid_html, grid_row, numbered_rows};
    use crate::utils::snapshot::{rows_from_html, OwnedCell, VirtualGrid, Viewport};

    fn viewport() -> Viewport {
        Viewport { row_height: 50.0, client_height: 100.0, loading_row: false }
    }

    fn settings() -> ScanSettings {
        ScanSettings { settle: Duration::ZERO, increment: 150.0, step: 100.0 }
    }

    fn build(cells: &[OwnedCell], code: String) -> DetailedSubject {
        DetailedSubject::standalone(
            String::new(),
            String::new(),
            code,
            cell_text(&cells[8]),
            String::new(),
            Offering {
                year: String::new(),
                professor: cell_text(&cells[12]),
                lecture_time: cell_text(&cells[13]),
                classroom: String::new(),
                room_number: String::new(),
            },
        )
    }

    fn codes(found: &[DetailedSubject]) -> Vec<String> {
        found.iter().map(|d| d.code.clone()).collect()
    }

    async fn run(grid: &mut VirtualGrid, termination: Termination, window: RowWindow) -> Vec<DetailedSubject> {
        let layout = GridLayout::default();
        let mut keys = CourseKeys::new();
        let mut session = Scan::new(&mut keys, &layout, build);
        scan(grid, &mut session, termination, window, &settings()).await.unwrap();
        session.into_found()
    }

    #[tokio::test]
    async fn bounded_scan_reads_every_row_in_order() {
        let mut grid = VirtualGrid::new(numbered_rows(10), viewport());
        let found = run(&mut grid, Termination::Bounded, RowWindow::All).await;
        let expected: Vec<String> = (0..10).map(|i| format!("CS{:03}", i)).collect();
        assert_eq!(codes(&found), expected);
    }

    #[tokio::test]
    async fn bounded_scan_stops_on_a_pass_without_new_rows() {
        let mut rows: Vec<String> = (0..7).map(|_| grid_row("CS000", "Same", "Kim", "월")).collect();
        rows.extend((7..10).map(|i| grid_row(&format!("CS{:03}", i), "Course", "Kim", "월")));
        let rows = rows_from_html(&grid_html(&rows)).unwrap();

        let mut grid = VirtualGrid::new(rows.clone(), viewport());
        let found = run(&mut grid, Termination::Bounded, RowWindow::All).await;
        assert_eq!(codes(&found), vec!["CS000"]);

        let mut grid = VirtualGrid::new(rows, viewport());
        let found = run(&mut grid, Termination::Converged, RowWindow::All).await;
        assert_eq!(codes(&found), vec!["CS000", "CS007", "CS008", "CS009"]);
    }

    #[tokio::test]
    async fn converged_scan_reads_the_bottom_after_quiet_passes() {
        let mut rows: Vec<String> = (0..9).map(|_| grid_row("CS000", "Same", "Kim", "월")).collect();
        rows.push(grid_row("CS009", "Last", "Lee", "화"));
        let rows = rows_from_html(&grid_html(&rows)).unwrap();

        let mut grid = VirtualGrid::new(rows.clone(), viewport());
        let stable = run(&mut grid, Termination::Stable, RowWindow::All).await;
        let mut grid = VirtualGrid::new(rows, viewport());
        let converged = run(&mut grid, Termination::Converged, RowWindow::All).await;

        assert_eq!(codes(&converged), vec!["CS000", "CS009"]);
        assert_eq!(codes(&converged), codes(&stable));
    }

    #[tokio::test]
    async fn stable_scan_ends_when_position_stops_moving() {
        let mut grid = VirtualGrid::new(numbered_rows(10), viewport());
        let found = run(&mut grid, Termination::Stable, RowWindow::All).await;
        assert_eq!(found.len(), 10);
        // Four moves reach the bottom; the fifth leaves the offset unchanged, even
        // though the pass before it still found CS009.
        assert_eq!(grid.scroll_commands, 5);
        assert_eq!(found.last().unwrap().code, "CS009");
    }

    #[tokio::test]
    async fn stable_scan_on_unscrollable_grid() {
        let mut grid = VirtualGrid::new(numbered_rows(2), viewport());
        let found = run(&mut grid, Termination::Stable, RowWindow::All).await;
        assert_eq!(found.len(), 2);
        assert_eq!(grid.scroll_commands, 2);
    }

    #[tokio::test]
    async fn converged_scan_takes_one_quiet_pass_at_bottom() {
        let mut grid = VirtualGrid::new(numbered_rows(10), viewport());
        let found = run(&mut grid, Termination::Converged, RowWindow::All).await;
        assert_eq!(found.len(), 10);
        assert_eq!(grid.scroll_commands, 6);
    }

    #[tokio::test]
    async fn trailing_row_is_left_for_later() {
        let mut grid = VirtualGrid::new(numbered_rows(2), viewport());
        let found = run(&mut grid, Termination::Bounded, RowWindow::SkipTrailing).await;
        assert_eq!(codes(&found), vec!["CS000"]);
    }

    #[tokio::test]
    async fn empty_code_and_short_rows_are_skipped() {
        let html = grid_html(&[
            grid_row("", "Blank", "Kim", "월"),
            "<tr><td>CS999</td></tr>".to_string(),
            grid_row("CS100", "Real", "Kim", "월"),
        ]);
        let mut grid = VirtualGrid::new(rows_from_html(&html).unwrap(), Viewport { client_height: 500.0, ..viewport() });
        let found = run(&mut grid, Termination::Stable, RowWindow::All).await;
        assert_eq!(codes(&found), vec!["CS100"]);
    }

    #[tokio::test]
    async fn repeated_rows_across_passes_are_emitted_once() {
        let html = grid_html(&[
            grid_row("CS100", "Same", "Kim", "월"),
            grid_row("CS100", "Same", "Kim", "월"),
            grid_row("CS100", "Same", "Lee", "월"),
        ]);
        let mut grid = VirtualGrid::new(rows_from_html(&html).unwrap(), viewport());
        let found = run(&mut grid, Termination::Stable, RowWindow::All).await;
        assert_eq!(
            found.iter().map(|d| d.professor.as_str()).collect::<Vec<_>>(),
            vec!["Kim", "Lee"]
        );
    }
}
