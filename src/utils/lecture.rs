use anyhow::{Context, Result};
use log::{debug, info};

use crate::models::{DetailedSubject, Offering, Semester, Subject};
use crate::utils::cell::cell_text;
use crate::utils::dedup::CourseKeys;
use crate::utils::dom::{
    CellNode, GridSurface, LecturePlanSource, RowNode, SearchField, SearchQuery,
};
use crate::utils::grid::{scan, RowWindow, Scan, ScanSettings, Termination};
use crate::utils::layout::GridLayout;

// Legacy keeps the two historical stop rules; Unified applies the converged rule to both flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPolicy {
    Legacy,
    Unified,
}

impl ScanPolicy {
    fn detail(self) -> Termination {
        match self {
            ScanPolicy::Legacy => Termination::Bounded,
            ScanPolicy::Unified => Termination::Converged,
        }
    }

    fn keyword(self) -> Termination {
        match self {
            ScanPolicy::Legacy => Termination::Stable,
            ScanPolicy::Unified => Termination::Converged,
        }
    }
}

type CellOf<S> = <<<S as LecturePlanSource>::Grid as GridSurface>::Row as RowNode>::Cell;

pub struct LecturePlan<'a> {
    pub opening_year: &'a str,
    pub semester: Semester,
    pub layout: &'a GridLayout,
    pub settings: &'a ScanSettings,
    pub policy: ScanPolicy,
}

fn offering<C: CellNode>(cells: &[C], layout: &GridLayout) -> Offering {
    Offering {
        year: cell_text(&cells[layout.year]),
        professor: cell_text(&cells[layout.professor]),
        lecture_time: cell_text(&cells[layout.time]),
        classroom: cell_text(&cells[layout.classroom]),
        room_number: cell_text(&cells[layout.room]),
    }
}

impl LecturePlan<'_> {
    fn query(&self, field: SearchField, text: &str) -> SearchQuery {
        SearchQuery {
            opening_year: self.opening_year.to_string(),
            semester: self.semester,
            field,
            text: text.to_string(),
        }
    }

    /// Looks every subject up by code and collects its offerings.
    ///
    /// The whole batch is one dedup session. Every subject but the last leaves
    /// the trailing rendered row alone, as it belongs to the next page.
    pub async fn fetch_details<S: LecturePlanSource>(
        &self,
        source: &mut S,
        subjects: &[Subject],
    ) -> Result<Vec<DetailedSubject>> {
        let layout = self.layout;
        let mut keys = CourseKeys::new();
        let mut details = Vec::new();

        for (idx, subject) in subjects.iter().enumerate() {
            let query = self.query(SearchField::Code, &subject.code);
            let mut grid = source
                .search(&query)
                .await
                .with_context(|| format!("Lecture-plan search for {} failed", subject.code))?;

            let window = if idx + 1 == subjects.len() {
                RowWindow::All
            } else {
                RowWindow::SkipTrailing
            };
            let mut session = Scan::new(&mut keys, layout, |cells: &[CellOf<S>], code: String| {
                DetailedSubject::from_subject(subject, code, offering(cells, layout))
            });
            scan(&mut grid, &mut session, self.policy.detail(), window, self.settings).await?;

            let found = session.into_found();
            info!("{} ({}): {} offerings", subject.name, subject.code, found.len());
            details.extend(found);
        }
        debug!("Detail batch saw {} distinct grid rows", keys.len());
        Ok(details)
    }

    /// Runs one keyword search by course name, with its own dedup session.
    pub async fn search_keyword<S: LecturePlanSource>(
        &self,
        source: &mut S,
        keyword: &str,
    ) -> Result<Vec<DetailedSubject>> {
        let layout = self.layout;
        let query = self.query(SearchField::Name, keyword);
        let mut grid = source
            .search(&query)
            .await
            .with_context(|| format!("Lecture-plan search for \"{}\" failed", keyword))?;

        let mut keys = CourseKeys::new();
        let mut session = Scan::new(&mut keys, layout, |cells: &[CellOf<S>], code: String| {
            DetailedSubject::standalone(
                cell_text(&cells[layout.semester]),
                cell_text(&cells[layout.division]),
                code,
                cell_text(&cells[layout.name]),
                cell_text(&cells[layout.credit]),
                offering(cells, layout),
            )
        });
        scan(&mut grid, &mut session, self.policy.keyword(), RowWindow::All, self.settings).await?;

        info!("Keyword \"{}\": {} results", keyword, session.found().len());
        Ok(session.into_found())
    }
}
