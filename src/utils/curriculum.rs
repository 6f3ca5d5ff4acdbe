use std::fs;

use anyhow::{Context, Result};
use log::{info, warn};
use reqwest::Client;
use scraper::Html;

use crate::config::{Config, CurriculumSource};
use crate::models::{Semester, Subject};
use crate::utils::cell::strip_tags;
use crate::utils::dom::{find_by_id, table_rows, CellNode, RowNode};

const PLACEHOLDER: &str = "-";
const REQUIRED_MARKER: &str = "bum01";
const DESIGN_MARKER: &str = "bum02";

// Fetches the curriculum page, or reads a saved copy of it.
pub async fn retrieve_curriculum(config: &Config) -> Result<String> {
    match &config.curriculum {
        CurriculumSource::File(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read curriculum file {}", path.display())),
        CurriculumSource::Url(url) => {
            let client = Client::builder()
                .build()
                .context("Failed to build the client")?;
            let response = client
                .get(url.as_str())
                .send()
                .await
                .context("Failed to send curriculum request")?
                .error_for_status()
                .context("Curriculum page returned an error status")?;
            response.text().await.context("Failed to read response text")
        }
    }
}

// Admission year -> id of the curriculum tab that applies to it.
pub fn tab_for_admission_year(year: &str) -> Option<&'static str> {
    match year.trim() {
        "2020" | "2021" => Some("2021"),
        "2022" => Some("2022"),
        "2023" => Some("2023"),
        "2024" | "2025" => Some("2024"),
        _ => None,
    }
}

/// Validates one code/name/credit triple.
///
/// `name_markup` is the raw inner markup of the name cell: the style classes
/// that mark required and design courses only exist there.
pub fn parse_subject(
    year: &str,
    semester: Semester,
    division: &str,
    code: &str,
    name_markup: &str,
    credit: &str,
) -> Option<Subject> {
    let code = code.trim();
    let credit: String = credit.chars().filter(|c| !c.is_whitespace()).collect();
    let stripped = strip_tags(name_markup);
    let name = stripped.split('(').next().unwrap_or("").trim();

    if code.is_empty() || code == PLACEHOLDER || credit.is_empty() || credit == PLACEHOLDER {
        return None;
    }
    if name.is_empty() || name == PLACEHOLDER {
        return None;
    }

    Some(Subject {
        year: year.to_string(),
        semester,
        division: division.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        is_required: name_markup.contains(REQUIRED_MARKER),
        is_design: name_markup.contains(DESIGN_MARKER),
        credit,
    })
}

fn parse_cells<C: CellNode>(
    year: &str,
    semester: Semester,
    division: &str,
    cells: &[C],
) -> Option<Subject> {
    parse_subject(
        year,
        semester,
        division,
        &cells[0].plain_text(),
        &cells[1].inner_markup(),
        &cells[2].plain_text(),
    )
}

// Year/division context carried from header rows down to the data rows below them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkState {
    pub year: String,
    pub division: String,
}

impl WalkState {
    /// Consumes one row, returning the updated context and the subjects the row yields.
    pub fn step<R: RowNode>(self, row: &R) -> (WalkState, Vec<Subject>) {
        let mut state = self;
        let headers = row.header_cells();
        match headers.as_slice() {
            [year, division] => {
                state.year = year.plain_text().trim().to_string();
                state.division = division.plain_text().trim().to_string();
            }
            [single] => {
                let text = single.plain_text().trim().to_string();
                if is_single_digit(&text) {
                    state.year = text;
                } else {
                    state.division = text;
                }
            }
            _ => {}
        }

        if state.year.is_empty() {
            return (state, Vec::new());
        }

        let cells = row.data_cells();
        let mut subjects = Vec::new();
        if cells.len() >= 3 {
            subjects.extend(parse_cells(&state.year, Semester::First, &state.division, &cells[0..3]));
        }
        if cells.len() >= 6 {
            subjects.extend(parse_cells(&state.year, Semester::Second, &state.division, &cells[3..6]));
        }
        (state, subjects)
    }
}

fn is_single_digit(text: &str) -> bool {
    let mut chars = text.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_digit())
}

pub fn walk_rows<R: RowNode>(rows: &[R]) -> Vec<Subject> {
    let (_, subjects) = rows.iter().fold(
        (WalkState::default(), Vec::new()),
        |(state, mut acc), row| {
            let (state, found) = state.step(row);
            acc.extend(found);
            (state, acc)
        },
    );
    subjects
}

// Walks every table inside the admission year's tab, or the whole page when the tab is unknown.
pub fn parse_curriculum(html_content: &str, tab_id: Option<&str>) -> Result<Vec<Subject>> {
    let document = Html::parse_document(html_content);
    let scope = match tab_id {
        Some(id) => match find_by_id(&document, id)? {
            Some(tab) => tab,
            None => {
                warn!("Curriculum tab {} not found, walking the whole page", id);
                document.root_element()
            }
        },
        None => {
            warn!("No curriculum tab for this admission year, walking the whole page");
            document.root_element()
        }
    };

    let rows = table_rows(scope)?;
    let subjects = walk_rows(&rows);
    info!("Parsed {} curriculum subjects from {} rows", subjects.len(), rows.len());
    Ok(subjects)
}

pub fn filter_subjects(subjects: &[Subject], grade: &str, semester: Semester) -> Vec<Subject> {
    subjects
        .iter()
        .filter(|s| s.year == grade && s.semester == semester)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(headers: &[&str], cells: &[&str]) -> String {
        let mut out = String::from("<tr>");
        for h in headers {
            out.push_str(&format!("<th>{}</th>", h));
        }
        for c in cells {
            out.push_str(&format!("<td>{}</td>", c));
        }
        out.push_str("</tr>");
        out
    }

    fn table(rows: &[String]) -> String {
        format!("<table><tbody>{}</tbody></table>", rows.concat())
    }

    const FULL_ROW: [&str; 6] = ["CS101", "Data Structures", "3", "CS202", "Algorithms", "3"];

    #[test]
    fn parses_well_formed_subject() {
        let subject = parse_subject(
            "1",
            Semester::First,
            "Track A",
            "CS101",
            "<b>Data Structures</b>(어쩌고)",
            "3",
        )
        .unwrap();
        assert_eq!(subject.name, "Data Structures");
        assert_eq!(subject.code, "CS101");
        assert!(!subject.is_required);
        assert!(!subject.is_design);
    }

    #[test]
    fn rejects_placeholders_and_blanks() {
        let parse = |code, name, credit| parse_subject("1", Semester::First, "", code, name, credit);
        assert!(parse("-", "Name", "3").is_none());
        assert!(parse("", "Name", "3").is_none());
        assert!(parse("CS1", "Name", "").is_none());
        assert!(parse("CS1", "Name", "-").is_none());
        assert!(parse("CS1", "Name", " - ").is_none());
        assert!(parse("CS1", "-", "3").is_none());
        assert!(parse("CS1", "<span>(only a note)</span>", "3").is_none());
    }

    #[test]
    fn credit_whitespace_is_removed() {
        let subject = parse_subject("1", Semester::First, "", "CS1", "Name", " 3 - 0 ").unwrap();
        assert_eq!(subject.credit, "3-0");
    }

    #[test]
    fn required_and_design_flags_are_independent() {
        let both = parse_subject("1", Semester::First, "", "CS1", "<span class=\"bum01 bum02\">X</span>", "3").unwrap();
        assert!(both.is_required && both.is_design);
        let design = parse_subject("1", Semester::First, "", "CS1", "<span class=\"bum02\">X</span>", "3").unwrap();
        assert!(!design.is_required && design.is_design);
    }

    #[test]
    fn header_pair_then_full_row_yields_two_terms() {
        let html = table(&[row(&["2021", "Track A"], &[]), row(&[], &FULL_ROW)]);
        let subjects = parse_curriculum(&html, None).unwrap();
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].semester, Semester::First);
        assert_eq!(subjects[1].semester, Semester::Second);
        for s in &subjects {
            assert_eq!(s.year, "2021");
            assert_eq!(s.division, "Track A");
        }
    }

    #[test]
    fn rows_before_first_year_are_skipped() {
        let html = table(&[
            row(&[], &FULL_ROW),
            row(&["Track A"], &FULL_ROW),
            row(&["1"], &["CS300", "Compilers", "3"]),
        ]);
        let subjects = parse_curriculum(&html, None).unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].code, "CS300");
        assert_eq!(subjects[0].year, "1");
        assert_eq!(subjects[0].division, "Track A");
    }

    #[test]
    fn single_header_updates_year_or_division() {
        let html = table(&[
            row(&["1", "Track A"], &[]),
            row(&["Track B"], &["CS1", "A", "3"]),
            row(&["2"], &["CS2", "B", "3"]),
        ]);
        let subjects = parse_curriculum(&html, None).unwrap();
        assert_eq!(
            subjects.iter().map(|s| (s.year.as_str(), s.division.as_str())).collect::<Vec<_>>(),
            vec![("1", "Track B"), ("2", "Track B")]
        );
    }

    #[test]
    fn explicit_fold_step_carries_state() {
        let html = Html::parse_document(&table(&[row(&["3", "Track C"], &[])]));
        let rows = table_rows(html.root_element()).unwrap();
        let (state, found) = WalkState::default().step(&rows[0]);
        assert!(found.is_empty());
        assert_eq!(state, WalkState { year: "3".to_string(), division: "Track C".to_string() });
    }

    #[test]
    fn scopes_to_admission_tab() {
        let html = format!(
            "<div id=\"2021\">{}</div><div id=\"2022\">{}</div>",
            table(&[row(&["1", "Old"], &["OLD1", "Old course", "3"])]),
            table(&[row(&["1", "New"], &["NEW1", "New course", "3"])]),
        );
        let subjects = parse_curriculum(&html, tab_for_admission_year("2022")).unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].code, "NEW1");
    }

    #[test]
    fn maps_admission_years_to_tabs() {
        assert_eq!(tab_for_admission_year("2020"), Some("2021"));
        assert_eq!(tab_for_admission_year("2025"), Some("2024"));
        assert_eq!(tab_for_admission_year("2019"), None);
    }

    #[test]
    fn filter_keeps_walk_order() {
        let html = table(&[
            row(&["1", "A"], &FULL_ROW),
            row(&["2", "A"], &FULL_ROW),
            row(&["1", "B"], &["CS900", "Seminar", "1"]),
        ]);
        let subjects = parse_curriculum(&html, None).unwrap();
        let picked = filter_subjects(&subjects, "1", Semester::First);
        assert_eq!(
            picked.iter().map(|s| s.code.as_str()).collect::<Vec<_>>(),
            vec!["CS101", "CS900"]
        );
    }
}
