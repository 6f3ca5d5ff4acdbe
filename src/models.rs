use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

// Term labels exactly as the curriculum and lecture-plan pages spell them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semester {
    #[serde(rename = "1학기")]
    First,
    #[serde(rename = "2학기")]
    Second,
    #[serde(rename = "계절학기(하계)")]
    Summer,
    #[serde(rename = "계절학기(동계)")]
    Winter,
}

impl Semester {
    pub fn label(&self) -> &'static str {
        match self {
            Semester::First => "1학기",
            Semester::Second => "2학기",
            Semester::Summer => "계절학기(하계)",
            Semester::Winter => "계절학기(동계)",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Semester {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1학기" => Ok(Semester::First),
            "2학기" => Ok(Semester::Second),
            "계절학기(하계)" => Ok(Semester::Summer),
            "계절학기(동계)" => Ok(Semester::Winter),
            other => Err(anyhow!("Unknown semester label: {}", other)),
        }
    }
}

// A catalog-level curriculum entry, only ever built by the subject parser.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Subject {
    pub year: String,
    pub semester: Semester,
    pub division: String,
    pub code: String,
    pub name: String,
    pub is_required: bool,
    pub is_design: bool,
    pub credit: String,
}

impl Subject {
    pub fn formatted_info(&self) -> String {
        format!(
            "[{}학년 {}] {} | {} ({}) | 학점: {}{}{}",
            self.year,
            self.semester,
            self.division,
            self.name,
            self.code,
            self.credit,
            if self.is_required { " | 필수" } else { "" },
            if self.is_design { " | 설계" } else { "" },
        )
    }
}

/// An offering-level record read from the lecture-plan grid.
///
/// Records built from a curriculum [`Subject`] carry its required/design
/// flags; records built from a keyword search leave them as `None`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DetailedSubject {
    pub year: String,
    pub semester: String,
    pub division: String,
    pub code: String,
    pub name: String,
    pub is_required: Option<bool>,
    pub is_design: Option<bool>,
    pub credit: String,
    pub professor: String,
    pub lecture_time: String,
    pub classroom: String,
    pub room_number: String,
    pub rating: Option<f64>,
}

// Scheduling fields shared by both construction paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Offering {
    pub year: String,
    pub professor: String,
    pub lecture_time: String,
    pub classroom: String,
    pub room_number: String,
}

impl DetailedSubject {
    pub fn from_subject(subject: &Subject, code: String, offering: Offering) -> Self {
        DetailedSubject {
            year: offering.year,
            semester: subject.semester.label().to_string(),
            division: subject.division.clone(),
            code,
            name: subject.name.clone(),
            is_required: Some(subject.is_required),
            is_design: Some(subject.is_design),
            credit: subject.credit.clone(),
            professor: offering.professor,
            lecture_time: offering.lecture_time,
            classroom: offering.classroom,
            room_number: offering.room_number,
            rating: None,
        }
    }

    pub fn standalone(
        semester: String,
        division: String,
        code: String,
        name: String,
        credit: String,
        offering: Offering,
    ) -> Self {
        DetailedSubject {
            year: offering.year,
            semester,
            division,
            code,
            name,
            is_required: None,
            is_design: None,
            credit,
            professor: offering.professor,
            lecture_time: offering.lecture_time,
            classroom: offering.classroom,
            room_number: offering.room_number,
            rating: None,
        }
    }

    // Identity used against the rating table.
    pub fn rating_key(&self) -> String {
        format!("{}|{}", self.code, self.professor)
    }

    pub fn formatted_info(&self) -> String {
        let mut flags = String::new();
        if self.is_required == Some(true) {
            flags.push_str(" | 필수");
        }
        if self.is_design == Some(true) {
            flags.push_str(" | 설계");
        }
        format!(
            "[{}학년 {}] {} | {} ({}) | 학점: {}{} | 교수: {} | 시간: {} | 강의실: {} {}",
            self.year,
            self.semester,
            self.division,
            self.name,
            self.code,
            self.credit,
            flags,
            self.professor,
            self.lecture_time.replace('\n', ", "),
            self.classroom,
            self.room_number,
        )
    }

    pub fn formatted_with_rating(&self) -> String {
        format!("{} - 평점: {:.2}", self.formatted_info(), self.rating.unwrap_or(0.0))
    }
}

// Everything a single run produces, written out as one JSON document.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub subjects: Vec<Subject>,
    pub details: Vec<DetailedSubject>,
    pub searches: Vec<KeywordResult>,
}

#[derive(Debug, Serialize)]
pub struct KeywordResult {
    pub keyword: String,
    pub results: Vec<DetailedSubject>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offering() -> Offering {
        Offering {
            year: "2".to_string(),
            professor: "Kim".to_string(),
            lecture_time: "Mon 09:00\nWed 09:00".to_string(),
            classroom: "IT5".to_string(),
            room_number: "101".to_string(),
        }
    }

    #[test]
    fn semester_labels_parse_back() {
        for semester in [Semester::First, Semester::Second, Semester::Summer, Semester::Winter] {
            assert_eq!(semester.label().parse::<Semester>().unwrap(), semester);
        }
        assert!("3학기".parse::<Semester>().is_err());
    }

    #[test]
    fn detail_inherits_flags_from_subject() {
        let subject = Subject {
            year: "2".to_string(),
            semester: Semester::First,
            division: "Track A".to_string(),
            code: "CS101".to_string(),
            name: "Data Structures".to_string(),
            is_required: true,
            is_design: false,
            credit: "3".to_string(),
        };
        let detail = DetailedSubject::from_subject(&subject, "CS101".to_string(), offering());
        assert_eq!(detail.is_required, Some(true));
        assert_eq!(detail.is_design, Some(false));
        assert_eq!(detail.semester, "1학기");
        assert_eq!(detail.rating, None);
        assert_eq!(detail.rating_key(), "CS101|Kim");
    }

    #[test]
    fn unset_rating_prints_as_zero() {
        let detail = DetailedSubject::standalone(
            "2학기".to_string(),
            "Track B".to_string(),
            "CS202".to_string(),
            "Algorithms".to_string(),
            "3".to_string(),
            offering(),
        );
        assert!(detail.is_required.is_none());
        assert!(detail.formatted_with_rating().ends_with("평점: 0.00"));
        assert!(detail.formatted_info().contains("Mon 09:00, Wed 09:00"));
    }
}
