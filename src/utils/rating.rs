use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::models::DetailedSubject;

/// Parses `code|professor=score` lines.
///
/// Blank lines and `#` comments are ignored; lines that don't fit the grammar
/// are logged and skipped so a partly broken file still rates what it can.
pub fn parse_ratings(content: &str) -> HashMap<String, f64> {
    let mut ratings = HashMap::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, score)) = line.rsplit_once('=') else {
            warn!("Rating line {} has no '=', skipped: {}", number + 1, line);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            warn!("Rating line {} has an empty key, skipped", number + 1);
            continue;
        }
        match score.trim().parse::<f64>() {
            Ok(score) if score.is_finite() => {
                ratings.insert(key.to_string(), score);
            }
            _ => warn!("Rating line {} has an unreadable score, skipped: {}", number + 1, line),
        }
    }
    ratings
}

// A missing file means nothing is rated yet, not a failed run.
pub fn load_ratings(path: &Path) -> Result<HashMap<String, f64>> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let ratings = parse_ratings(&content);
            info!("Loaded {} ratings from {}", ratings.len(), path.display());
            Ok(ratings)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Rating file {} not found, no ratings applied", path.display());
            Ok(HashMap::new())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read rating file {}", path.display())),
    }
}

pub fn apply_ratings(subjects: Vec<DetailedSubject>, ratings: &HashMap<String, f64>) -> Vec<DetailedSubject> {
    subjects
        .into_iter()
        .map(|mut subject| {
            if let Some(&score) = ratings.get(&subject.rating_key()) {
                subject.rating = Some(score);
            }
            subject
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Offering;

    fn detail(code: &str, professor: &str) -> DetailedSubject {
        DetailedSubject::standalone(
            "1학기".to_string(),
            "Track A".to_string(),
            code.to_string(),
            "Course".to_string(),
            "3".to_string(),
            Offering {
                year: "2".to_string(),
                professor: professor.to_string(),
                lecture_time: "월".to_string(),
                classroom: "IT5".to_string(),
                room_number: "101".to_string(),
            },
        )
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let ratings = parse_ratings(
            "# course ratings\n\nCS101|Kim=4.5\nno separator here\n=3.0\nCS202|Lee=great\nCS303|Park = 3.25 \n",
        );
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings["CS101|Kim"], 4.5);
        assert_eq!(ratings["CS303|Park"], 3.25);
    }

    #[test]
    fn merge_keeps_order_and_defaults() {
        let ratings = parse_ratings("CS202|Lee=3.5\n");
        let merged = apply_ratings(vec![detail("CS101", "Kim"), detail("CS202", "Lee"), detail("CS303", "Park")], &ratings);
        assert_eq!(
            merged.iter().map(|d| d.code.as_str()).collect::<Vec<_>>(),
            vec!["CS101", "CS202", "CS303"]
        );
        assert_eq!(merged[0].rating, None);
        assert_eq!(merged[1].rating, Some(3.5));
        assert_eq!(merged[2].rating, None);
    }

    #[test]
    fn missing_file_yields_no_ratings() {
        let ratings = load_ratings(Path::new("definitely/not/here/course_rating.txt")).unwrap();
        assert!(ratings.is_empty());
    }
}
