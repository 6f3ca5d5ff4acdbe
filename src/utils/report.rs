use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde_json::to_string_pretty;

use crate::models::{DetailedSubject, KeywordResult, RunReport, Subject};

pub fn print_subjects(subjects: &[Subject]) {
    println!("총 커리큘럼 과목 수: {}", subjects.len());
    for subject in subjects {
        println!("{}", subject.formatted_info());
    }
}

pub fn print_details(details: &[DetailedSubject]) {
    println!("\n=== 상세 강의계획서 정보 ===");
    for detail in details {
        println!("{}", detail.formatted_info());
    }
}

pub fn print_rated(details: &[DetailedSubject]) {
    println!("\n=== 평점 적용 결과 ===");
    for detail in details {
        println!("{}", detail.formatted_with_rating());
    }
}

pub fn print_search(result: &KeywordResult) {
    println!("\n=== 검색 결과 출력 ({}) ===", result.keyword);
    if result.results.is_empty() {
        println!("검색 결과가 없습니다.");
    }
    for detail in &result.results {
        println!("{}", detail.formatted_info());
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    fs::write(path, to_string_pretty(report)?)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("Report written to {}", path.display());
    Ok(())
}
