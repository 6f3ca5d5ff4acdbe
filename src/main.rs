mod config;
mod models;
mod utils;

use anyhow::{anyhow, Result};
use dotenv::dotenv;
use log::{error, info};
use simplelog::{ColorChoice, Config as LogConfig, LevelFilter, TermLogger, TerminalMode};

use crate::config::Config;
use crate::models::{KeywordResult, RunReport};
use crate::utils::curriculum::{filter_subjects, parse_curriculum, retrieve_curriculum, tab_for_admission_year};
use crate::utils::lecture::LecturePlan;
use crate::utils::rating::{apply_ratings, load_ratings};
use crate::utils::report::{print_details, print_rated, print_search, print_subjects, write_report};
use crate::utils::snapshot::SnapshotSource;

#[tokio::main]
async fn main() {
    // Loads environment variables from a `.env` file, if present.
    dotenv().ok();

    let config = Config::from_env();
    let level = config.as_ref().map(|c| c.log_level).unwrap_or(LevelFilter::Info);
    if let Err(e) = TermLogger::init(level, LogConfig::default(), TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("Logger unavailable: {}", e);
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

// Only a saved grid dump can stand in for the lecture-plan page; without one there is nothing to scan.
fn open_lecture_plan(config: &Config) -> Result<SnapshotSource> {
    let path = config
        .lecture_plan_file
        .as_ref()
        .ok_or_else(|| anyhow!("No lecture-plan source available, set LECTURE_PLAN_FILE"))?;
    SnapshotSource::open(path, config.layout.clone(), config.viewport)
}

async fn run(config: &Config) -> Result<()> {
    let mut source = open_lecture_plan(config)?;

    let html = retrieve_curriculum(config).await?;
    info!("Curriculum retrieved successfully");

    let subjects = parse_curriculum(&html, tab_for_admission_year(&config.admission_year))?;
    print_subjects(&subjects);

    let filtered = filter_subjects(&subjects, &config.grade, config.semester);
    println!("선택한 {}학년 {} 과목 수: {}", config.grade, config.semester, filtered.len());
    if filtered.is_empty() {
        info!("No subjects for grade {} {}", config.grade, config.semester);
        return Ok(());
    }

    let plan = LecturePlan {
        opening_year: &config.opening_year,
        semester: config.semester,
        layout: &config.layout,
        settings: &config.scan,
        policy: config.policy,
    };

    let details = plan.fetch_details(&mut source, &filtered).await?;
    print_details(&details);

    let ratings = load_ratings(&config.rating_file)?;
    let details = apply_ratings(details, &ratings);
    print_rated(&details);

    let mut searches = Vec::new();
    for keyword in &config.keywords {
        let results = plan.search_keyword(&mut source, keyword).await?;
        let result = KeywordResult { keyword: keyword.clone(), results };
        print_search(&result);
        searches.push(result);
    }

    if let Some(path) = &config.output_file {
        write_report(path, &RunReport { subjects, details, searches })?;
    }
    Ok(())
}
