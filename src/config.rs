use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use simplelog::LevelFilter;
use url::Url;

use crate::models::Semester;
use crate::utils::grid::ScanSettings;
use crate::utils::layout::GridLayout;
use crate::utils::lecture::ScanPolicy;
use crate::utils::snapshot::Viewport;

const DEFAULT_CURRICULUM_URL: &str = "https://cse.knu.ac.kr/sub3_2_b.php";
const DEFAULT_RATING_FILE: &str = "course_rating.txt";

#[derive(Debug, Clone, PartialEq)]
pub enum CurriculumSource {
    Url(Url),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub admission_year: String,
    pub curriculum: CurriculumSource,
    pub lecture_plan_file: Option<PathBuf>,
    pub opening_year: String,
    pub grade: String,
    pub semester: Semester,
    pub keywords: Vec<String>,
    pub rating_file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub log_level: LevelFilter,
    pub layout: GridLayout,
    pub scan: ScanSettings,
    pub policy: ScanPolicy,
    pub viewport: Viewport,
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String> {
        self.optional(name)
            .ok_or_else(|| anyhow!("{} environment variable not found", name))
    }

    fn parsed<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow!("Invalid value for {}: {} ({})", name, raw, e)),
            None => Ok(default),
        }
    }

    // Heights and scroll distances divide or advance the scan; zero, negative or NaN would stall it.
    fn positive(&self, name: &str, default: f64) -> Result<f64> {
        let value = self.parsed(name, default)?;
        if !(value.is_finite() && value > 0.0) {
            return Err(anyhow!("Invalid value for {}: {} (must be a positive number)", name, value));
        }
        Ok(value)
    }

    fn layout(&self) -> Result<GridLayout> {
        let d = GridLayout::default();
        Ok(GridLayout {
            semester: self.parsed("GRID_COL_SEMESTER", d.semester)?,
            year: self.parsed("GRID_COL_YEAR", d.year)?,
            division: self.parsed("GRID_COL_DIVISION", d.division)?,
            code: self.parsed("GRID_COL_CODE", d.code)?,
            name: self.parsed("GRID_COL_NAME", d.name)?,
            credit: self.parsed("GRID_COL_CREDIT", d.credit)?,
            professor: self.parsed("GRID_COL_PROFESSOR", d.professor)?,
            time: self.parsed("GRID_COL_TIME", d.time)?,
            classroom: self.parsed("GRID_COL_CLASSROOM", d.classroom)?,
            room: self.parsed("GRID_COL_ROOM", d.room)?,
            min_cells: self.parsed("GRID_MIN_CELLS", d.min_cells)?,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Config> {
        let vars = Vars { lookup };

        let curriculum = match vars.optional("CURRICULUM_FILE") {
            Some(path) => CurriculumSource::File(PathBuf::from(path)),
            None => {
                let raw = vars
                    .optional("CURRICULUM_URL")
                    .unwrap_or_else(|| DEFAULT_CURRICULUM_URL.to_string());
                CurriculumSource::Url(Url::parse(&raw).with_context(|| format!("Invalid CURRICULUM_URL {}", raw))?)
            }
        };

        let policy = match vars.optional("SCAN_TERMINATION").as_deref() {
            None | Some("legacy") => ScanPolicy::Legacy,
            Some("unified") => ScanPolicy::Unified,
            Some(other) => return Err(anyhow!("Invalid value for SCAN_TERMINATION: {}", other)),
        };

        let scan_defaults = ScanSettings::default();
        let viewport_defaults = Viewport::default();

        Ok(Config {
            admission_year: vars.required("ADMISSION_YEAR")?,
            curriculum,
            lecture_plan_file: vars.optional("LECTURE_PLAN_FILE").map(PathBuf::from),
            opening_year: vars.required("OPENING_YEAR")?,
            grade: vars.required("GRADE")?,
            semester: vars.required("SEMESTER")?.parse()?,
            keywords: vars
                .optional("SEARCH_KEYWORDS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            rating_file: PathBuf::from(
                vars.optional("RATING_FILE").unwrap_or_else(|| DEFAULT_RATING_FILE.to_string()),
            ),
            output_file: vars.optional("OUTPUT_FILE").map(PathBuf::from),
            log_level: vars.parsed("LOG_LEVEL", LevelFilter::Info)?,
            layout: vars.layout()?,
            scan: ScanSettings {
                settle: Duration::from_millis(
                    vars.parsed("SETTLE_DELAY_MS", scan_defaults.settle.as_millis() as u64)?,
                ),
                increment: vars.positive("SCROLL_INCREMENT", scan_defaults.increment)?,
                step: vars.positive("SEARCH_SCROLL_STEP", scan_defaults.step)?,
            },
            policy,
            viewport: Viewport {
                row_height: vars.positive("GRID_ROW_HEIGHT", viewport_defaults.row_height)?,
                client_height: vars.positive("GRID_CLIENT_HEIGHT", viewport_defaults.client_height)?,
                loading_row: vars.parsed("GRID_LOADING_ROW", viewport_defaults.loading_row)?,
            },
        })
    }
}
