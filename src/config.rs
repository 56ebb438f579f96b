use crate::matcher::DEFAULT_THRESHOLD;
use crate::model::ConfigError;
use crate::parser::award::AwardList;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Scrape,
    Search,
    Refine,
    Availability,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog_host: String,
    pub match_threshold: f64,
    pub request_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub availability_concurrency: usize,
    /// Caps authors searched and books checked per run.
    pub limit: Option<usize>,
    pub roster_files: Vec<PathBuf>,
    /// Award lists the scrape stage turns into rosters.
    pub award_lists: Vec<AwardList>,
    /// Where scraped rosters are written.
    pub roster_dir: PathBuf,
    /// Only check availability for books searched under this author.
    pub author: Option<String>,
    pub database_path: PathBuf,
    pub stages: Vec<Stage>,
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_host: "westerncape.overdrive.com".to_string(),
            match_threshold: DEFAULT_THRESHOLD,
            request_interval_ms: 2000,
            request_timeout_secs: 10,
            availability_concurrency: 1,
            limit: None,
            roster_files: vec![
                PathBuf::from("data/bbc_world_book_club_authors.json"),
                PathBuf::from("data/hugo_award_authors.json"),
                PathBuf::from("data/booker_prize_authors.json"),
                PathBuf::from("data/nobel_literature_authors.json"),
            ],
            award_lists: vec![AwardList::Hugo, AwardList::Booker, AwardList::Nobel],
            roster_dir: PathBuf::from("data"),
            author: None,
            database_path: PathBuf::from("data.db"),
            stages: vec![Stage::Scrape, Stage::Search, Stage::Refine, Stage::Availability],
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AudiobookSniper/0.1".to_string(),
        }
    }
}

impl AppConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn runs(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ConfigError::Invalid(format!(
                "match_threshold must be within 0.0..=1.0, got {}",
                self.match_threshold
            )));
        }
        if self.catalog_host.trim().is_empty() {
            return Err(ConfigError::Invalid("catalog_host is empty".to_string()));
        }
        if self.availability_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "availability_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = parse_config("{}").unwrap();
        assert_eq!(cfg.catalog_host, "westerncape.overdrive.com");
        assert_eq!(cfg.match_threshold, 0.85);
        assert_eq!(cfg.request_interval(), Duration::from_secs(2));
        assert!(cfg.runs(Stage::Scrape) && cfg.runs(Stage::Search));
        assert!(cfg.runs(Stage::Refine) && cfg.runs(Stage::Availability));
        assert_eq!(cfg.limit, None);
        assert_eq!(cfg.award_lists.len(), 3);
        assert_eq!(cfg.author, None);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = parse_config(
            r#"{"match_threshold": 0.9, "stages": ["refine", "availability"], "limit": 5,
                "roster_files": ["data/hugo_award_authors.json"], "availability_concurrency": 3,
                "award_lists": ["booker"], "author": "Anna Burns"}"#,
        )
        .unwrap();
        assert_eq!(cfg.match_threshold, 0.9);
        assert!(!cfg.runs(Stage::Search));
        assert_eq!(cfg.limit, Some(5));
        assert_eq!(cfg.roster_files, vec![PathBuf::from("data/hugo_award_authors.json")]);
        assert_eq!(cfg.availability_concurrency, 3);
        assert!(!cfg.runs(Stage::Scrape));
        assert_eq!(cfg.award_lists, vec![AwardList::Booker]);
        assert_eq!(cfg.author.as_deref(), Some("Anna Burns"));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = parse_config(r#"{"match_threshold": 1.5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_stage_and_award() {
        let err = parse_config(r#"{"stages": ["notify"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        let err = parse_config(r#"{"award_lists": ["pulitzer"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
