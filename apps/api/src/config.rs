use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::analytics::blacklist::SkillBlacklist;
use crate::taxonomy::loader::LoaderSettings;

const DEFAULT_DATA_PATH: &str = "./data/esco";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub esco_data_path: PathBuf,
    pub approved_aliases_path: Option<PathBuf>,
    /// Overrides the built-in noise terms when set.
    pub skill_blacklist: Option<Vec<String>>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            esco_data_path: std::env::var("ESCO_DATA_PATH")
                .unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string())
                .into(),
            approved_aliases_path: optional_env("ESCO_APPROVED_ALIASES").map(PathBuf::from),
            skill_blacklist: optional_env("SKILL_BLACKLIST").map(|v| split_list(&v)),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            data_path: self.esco_data_path.clone(),
            approved_aliases: self.approved_aliases_path.clone(),
        }
    }

    pub fn blacklist(&self) -> SkillBlacklist {
        match &self.skill_blacklist {
            Some(terms) => SkillBlacklist::new(terms),
            None => SkillBlacklist::default(),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
