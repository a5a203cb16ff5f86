use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "resultsd.toml";

/// Per-workspace settings. Every field has a default, so a missing or partial
/// `resultsd.toml` is fine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database_file: String,
    pub reports_dir: String,
    pub student_id_length: usize,
    pub staff_id_length: usize,
    pub pin_length: usize,
    pub default_credits: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_file: "results.sqlite3".to_string(),
            reports_dir: "reports".to_string(),
            student_id_length: 8,
            staff_id_length: 8,
            pin_length: 5,
            default_credits: 3,
        }
    }
}

impl Config {
    pub fn load(workspace: &Path) -> anyhow::Result<Self> {
        let path = workspace.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let cfg: Config = toml::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !crate::grade::CREDIT_RANGE.contains(&self.default_credits) {
            anyhow::bail!(
                "default_credits must be between 1 and 3 (got {})",
                self.default_credits
            );
        }
        if self.student_id_length == 0 || self.staff_id_length == 0 || self.pin_length == 0 {
            anyhow::bail!("id and pin lengths must be positive");
        }
        if self.database_file.trim().is_empty() {
            anyhow::bail!("database_file must not be empty");
        }
        Ok(())
    }
}
