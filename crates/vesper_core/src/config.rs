use crate::error::VesperError;
use anyhow::{Context, Result};
use chrono::Weekday;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VesperConfig {
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
    pub onebot: Option<OneBotConfig>,
}

impl VesperConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: VesperConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from path; a missing file gives defaults with env overrides. A
    /// file that exists but does not parse is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            let mut cfg = Self::default();
            cfg.apply_env_overrides();
            return Ok(cfg);
        }
        Self::load(path)
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(n) = v.parse() {
                self.llm.max_tokens = n;
            }
        }
        if let Ok(v) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(n) = v.parse() {
                self.llm.temperature = n;
            }
        }
        if let Ok(v) = std::env::var("VESPER_TIMEZONE") {
            self.schedule.timezone = v;
        }
        // OneBot env overrides
        if let Ok(url) = std::env::var("ONEBOT_WS_URL") {
            let token = std::env::var("ONEBOT_ACCESS_TOKEN").ok();
            let group_id = self.onebot.as_ref().and_then(|o| o.group_id);
            self.onebot = Some(OneBotConfig {
                ws_url: url,
                access_token: token,
                group_id,
            });
        }
        if let Ok(v) = std::env::var("VESPER_GROUP_ID") {
            if let (Ok(id), Some(onebot)) = (v.parse(), self.onebot.as_mut()) {
                onebot.group_id = Some(id);
            }
        }
    }

    /// Check everything that can only be wrong at startup.
    pub fn validate(&self) -> Result<()> {
        self.schedule.tz()?;
        self.schedule.validate_intervals()?;
        for rule in &self.schedule.rules {
            rule.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// Reply length for conversational responses.
    pub max_tokens: u32,
    pub temperature: f32,
    /// Reply length for content generated when a category runs dry.
    pub content_max_tokens: u32,
    pub content_temperature: f32,
    /// "llm" asks the model for a label; "keyword" uses the local word lists.
    pub classifier: String,
    /// Upper bound on any single collaborator call.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4-turbo".to_string(),
            base_url: None,
            max_tokens: 200,
            temperature: 1.2,
            content_max_tokens: 150,
            content_temperature: 1.0,
            classifier: "llm".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub mood_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "vesper.db".to_string(),
            mood_path: "mood.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA zone name all rules are evaluated in.
    pub timezone: String,
    pub tick_interval_secs: u64,
    pub silence_check_secs: u64,
    pub rules: Vec<RuleConfig>,
}

/// Longest tick that still lands inside every rule's one-hour catch-up
/// window.
pub const MAX_TICK_SECS: u64 = 3600;

impl ScheduleConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone '{}': {}", self.timezone, e))
    }

    pub fn validate_intervals(&self) -> Result<(), VesperError> {
        let invalid = |reason: String| VesperError::InvalidSchedule {
            rule: "schedule".to_string(),
            reason,
        };
        if self.tick_interval_secs == 0 || self.tick_interval_secs > MAX_TICK_SECS {
            return Err(invalid(format!(
                "tick_interval_secs must be between 1 and {}",
                MAX_TICK_SECS
            )));
        }
        if self.silence_check_secs == 0 {
            return Err(invalid("silence_check_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            tick_interval_secs: 60,
            silence_check_secs: 3600,
            rules: default_rules(),
        }
    }
}

fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::new("morning_fire", "Morning Fire", Recurrence::Daily { hour: 8, minute: 0 }),
        RuleConfig::new(
            "before_task",
            "Before Task",
            Recurrence::HourWindow { start_hour: 14, end_hour: 15 },
        ),
        RuleConfig::new(
            "weekly_devotion",
            "Devotion",
            Recurrence::Weekly { weekday: Weekday::Sun, hour: 23, minute: 0 },
        ),
        RuleConfig::new(
            "surprise_summons",
            "Surprise Summons",
            Recurrence::MultiDrop {
                start_hour: 16,
                window_minutes: 720,
                min_drops: 1,
                max_drops: 3,
            },
        ),
        RuleConfig {
            prefix: Some("💻 Midnight Wisdom Drop:".to_string()),
            ..RuleConfig::new("tech_tip", "Tech Tips", Recurrence::Daily { hour: 2, minute: 0 })
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub category: String,
    /// Line placed above the picked text.
    #[serde(default)]
    pub prefix: Option<String>,
    pub recurrence: Recurrence,
}

impl RuleConfig {
    pub fn new(name: &str, category: &str, recurrence: Recurrence) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            prefix: None,
            recurrence,
        }
    }

    pub fn validate(&self) -> Result<(), VesperError> {
        let invalid = |reason: &str| VesperError::InvalidSchedule {
            rule: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.category.trim().is_empty() {
            return Err(invalid("category is empty"));
        }
        match self.recurrence {
            Recurrence::Daily { hour, minute } | Recurrence::Weekly { hour, minute, .. } => {
                if hour > 23 || minute > 59 {
                    return Err(invalid("time of day out of range"));
                }
            }
            Recurrence::HourWindow { start_hour, end_hour } => {
                if start_hour > 23 || end_hour > 24 || start_hour >= end_hour {
                    return Err(invalid("hour window must satisfy start < end <= 24"));
                }
            }
            Recurrence::MultiDrop {
                start_hour,
                window_minutes,
                min_drops,
                max_drops,
            } => {
                if start_hour > 23 {
                    return Err(invalid("start hour out of range"));
                }
                if window_minutes == 0 || window_minutes > 24 * 60 {
                    return Err(invalid("window must be between 1 and 1440 minutes"));
                }
                if min_drops == 0 || min_drops > max_drops {
                    return Err(invalid("drop count must satisfy 1 <= min <= max"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Once a day at `hour:minute`, or on the first tick within the hour
    /// after it.
    Daily { hour: u32, minute: u32 },
    /// Once a week on `weekday`, with the same catch-up as `Daily`.
    Weekly { weekday: Weekday, hour: u32, minute: u32 },
    /// Once a day, on the first tick inside `[start_hour, end_hour)`.
    HourWindow { start_hour: u32, end_hour: u32 },
    /// 1..N random drops inside a daily window.
    MultiDrop {
        start_hour: u32,
        window_minutes: u32,
        min_drops: u32,
        max_drops: u32,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneBotConfig {
    pub ws_url: String,
    pub access_token: Option<String>,
    /// Group the bot posts to and listens in.
    #[serde(default)]
    pub group_id: Option<i64>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = VesperConfig::default();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.max_tokens, 200);
        assert_eq!(cfg.schedule.timezone, "America/New_York");
        assert_eq!(cfg.schedule.rules.len(), 5);
        assert!(cfg.onebot.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_default_tech_tip_has_prefix() {
        let cfg = VesperConfig::default();
        let rule = cfg
            .schedule
            .rules
            .iter()
            .find(|r| r.name == "tech_tip")
            .unwrap();
        assert_eq!(rule.recurrence, Recurrence::Daily { hour: 2, minute: 0 });
        assert!(rule.prefix.as_deref().unwrap().contains("Midnight Wisdom"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[llm]
model = "gpt-4o-mini"
"#;
        let cfg: VesperConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        // Defaults for unspecified fields
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.storage.db_path, "vesper.db");
        assert_eq!(cfg.schedule.rules.len(), 5);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[llm]
provider = "mock"
model = "test"
max_tokens = 120
temperature = 0.9
classifier = "keyword"
timeout_secs = 5

[storage]
db_path = "data/vesper.db"
mood_path = "data/mood.json"

[schedule]
timezone = "Europe/London"
tick_interval_secs = 30
silence_check_secs = 600

[[schedule.rules]]
name = "sunday"
category = "Devotion"
recurrence = { kind = "weekly", weekday = "Sunday", hour = 23, minute = 0 }

[[schedule.rules]]
name = "evening"
category = "Surprise Summons"
prefix = "Hey."
recurrence = { kind = "multi_drop", start_hour = 16, window_minutes = 720, min_drops = 1, max_drops = 3 }

[onebot]
ws_url = "ws://localhost:8080"
access_token = "secret"
group_id = 12345
"#;
        let cfg: VesperConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.llm.classifier, "keyword");
        assert_eq!(cfg.storage.mood_path, "data/mood.json");
        assert_eq!(cfg.schedule.tick_interval_secs, 30);
        assert_eq!(cfg.schedule.rules.len(), 2);
        assert_eq!(
            cfg.schedule.rules[0].recurrence,
            Recurrence::Weekly { weekday: Weekday::Sun, hour: 23, minute: 0 }
        );
        assert_eq!(cfg.schedule.rules[1].prefix.as_deref(), Some("Hey."));
        let onebot = cfg.onebot.as_ref().unwrap();
        assert_eq!(onebot.ws_url, "ws://localhost:8080");
        assert_eq!(onebot.group_id, Some(12345));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let bad = [
            RuleConfig::new("a", "X", Recurrence::Daily { hour: 24, minute: 0 }),
            RuleConfig::new("b", "X", Recurrence::HourWindow { start_hour: 15, end_hour: 14 }),
            RuleConfig::new(
                "c",
                "X",
                Recurrence::MultiDrop { start_hour: 16, window_minutes: 720, min_drops: 3, max_drops: 1 },
            ),
            RuleConfig::new("d", "  ", Recurrence::Daily { hour: 1, minute: 0 }),
        ];
        for rule in bad {
            let err = rule.validate().unwrap_err();
            assert!(matches!(err, VesperError::InvalidSchedule { .. }), "{}", rule.name);
        }
    }

    #[test]
    fn test_interval_bounds_enforced() {
        for (tick, silence) in [(0, 3600), (MAX_TICK_SECS + 1, 3600), (60, 0)] {
            let mut cfg = VesperConfig::default();
            cfg.schedule.tick_interval_secs = tick;
            cfg.schedule.silence_check_secs = silence;
            let err = cfg.validate().unwrap_err();
            assert!(
                matches!(err.downcast_ref::<VesperError>(), Some(VesperError::InvalidSchedule { .. })),
                "tick={} silence={}",
                tick,
                silence
            );
        }

        let mut cfg = VesperConfig::default();
        cfg.schedule.tick_interval_secs = MAX_TICK_SECS;
        cfg.schedule.silence_check_secs = 1;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_unknown_timezone_fails_validation() {
        let mut cfg = VesperConfig::default();
        cfg.schedule.timezone = "Mars/Olympus".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        // Part 1: env overrides
        std::env::set_var("LLM_PROVIDER", "mock");
        std::env::set_var("LLM_MODEL", "gpt-4o");
        std::env::set_var("ONEBOT_WS_URL", "ws://127.0.0.1:3001");
        std::env::set_var("VESPER_GROUP_ID", "777");

        let mut cfg = VesperConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.llm.model, "gpt-4o");
        let onebot = cfg.onebot.as_ref().unwrap();
        assert_eq!(onebot.ws_url, "ws://127.0.0.1:3001");
        assert_eq!(onebot.group_id, Some(777));

        // Clean up env vars before testing defaults
        std::env::remove_var("LLM_PROVIDER");
        std::env::remove_var("LLM_MODEL");
        std::env::remove_var("ONEBOT_WS_URL");
        std::env::remove_var("VESPER_GROUP_ID");

        // Part 2: nonexistent path returns defaults (no env interference)
        let cfg = VesperConfig::load_or_default("/nonexistent/path.toml").unwrap();
        assert_eq!(cfg.llm.provider, "openai");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vesper.toml");
        std::fs::write(&path, "[schedule\ntick_interval_secs = 60\n").unwrap();
        let err = VesperConfig::load_or_default(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse TOML config"));
    }
}
