use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarassmentCategory {
    Physical,
    Verbal,
    Social,
    Cyber,
}

impl HarassmentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Verbal => "verbal",
            Self::Social => "social",
            Self::Cyber => "cyber",
        }
    }
}

impl fmt::Display for HarassmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HarassmentCategory {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "physical" => Ok(Self::Physical),
            "verbal" => Ok(Self::Verbal),
            "social" => Ok(Self::Social),
            "cyber" => Ok(Self::Cyber),
            other => Err(format!("unknown harassment category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Sometimes,
    Often,
    Always,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Sometimes => "sometimes",
            Self::Often => "often",
            Self::Always => "always",
        }
    }

    /// `often` and `always` both count as a repeated pattern.
    pub fn is_repeated(self) -> bool {
        matches!(self, Self::Often | Self::Always)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(Self::Once),
            "sometimes" => Ok(Self::Sometimes),
            "often" => Ok(Self::Often),
            "always" => Ok(Self::Always),
            other => Err(format!("unknown frequency '{other}'")),
        }
    }
}

/// Review state set by teachers. Transitions are unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "resolved" => Ok(Self::Resolved),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Reports carry frequency as `{ "value": "often" }`. A bare string is
/// accepted on input as well.
mod frequency_value {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Frequency;

    #[derive(Serialize, Deserialize)]
    struct Wrapped {
        value: Frequency,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Either {
        Wrapped(Wrapped),
        Bare(Frequency),
    }

    pub fn serialize<S: Serializer>(frequency: &Frequency, serializer: S) -> Result<S::Ok, S::Error> {
        Wrapped { value: *frequency }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Frequency, D::Error> {
        Ok(match Either::deserialize(deserializer)? {
            Either::Wrapped(wrapped) => wrapped.value,
            Either::Bare(frequency) => frequency,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmotionColor {
    Green,
    Yellow,
    Orange,
    Red,
    DarkRed,
}

impl EmotionColor {
    pub fn for_level(level: u8) -> Self {
        match level {
            0 | 1 => Self::Green,
            2 => Self::Yellow,
            3 => Self::Orange,
            4 => Self::Red,
            _ => Self::DarkRed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSelection {
    pub id: String,
    pub label: String,
    pub category: HarassmentCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMapMarker {
    pub x: f64,
    pub y: f64,
    pub body_part: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emotion {
    pub level: u8,
    pub color: EmotionColor,
}

impl Emotion {
    pub fn new(level: u8) -> Self {
        Self {
            level,
            color: EmotionColor::for_level(level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Safety {
    pub level: u8,
    #[serde(default)]
    pub feeling: String,
}

/// A submitted incident report. Only `status` and `teacher_notes` change
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub student_id: String,
    pub student_name: String,
    pub timestamp: DateTime<Utc>,
    pub symbols: Vec<SymbolSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_map: Option<Vec<BodyMapMarker>>,
    pub emotion: Emotion,
    pub location: Location,
    #[serde(with = "frequency_value")]
    pub frequency: Frequency,
    pub safety: Safety,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_notes: Option<String>,
}

impl Report {
    /// Distinct categories in the order they were first selected.
    pub fn categories(&self) -> Vec<HarassmentCategory> {
        let mut categories = Vec::new();
        for symbol in &self.symbols {
            if !categories.contains(&symbol.category) {
                categories.push(symbol.category);
            }
        }
        categories
    }

    pub fn has_category(&self, category: HarassmentCategory) -> bool {
        self.symbols.iter().any(|symbol| symbol.category == category)
    }

    pub fn body_markers(&self) -> &[BodyMapMarker] {
        self.body_map.as_deref().unwrap_or(&[])
    }

    pub fn has_body_markers(&self) -> bool {
        !self.body_markers().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(EngineError::invalid(
                self.id,
                "at least one harassment symbol is required",
            ));
        }
        if !(1..=5).contains(&self.emotion.level) {
            return Err(EngineError::invalid(
                self.id,
                format!("emotion level {} is outside 1-5", self.emotion.level),
            ));
        }
        if !(1..=5).contains(&self.safety.level) {
            return Err(EngineError::invalid(
                self.id,
                format!("safety level {} is outside 1-5", self.safety.level),
            ));
        }
        let expected_color = EmotionColor::for_level(self.emotion.level);
        if self.emotion.color != expected_color {
            return Err(EngineError::invalid(
                self.id,
                format!(
                    "emotion color {:?} does not match level {} (expected {:?})",
                    self.emotion.color, self.emotion.level, expected_color
                ),
            ));
        }
        if self.location.name.trim().is_empty() {
            return Err(EngineError::invalid(self.id, "location name is empty"));
        }
        if self.has_body_markers() && !self.has_category(HarassmentCategory::Physical) {
            return Err(EngineError::invalid(
                self.id,
                "body-map markers require a physical harassment symbol",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub summary: String,
    pub urgency: Urgency,
    pub immediate_actions: Vec<String>,
    pub short_term_actions: Vec<String>,
    pub long_term_actions: Vec<String>,
    pub resources: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: HarassmentCategory,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrequencyPattern {
    pub once: usize,
    pub sometimes: usize,
    pub often: usize,
    pub always: usize,
}

impl FrequencyPattern {
    pub fn record(&mut self, frequency: Frequency) {
        match frequency {
            Frequency::Once => self.once += 1,
            Frequency::Sometimes => self.sometimes += 1,
            Frequency::Often => self.often += 1,
            Frequency::Always => self.always += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: ReportStatus,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub is_improving: bool,
    pub is_worsening: bool,
    pub has_recurring_problems: bool,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnalysis {
    pub total_reports: usize,
    pub first_report_date: Option<DateTime<Utc>>,
    pub last_report_date: Option<DateTime<Utc>>,
    pub average_emotion_level: f64,
    pub average_safety_level: f64,
    pub most_common_categories: Vec<CategoryCount>,
    pub most_common_locations: Vec<LocationCount>,
    pub frequency_pattern: FrequencyPattern,
    pub status_history: Vec<StatusEntry>,
    pub recurring_issues: Vec<String>,
    pub trend_analysis: TrendAnalysis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: HarassmentCategory,
    pub count: usize,
    pub avg_emotion: f64,
}
