use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Deadlines that cannot be parsed are treated as this many days out, so
/// ongoing listings sort behind dated ones but are never considered expired.
pub const FAR_FUTURE_DAYS: i64 = 365;

/// Eligibility constraints declared by a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Eligibility {
    /// US states the listing is restricted to, empty = unrestricted
    #[serde(default)]
    pub states: Vec<String>,
    /// Citizenship requirement, e.g. "US" or "international"
    #[serde(default)]
    pub citizenship: Option<String>,
    /// Explicit academic levels, e.g. "undergraduate"
    #[serde(default)]
    pub grades_eligible: Vec<String>,
}

/// A time-bounded listing: scholarship, hackathon, bounty, or competition.
///
/// Inbound payloads are sparse, so every field except `id` decodes from a
/// missing value. The `match_*` fields are assigned by the matching engine
/// and are zero/`None` until an item has been ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    /// Identity within a single session
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub description: String,
    /// Award amount in dollars, 0 when unknown
    #[serde(default)]
    pub amount: f64,
    /// Human-readable amount fallback, e.g. "Up to $5,000"
    #[serde(default)]
    pub amount_display: String,
    /// ISO date, or a sentinel ("Ongoing", "TBD", "Unknown", empty)
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub eligibility: Eligibility,
    /// Geographic hints, e.g. "global", "remote"
    #[serde(default)]
    pub geo_tags: Vec<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Originating platform, e.g. "devpost", "kaggle"
    #[serde(default)]
    pub source_type: Option<String>,
    /// ISO timestamp of first discovery
    #[serde(default)]
    pub discovered_at: String,

    // Assigned by the matching engine
    #[serde(default)]
    pub match_score: i32,
    #[serde(default)]
    pub match_tier: Option<MatchTier>,
    #[serde(default)]
    pub priority_level: Option<PriorityLevel>,
    #[serde(default)]
    pub match_explanation: Option<String>,
}

impl Opportunity {
    /// Days until the deadline; negative when past
    pub fn days_until_deadline(&self) -> i64 {
        days_until_deadline(&self.deadline)
    }

    pub fn is_expired(&self) -> bool {
        self.days_until_deadline() < 0
    }
}

/// Days between today and an ISO deadline string.
///
/// Missing, sentinel ("Ongoing"/"TBD"/"Unknown") and unparseable deadlines
/// resolve to [`FAR_FUTURE_DAYS`] so they never count as expired.
pub fn days_until_deadline(deadline: &str) -> i64 {
    let trimmed = deadline.trim();
    if trimmed.is_empty() {
        return FAR_FUTURE_DAYS;
    }
    match trimmed.to_lowercase().as_str() {
        "ongoing" | "tbd" | "unknown" => return FAR_FUTURE_DAYS,
        _ => {}
    }

    let today = Utc::now().date_naive();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return (date - today).num_days();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return (dt.date_naive() - today).num_days();
    }

    FAR_FUTURE_DAYS
}

/// Parse an ISO timestamp, tolerating bare dates
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Coarse match-quality bucket derived from the match score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Excellent,
    Good,
    Potential,
    Low,
}

impl MatchTier {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 85 => MatchTier::Excellent,
            s if s >= 70 => MatchTier::Good,
            s if s >= 50 => MatchTier::Potential,
            _ => MatchTier::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Excellent => "excellent",
            MatchTier::Good => "good",
            MatchTier::Potential => "potential",
            MatchTier::Low => "low",
        }
    }
}

/// Coarse urgency bucket derived from deadline proximity and match score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Urgent,
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    pub fn from_deadline_and_score(days_until: i64, score: i32) -> Self {
        if days_until <= 7 && score >= 60 {
            PriorityLevel::Urgent
        } else if days_until <= 14 || score >= 80 {
            PriorityLevel::High
        } else if days_until <= 30 || score >= 60 {
            PriorityLevel::Medium
        } else {
            PriorityLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Urgent => "urgent",
            PriorityLevel::High => "high",
            PriorityLevel::Medium => "medium",
            PriorityLevel::Low => "low",
        }
    }
}

/// Listing category inferred by the feed pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityKind {
    Scholarship,
    Hackathon,
    Bounty,
    Competition,
}

impl OpportunityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityKind::Scholarship => "scholarship",
            OpportunityKind::Hackathon => "hackathon",
            OpportunityKind::Bounty => "bounty",
            OpportunityKind::Competition => "competition",
        }
    }
}

/// Per-factor score decomposition, recomputed on every scoring call.
///
/// Each sub-score is an integer number of points out of that factor's weight;
/// `total` is their sum, always in 0..=100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub eligibility: i32,
    pub interests: i32,
    pub location: i32,
    pub urgency: i32,
    pub value: i32,
    pub effort: i32,
    pub total: i32,
    pub explanation: String,
}

impl ScoreBreakdown {
    /// All-zero breakdown used for expired or hard-rejected listings
    pub fn zero(explanation: impl Into<String>) -> Self {
        Self {
            eligibility: 0,
            interests: 0,
            location: 0,
            urgency: 0,
            value: 0,
            effort: 0,
            total: 0,
            explanation: explanation.into(),
        }
    }
}

/// Scoring input: who the user is. Every field is optional; each scoring
/// sub-function defines a neutral default when its inputs are absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub interests: Vec<String>,
    /// e.g. "High School", "Undergraduate", "Graduate"
    #[serde(default)]
    pub academic_status: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Dollars of funding sought, 0 = unspecified
    #[serde(default)]
    pub financial_need: f64,
    /// e.g. "A few hours", "Weekends", "Flexible"
    #[serde(default)]
    pub time_commitment: Option<String>,
    /// e.g. "Urgent Funding", "Long-term Planning"
    #[serde(default)]
    pub motivation: Vec<String>,
}
