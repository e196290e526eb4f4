//! Display-facing helpers: deadline presentation, freshness, apply-URL
//! normalization, and the user-selectable sort and tab filters.

use chrono::Utc;
use serde::Serialize;
use url::Url;

use matching_core::{days_until_deadline, parse_timestamp, Opportunity, FAR_FUTURE_DAYS};

/// Hours after discovery during which an item counts as new
const FRESHNESS_WINDOW_HOURS: i64 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineUrgency {
    Urgent,
    Soon,
    Normal,
}

/// Presentation summary for a deadline string
#[derive(Debug, Clone, Serialize)]
pub struct DeadlineInfo {
    pub urgency: DeadlineUrgency,
    pub formatted_date: String,
    pub countdown: String,
    pub days_until: i64,
}

/// Summarize a deadline for display. Missing or sentinel deadlines get
/// honest "see listing" messaging instead of a fabricated date.
pub fn deadline_info(deadline: &str) -> DeadlineInfo {
    let trimmed = deadline.trim();
    let is_sentinel = trimmed.is_empty()
        || matches!(
            trimmed.to_lowercase().as_str(),
            "ongoing" | "tbd" | "unknown"
        );

    if is_sentinel {
        return DeadlineInfo {
            urgency: DeadlineUrgency::Normal,
            formatted_date: "See listing".to_string(),
            countdown: "Check details".to_string(),
            days_until: FAR_FUTURE_DAYS,
        };
    }

    let days_until = days_until_deadline(trimmed);
    let date = parse_timestamp(trimmed)
        .map(|dt| dt.date_naive())
        .unwrap_or_else(|| Utc::now().date_naive());

    let urgency = if days_until < 7 {
        DeadlineUrgency::Urgent
    } else if days_until < 30 {
        DeadlineUrgency::Soon
    } else {
        DeadlineUrgency::Normal
    };

    let countdown = if days_until > 0 {
        let unit = if days_until == 1 { "day" } else { "days" };
        format!("Due in {days_until} {unit}")
    } else if days_until == 0 {
        "Due today!".to_string()
    } else {
        "Deadline passed".to_string()
    };

    DeadlineInfo {
        urgency,
        formatted_date: date.format("%B %-d, %Y").to_string(),
        countdown,
        days_until,
    }
}

/// Whether an item was discovered within the freshness window.
/// 72 hours lets a twice-a-week visitor still see items marked new.
pub fn is_new(discovered_at: &str) -> bool {
    match parse_timestamp(discovered_at) {
        Some(at) => (Utc::now() - at).num_hours() < FRESHNESS_WINDOW_HOURS,
        None => false,
    }
}

/// Normalize stored application URLs so the public-facing page opens even
/// when the dataset holds a stale or auth-gated variant.
///
/// Covered fixes:
/// - DevPost path URLs (`devpost.com/hackathons/<slug>`) 404; canonical pages
///   live on per-event subdomains.
/// - Superteam Earn listings live under `/listing/<slug>` (singular, no
///   trailing slash), not `/listings/...` or `/bounties/...`.
/// - `app.intigriti.com` program pages are often auth-gated; the public pages
///   are on `www.intigriti.com`.
pub fn normalize_apply_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "#".to_string();
    }
    if !trimmed.starts_with("http") {
        return trimmed.to_string();
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => return trimmed.to_string(),
    };
    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase().replace("www.", ""),
        None => return trimmed.to_string(),
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if host == "devpost.com" {
        if let ["hackathons", slug] = segments.as_slice() {
            return format!("https://{slug}.devpost.com/");
        }
        return trimmed.to_string();
    }

    if host == "earn.superteam.fun" {
        if let [kind, slug] = segments.as_slice() {
            if matches!(*kind, "listings" | "listing" | "bounties" | "projects") {
                return format!("https://earn.superteam.fun/listing/{slug}");
            }
        }
        return trimmed.to_string();
    }

    if host == "app.intigriti.com" || host == "intigriti.com" {
        let programs = match segments.as_slice() {
            ["researchers", rest @ ..] => rest,
            rest => rest,
        };
        let trimmed_detail = match programs {
            [head @ .., "detail"] => head,
            other => other,
        };
        if let ["programs", company, program] = trimmed_detail {
            return format!("https://www.intigriti.com/programs/{company}/{program}");
        }
        return "https://www.intigriti.com/programs".to_string();
    }

    trimmed.to_string()
}

/// User-selectable list orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    BestMatch,
    Deadline,
    AmountHigh,
    AmountLow,
    Newest,
}

pub fn sort_opportunities(mut items: Vec<Opportunity>, key: SortKey) -> Vec<Opportunity> {
    match key {
        SortKey::BestMatch => {
            items.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        }
        SortKey::Deadline => {
            // Undated listings sort last
            items.sort_by(|a, b| {
                let a_date = parse_timestamp(&a.deadline);
                let b_date = parse_timestamp(&b.deadline);
                match (a_date, b_date) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            });
        }
        SortKey::AmountHigh => {
            items.sort_by(|a, b| {
                b.amount
                    .partial_cmp(&a.amount)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        SortKey::AmountLow => {
            items.sort_by(|a, b| {
                a.amount
                    .partial_cmp(&b.amount)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        SortKey::Newest => {
            items.sort_by(|a, b| {
                let a_ts = parse_timestamp(&a.discovered_at);
                let b_ts = parse_timestamp(&b.discovered_at);
                b_ts.cmp(&a_ts)
            });
        }
    }
    items
}

/// Preset list filters offered as tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTab {
    All,
    HighPriority,
    ClosingSoon,
    HighValue,
    BestMatch,
}

pub fn filter_by_tab(items: Vec<Opportunity>, tab: FeedTab) -> Vec<Opportunity> {
    match tab {
        FeedTab::All => items,
        FeedTab::HighPriority => items
            .into_iter()
            .filter(|o| o.match_score > 70 || days_until_deadline(&o.deadline) < 30)
            .collect(),
        FeedTab::ClosingSoon => items
            .into_iter()
            .filter(|o| days_until_deadline(&o.deadline) < 30)
            .collect(),
        FeedTab::HighValue => items.into_iter().filter(|o| o.amount > 10_000.0).collect(),
        FeedTab::BestMatch => items.into_iter().filter(|o| o.match_score > 80).collect(),
    }
}
