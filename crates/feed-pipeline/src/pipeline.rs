//! Filter, sort, and categorize the merged pool into the displayed view.

use std::collections::HashSet;

use serde::Serialize;
use url::Url;

use matching_core::{
    days_until_deadline, Opportunity, OpportunityKind, PriorityLevel, UserProfile,
};

use crate::display::is_new;

/// How broad a geographic net the user has selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationScope {
    #[default]
    All,
    Local,
    Regional,
    National,
    International,
}

/// Active display filters
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    /// Case-insensitive substring over name/organization/description/tags
    pub search: Option<String>,
    pub location_scope: LocationScope,
    /// Platform or domain selector, e.g. "devpost.com" or "kaggle"
    pub source_scope: Option<String>,
}

/// Ordered, bucketed output handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct FeedView {
    pub all: Vec<Opportunity>,
    /// Urgent priority, or due within 7 days and not past
    pub urgent: Vec<Opportunity>,
    /// Match score of 85 or higher
    pub high_match: Vec<Opportunity>,
    pub by_type: FeedBuckets,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedBuckets {
    pub scholarships: Vec<Opportunity>,
    pub hackathons: Vec<Opportunity>,
    pub bounties: Vec<Opportunity>,
    pub competitions: Vec<Opportunity>,
}

/// Run the full display pipeline over an already-ranked pool:
/// search, location scope, source scope, defensive dedup, freshness boost,
/// then categorization and the derived urgent/high-match views.
pub fn process(pool: Vec<Opportunity>, profile: &UserProfile, filter: &FeedFilter) -> FeedView {
    let mut filtered = pool;

    if let Some(query) = filter.search.as_deref() {
        let query = query.trim().to_lowercase();
        if !query.is_empty() {
            filtered.retain(|opp| matches_search(opp, &query));
        }
    }

    if filter.location_scope != LocationScope::All {
        filtered.retain(|opp| matches_location(opp, filter.location_scope, profile));
    }

    if let Some(scope) = filter.source_scope.as_deref() {
        let domain = scope.trim().to_lowercase().replace("www.", "");
        if !domain.is_empty() {
            filtered.retain(|opp| matches_source(opp, &domain));
        }
    }

    // Upstream identity can miss near-duplicates with divergent metadata,
    // so dedup once more by id and by normalized name.
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    filtered.retain(|opp| {
        let name = opp.name.trim().to_lowercase();
        if seen_ids.contains(&opp.id) || (!name.is_empty() && seen_names.contains(&name)) {
            return false;
        }
        seen_ids.insert(opp.id.clone());
        if !name.is_empty() {
            seen_names.insert(name);
        }
        true
    });

    let filtered = freshness_boost(filtered);

    let mut buckets = FeedBuckets {
        scholarships: Vec::new(),
        hackathons: Vec::new(),
        bounties: Vec::new(),
        competitions: Vec::new(),
    };
    for opp in &filtered {
        match infer_kind(opp) {
            OpportunityKind::Hackathon => buckets.hackathons.push(opp.clone()),
            OpportunityKind::Bounty => buckets.bounties.push(opp.clone()),
            OpportunityKind::Competition => buckets.competitions.push(opp.clone()),
            OpportunityKind::Scholarship => buckets.scholarships.push(opp.clone()),
        }
    }

    let urgent = filtered
        .iter()
        .filter(|opp| {
            if opp.priority_level == Some(PriorityLevel::Urgent) {
                return true;
            }
            let days = days_until_deadline(&opp.deadline);
            (0..7).contains(&days)
        })
        .cloned()
        .collect();

    let high_match = filtered
        .iter()
        .filter(|opp| opp.match_score >= 85)
        .cloned()
        .collect();

    FeedView {
        all: filtered,
        urgent,
        high_match,
        by_type: buckets,
    }
}

/// Classify a listing into exactly one kind.
///
/// Explicit source platform wins; otherwise keyword precedence over the
/// combined tags/description/name text: hackathon > bounty > competition,
/// scholarship as the default.
pub fn infer_kind(opp: &Opportunity) -> OpportunityKind {
    if let Some(source_type) = opp.source_type.as_deref() {
        match source_type.to_lowercase().as_str() {
            "devpost" | "mlh" => return OpportunityKind::Hackathon,
            "gitcoin" => return OpportunityKind::Bounty,
            "kaggle" => return OpportunityKind::Competition,
            _ => {}
        }
    }

    let combined = format!(
        "{} {} {}",
        opp.tags.join(" ").to_lowercase(),
        opp.description.to_lowercase(),
        opp.name.to_lowercase()
    );

    if combined.contains("hackathon") || combined.contains("hack ") || combined.contains("devpost")
    {
        OpportunityKind::Hackathon
    } else if combined.contains("bounty")
        || combined.contains("bug bounty")
        || combined.contains("security")
        || combined.contains("gitcoin")
    {
        OpportunityKind::Bounty
    } else if combined.contains("competition")
        || combined.contains("contest")
        || combined.contains("kaggle")
        || combined.contains("challenge")
    {
        OpportunityKind::Competition
    } else {
        OpportunityKind::Scholarship
    }
}

fn matches_search(opp: &Opportunity, query: &str) -> bool {
    opp.name.to_lowercase().contains(query)
        || opp.organization.to_lowercase().contains(query)
        || opp.description.to_lowercase().contains(query)
        || opp.tags.iter().any(|tag| tag.to_lowercase().contains(query))
}

fn matches_location(opp: &Opportunity, scope: LocationScope, profile: &UserProfile) -> bool {
    let states: Vec<String> = opp
        .eligibility
        .states
        .iter()
        .map(|s| s.to_lowercase())
        .collect();
    let citizenship = opp
        .eligibility
        .citizenship
        .as_deref()
        .unwrap_or("")
        .to_lowercase();
    let geo_tags: Vec<String> = opp.geo_tags.iter().map(|t| t.to_lowercase()).collect();

    let is_global = geo_tags.iter().any(|t| t == "global" || t == "international" || t == "remote")
        || citizenship.contains("international")
        || citizenship.contains("any");

    let user_country = profile.country.as_deref().unwrap_or("").to_lowercase();
    let user_state = profile.state.as_deref().unwrap_or("").to_lowercase();

    match scope {
        LocationScope::All => true,
        // Strict: a local request without a state match excludes the item,
        // global listings included
        LocationScope::Local => {
            !user_state.is_empty()
                && !states.is_empty()
                && states.iter().any(|s| s.contains(&user_state))
        }
        LocationScope::Regional | LocationScope::National => {
            if !user_country.is_empty() {
                let country_match = citizenship.contains(&user_country)
                    || geo_tags.iter().any(|t| t == &user_country);
                country_match || is_global
            } else {
                is_global
            }
        }
        LocationScope::International => is_global,
    }
}

/// Source matching falls through three checks: declared platform, URL
/// hostname, then organization name.
fn matches_source(opp: &Opportunity, domain: &str) -> bool {
    let label = domain.split('.').next().unwrap_or(domain);

    if let Some(source_type) = opp.source_type.as_deref() {
        let source_type = source_type.to_lowercase();
        if domain.contains(&source_type) || source_type.contains(label) {
            return true;
        }
    }

    if let Some(source_url) = opp.source_url.as_deref() {
        if let Ok(url) = Url::parse(source_url) {
            if let Some(host) = url.host_str() {
                let host = host.to_lowercase().replace("www.", "");
                if host == domain || host.ends_with(&format!(".{domain}")) || host.contains(label)
                {
                    return true;
                }
            }
        }
    }

    opp.organization.to_lowercase().contains(label)
}

/// Items discovered within the last 72 hours surface first, newest first;
/// everything else keeps its incoming (rank) order.
fn freshness_boost(pool: Vec<Opportunity>) -> Vec<Opportunity> {
    let (mut fresh, stale): (Vec<Opportunity>, Vec<Opportunity>) =
        pool.into_iter().partition(|opp| is_new(&opp.discovered_at));

    fresh.sort_by(|a, b| {
        let a_ts = matching_core::parse_timestamp(&a.discovered_at);
        let b_ts = matching_core::parse_timestamp(&b.discovered_at);
        b_ts.cmp(&a_ts)
    });

    fresh.extend(stale);
    fresh
}
