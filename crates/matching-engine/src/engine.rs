//! Weighted multi-factor scoring and ranking.

use matching_core::{
    days_until_deadline, MatchTier, Opportunity, PriorityLevel, ScoreBreakdown, UserProfile,
};

use crate::synonyms::SynonymTable;

/// Interests that mark a user as tech-adjacent for the hackathon floor
const TECH_INTERESTS: &[&str] = &[
    "software", "coding", "programming", "ai", "web", "blockchain", "data", "hackathon",
];

/// Hackathon-platform signals in listing text
const HACKATHON_SIGNALS: &[&str] = &["hackathon", "devpost", "mlh", "dorahacks"];

/// Minimum total for an item to survive ranking
const MIN_MATCH_SCORE: i32 = 30;

/// Per-factor weights. Must sum to 100.
#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub eligibility: i32,
    pub interests: i32,
    pub location: i32,
    pub urgency: i32,
    pub value: i32,
    pub effort: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            eligibility: 30,
            interests: 20,
            location: 15,
            urgency: 15,
            value: 10,
            effort: 10,
        }
    }
}

/// Scores opportunities against a user profile and ranks the results.
///
/// Scoring is pure arithmetic over plain data: the same inputs always produce
/// the same breakdown, and no sub-score can fail on missing profile fields.
pub struct MatchingEngine {
    weights: ScoringWeights,
    synonyms: SynonymTable,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            weights: ScoringWeights::default(),
            synonyms: SynonymTable::builtin(),
        }
    }

    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self {
            weights,
            synonyms: SynonymTable::builtin(),
        }
    }

    /// Compute the full score breakdown for one opportunity
    pub fn score(&self, opportunity: &Opportunity, profile: &UserProfile) -> ScoreBreakdown {
        let days_until = days_until_deadline(&opportunity.deadline);
        if days_until < 0 {
            return ScoreBreakdown::zero("Opportunity has expired");
        }

        let eligibility = self.score_eligibility(opportunity, profile);

        // Reserve path: the documented arithmetic floors at 0.5, so this
        // branch only fires if a stricter gate is introduced upstream.
        if eligibility == 0.0 {
            return ScoreBreakdown::zero("Does not meet strict eligibility");
        }

        let interests = self.score_interests(opportunity, profile);
        let location = self.score_location(opportunity, profile);
        let urgency = self.score_urgency(days_until, profile);
        let value = self.score_value(opportunity, profile);
        let effort = self.score_effort(opportunity, profile);

        let mut breakdown = ScoreBreakdown {
            eligibility: weighted(eligibility, self.weights.eligibility),
            interests: weighted(interests, self.weights.interests),
            location: weighted(location, self.weights.location),
            urgency: weighted(urgency, self.weights.urgency),
            value: weighted(value, self.weights.value),
            effort: weighted(effort, self.weights.effort),
            total: 0,
            explanation: String::new(),
        };
        breakdown.total = breakdown.eligibility
            + breakdown.interests
            + breakdown.location
            + breakdown.urgency
            + breakdown.value
            + breakdown.effort;
        breakdown.explanation = self.generate_explanation(&breakdown);

        breakdown
    }

    /// Score every item, assign tier and priority, drop weak matches,
    /// and sort by score descending with nearer deadlines breaking ties.
    pub fn rank(
        &self,
        opportunities: Vec<Opportunity>,
        profile: &UserProfile,
    ) -> Vec<Opportunity> {
        let candidates = opportunities.len();
        let mut ranked: Vec<Opportunity> = opportunities
            .into_iter()
            .map(|mut opp| {
                let breakdown = self.score(&opp, profile);
                let days_until = days_until_deadline(&opp.deadline);

                opp.match_score = breakdown.total;
                opp.match_tier = Some(MatchTier::from_score(breakdown.total));
                opp.priority_level = Some(PriorityLevel::from_deadline_and_score(
                    days_until,
                    breakdown.total,
                ));
                opp.match_explanation = Some(breakdown.explanation);
                opp
            })
            .filter(|opp| opp.match_score >= MIN_MATCH_SCORE)
            .collect();

        if ranked.len() < candidates {
            tracing::debug!(
                "Ranking dropped {} weak or expired candidates",
                candidates - ranked.len()
            );
        }

        ranked.sort_by(|a, b| {
            b.match_score
                .cmp(&a.match_score)
                .then_with(|| a.days_until_deadline().cmp(&b.days_until_deadline()))
        });

        ranked
    }

    /// Eligibility: explicit grade list beats the tag heuristic.
    /// Floors at 0.5; 0.0 is reserved for future strict gating.
    fn score_eligibility(&self, opp: &Opportunity, profile: &UserProfile) -> f64 {
        let mut score = 1.0;

        let user_status = profile
            .academic_status
            .as_deref()
            .unwrap_or("")
            .to_lowercase();
        let opp_tags: Vec<String> = opp.tags.iter().map(|t| t.to_lowercase()).collect();

        if !opp.eligibility.grades_eligible.is_empty() {
            let eligible = opp
                .eligibility
                .grades_eligible
                .iter()
                .any(|grade| user_status.contains(&grade.to_lowercase()));
            if !eligible {
                score *= 0.5;
            }
        } else {
            let expected = expected_status_tags(profile.academic_status.as_deref().unwrap_or(""));
            let has_match = expected
                .iter()
                .any(|tag| opp_tags.iter().any(|opp_tag| opp_tag.contains(tag)));
            if !has_match && !opp_tags.is_empty() {
                score *= 0.7;
            }
        }

        score
    }

    /// Interests: synonym-expanded keyword hits over the listing text,
    /// with floors and bonuses for tech users and major matches
    fn score_interests(&self, opp: &Opportunity, profile: &UserProfile) -> f64 {
        if profile.interests.is_empty() {
            return 0.5;
        }

        let expanded = self.synonyms.expand(&profile.interests);
        let text = search_text(opp);

        let hits = expanded.iter().filter(|kw| text.contains(kw.as_str())).count();

        let ratio = hits as f64 / expanded.len().max(3) as f64;
        let mut score = (ratio * 1.5).clamp(0.3, 1.0);

        let has_tech_interest = profile.interests.iter().any(|interest| {
            let lower = interest.to_lowercase();
            TECH_INTERESTS.iter().any(|tech| lower.contains(tech))
        });
        let is_hackathon = HACKATHON_SIGNALS.iter().any(|signal| text.contains(signal));

        // Tech-adjacent users always clear 0.7 on hackathon-platform listings
        if has_tech_interest && is_hackathon {
            score = score.max(0.7);
        }

        let major = profile.major.as_deref().unwrap_or("").to_lowercase();
        if !major.is_empty() && text.contains(&major) {
            score = (score + 0.2).min(1.0);
        }

        if major.contains("computer") || major.contains("software") || major.contains("engineering")
        {
            if is_hackathon || text.contains("tech") || text.contains("code") {
                score = (score + 0.15).min(1.0);
            }
        }

        score
    }

    /// Location: state match > citizenship match > unrestricted-US > global tag
    fn score_location(&self, opp: &Opportunity, profile: &UserProfile) -> f64 {
        let user_country = profile.country.as_deref().unwrap_or("").to_lowercase();
        let user_state = profile.state.as_deref().unwrap_or("").to_lowercase();

        if user_country.is_empty() && user_state.is_empty() {
            return 0.5;
        }

        let opp_states: Vec<String> = opp
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

        if !user_state.is_empty() && opp_states.iter().any(|s| s.contains(&user_state)) {
            return 1.0;
        }

        if !user_country.is_empty() {
            if !citizenship.is_empty() && citizenship.contains(&user_country) {
                return 0.9;
            }
            if (citizenship.is_empty() || citizenship == "any")
                && (user_country == "united states" || user_country == "us")
            {
                return 0.8;
            }
        }

        if citizenship.contains("international")
            || geo_tags.iter().any(|t| t == "international")
        {
            return 0.7;
        }

        0.5
    }

    /// Urgency: motivation-driven deadline preference
    fn score_urgency(&self, days_until: i64, profile: &UserProfile) -> f64 {
        if profile.motivation.iter().any(|m| m == "Urgent Funding") {
            return if days_until <= 7 {
                1.0
            } else if days_until <= 30 {
                0.7
            } else {
                0.3
            };
        }

        if profile.motivation.iter().any(|m| m == "Long-term Planning") {
            return if days_until > 60 {
                1.0
            } else if days_until > 30 {
                0.7
            } else {
                0.4
            };
        }

        // Default: prefer not-too-urgent, not-too-far
        if (7..=60).contains(&days_until) {
            0.8
        } else {
            0.5
        }
    }

    /// Value: award amount relative to declared financial need
    fn score_value(&self, opp: &Opportunity, profile: &UserProfile) -> f64 {
        if profile.financial_need <= 0.0 {
            return 0.5;
        }

        let ratio = (opp.amount / profile.financial_need).min(1.0);
        if ratio >= 0.8 {
            1.0
        } else if ratio >= 0.5 {
            0.8
        } else if ratio >= 0.2 {
            0.6
        } else {
            0.4
        }
    }

    /// Effort: estimated application hours vs. stated time commitment
    fn score_effort(&self, opp: &Opportunity, profile: &UserProfile) -> f64 {
        let hours = estimate_effort_hours(opp);
        let commitment = profile
            .time_commitment
            .as_deref()
            .unwrap_or("")
            .to_lowercase();

        if commitment.contains("few hours") {
            return if hours <= 5.0 {
                1.0
            } else if hours <= 10.0 {
                0.6
            } else {
                0.3
            };
        }

        if commitment.contains("weekend") {
            return if (10.0..=48.0).contains(&hours) { 1.0 } else { 0.5 };
        }

        0.8
    }

    /// Up to three reasons, fixed precedence; generic fallback otherwise
    fn generate_explanation(&self, breakdown: &ScoreBreakdown) -> String {
        let mut reasons: Vec<&str> = Vec::new();

        if breakdown.location > 10 {
            reasons.push("Great location match");
        }
        if breakdown.interests > 12 {
            reasons.push("Aligns with interests");
        }
        if breakdown.urgency > 10 {
            reasons.push("Fits your timeline");
        }
        if breakdown.value > 8 {
            reasons.push("High value");
        }
        if breakdown.effort > 7 {
            reasons.push("Feasible workload");
        }

        if reasons.is_empty() {
            return "General match based on your profile".to_string();
        }

        reasons.truncate(3);
        reasons.join(" • ")
    }
}

fn weighted(sub_score: f64, weight: i32) -> i32 {
    (sub_score * weight as f64).round() as i32
}

/// Flattened lowercase text the interest keywords are matched against
fn search_text(opp: &Opportunity) -> String {
    let mut parts: Vec<&str> = opp.tags.iter().map(String::as_str).collect();
    parts.push(&opp.name);
    parts.push(&opp.description);
    parts.push(&opp.organization);
    if let Some(url) = opp.source_url.as_deref() {
        parts.push(url);
    }
    parts.join(" ").to_lowercase()
}

/// Tag substrings expected for each academic status
fn expected_status_tags(status: &str) -> &'static [&'static str] {
    match status {
        "High School" => &[
            "high school", "freshman", "sophomore", "junior", "senior", "12th grade",
            "11th grade",
        ],
        "Undergraduate" => &["undergraduate", "college", "university", "bachelor"],
        "Graduate" => &["graduate", "masters", "phd", "doctoral"],
        "Postgraduate" => &["postgraduate", "post-doctoral"],
        _ => &[],
    }
}

/// Rough application effort: base 2h, plus essay/recommendation/document work
fn estimate_effort_hours(opp: &Opportunity) -> f64 {
    let tags: Vec<String> = opp.tags.iter().map(|t| t.to_lowercase()).collect();
    let mut hours = 2.0;

    if tags.iter().any(|t| t == "essay" || t == "statement") {
        hours += 3.0;
    }
    if tags.iter().any(|t| t == "recommendation" || t == "letter") {
        hours += 1.0;
    }
    if tags.iter().any(|t| t == "transcript" || t == "documents") {
        hours += 0.5;
    }

    hours
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn future_date(days: i64) -> String {
        (Utc::now() + Duration::days(days)).format("%Y-%m-%d").to_string()
    }

    fn sample_opportunity(id: &str) -> Opportunity {
        Opportunity {
            id: id.to_string(),
            name: format!("{id} Scholarship"),
            organization: "Example Foundation".to_string(),
            description: "An award for students".to_string(),
            amount: 5000.0,
            amount_display: "$5,000".to_string(),
            deadline: future_date(30),
            tags: vec![],
            eligibility: Default::default(),
            geo_tags: vec![],
            source_url: None,
            source_type: None,
            discovered_at: Utc::now().to_rfc3339(),
            match_score: 0,
            match_tier: None,
            priority_level: None,
            match_explanation: None,
        }
    }

    fn sample_profile() -> UserProfile {
        UserProfile {
            interests: vec!["coding".to_string()],
            academic_status: Some("Undergraduate".to_string()),
            major: Some("Computer Science".to_string()),
            country: Some("United States".to_string()),
            state: Some("California".to_string()),
            financial_need: 10000.0,
            ..Default::default()
        }
    }

    #[test]
    fn expired_opportunity_scores_zero() {
        let engine = MatchingEngine::new();
        let mut opp = sample_opportunity("expired");
        opp.deadline = (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string();

        let breakdown = engine.score(&opp, &sample_profile());
        assert_eq!(breakdown.total, 0);
        assert_eq!(breakdown.explanation, "Opportunity has expired");

        let ranked = engine.rank(vec![opp], &sample_profile());
        assert!(ranked.is_empty());
    }

    #[test]
    fn total_is_bounded() {
        let engine = MatchingEngine::new();
        let profile = sample_profile();

        let mut rich = sample_opportunity("rich");
        rich.tags = vec!["undergraduate".to_string(), "code".to_string()];
        rich.amount = 10000.0;
        rich.eligibility.states = vec!["California".to_string()];

        for opp in [sample_opportunity("plain"), rich] {
            let breakdown = engine.score(&opp, &profile);
            assert!((0..=100).contains(&breakdown.total), "total {}", breakdown.total);
            let sum = breakdown.eligibility
                + breakdown.interests
                + breakdown.location
                + breakdown.urgency
                + breakdown.value
                + breakdown.effort;
            assert_eq!(breakdown.total, sum);
        }
    }

    #[test]
    fn empty_profile_uses_neutral_defaults() {
        let engine = MatchingEngine::new();
        let profile = UserProfile::default();
        let opp = sample_opportunity("neutral");

        let breakdown = engine.score(&opp, &profile);
        // interests 0.5*20, location 0.5*15 (no location data), value 0.5*10,
        // effort 0.8*10, urgency 0.8*15 (30-day window), eligibility 30 (no tags)
        assert_eq!(breakdown.interests, 10);
        assert_eq!(breakdown.location, 8);
        assert_eq!(breakdown.value, 5);
        assert_eq!(breakdown.effort, 8);
        assert_eq!(breakdown.urgency, 12);
        assert_eq!(breakdown.eligibility, 30);
    }

    #[test]
    fn tech_interest_floors_hackathon_at_70_percent() {
        let engine = MatchingEngine::new();
        let profile = UserProfile {
            interests: vec!["web development".to_string()],
            ..Default::default()
        };

        let mut opp = sample_opportunity("hack");
        opp.tags = vec!["react".to_string()];
        opp.description = "DevPost hackathon".to_string();

        let breakdown = engine.score(&opp, &profile);
        // floor 0.7 on weight 20 = at least 14 points
        assert!(breakdown.interests >= 14, "interests {}", breakdown.interests);
    }

    #[test]
    fn major_match_adds_bonus() {
        let engine = MatchingEngine::new();
        let profile = UserProfile {
            interests: vec!["design".to_string()],
            major: Some("biology".to_string()),
            ..Default::default()
        };

        let mut with_major = sample_opportunity("bio");
        with_major.description = "A biology research award".to_string();
        let without_major = sample_opportunity("generic");

        let with = engine.score(&with_major, &profile).interests;
        let without = engine.score(&without_major, &profile).interests;
        assert!(with > without);
    }

    #[test]
    fn state_match_beats_citizenship_match() {
        let engine = MatchingEngine::new();
        let profile = sample_profile();

        let mut local = sample_opportunity("local");
        local.eligibility.states = vec!["California".to_string()];

        let mut national = sample_opportunity("national");
        national.eligibility.citizenship = Some("United States".to_string());

        let local_score = engine.score(&local, &profile).location;
        let national_score = engine.score(&national, &profile).location;
        assert_eq!(local_score, 15);
        assert!(national_score < local_score);
    }

    #[test]
    fn urgent_funding_prefers_near_deadlines() {
        let engine = MatchingEngine::new();
        let profile = UserProfile {
            motivation: vec!["Urgent Funding".to_string()],
            ..Default::default()
        };

        let mut soon = sample_opportunity("soon");
        soon.deadline = future_date(3);
        let mut far = sample_opportunity("far");
        far.deadline = future_date(90);

        assert!(engine.score(&soon, &profile).urgency > engine.score(&far, &profile).urgency);
    }

    #[test]
    fn long_term_planning_prefers_far_deadlines() {
        let engine = MatchingEngine::new();
        let profile = UserProfile {
            motivation: vec!["Long-term Planning".to_string()],
            ..Default::default()
        };

        let mut soon = sample_opportunity("soon");
        soon.deadline = future_date(3);
        let mut far = sample_opportunity("far");
        far.deadline = future_date(90);

        assert!(engine.score(&far, &profile).urgency > engine.score(&soon, &profile).urgency);
    }

    #[test]
    fn value_ladder_follows_need_coverage() {
        let engine = MatchingEngine::new();
        let profile = UserProfile {
            financial_need: 10000.0,
            ..Default::default()
        };

        let score_for = |amount: f64| {
            let mut opp = sample_opportunity("value");
            opp.amount = amount;
            engine.score(&opp, &profile).value
        };

        assert_eq!(score_for(9000.0), 10);
        assert_eq!(score_for(6000.0), 8);
        assert_eq!(score_for(3000.0), 6);
        assert_eq!(score_for(500.0), 4);
    }

    #[test]
    fn essay_tags_raise_effort_estimate() {
        let engine = MatchingEngine::new();
        let profile = UserProfile {
            time_commitment: Some("A few hours per week".to_string()),
            ..Default::default()
        };

        let light = sample_opportunity("light");
        let mut heavy = sample_opportunity("heavy");
        heavy.tags = vec![
            "essay".to_string(),
            "recommendation".to_string(),
            "transcript".to_string(),
        ];

        let light_score = engine.score(&light, &profile).effort;
        let heavy_score = engine.score(&heavy, &profile).effort;
        // 2h fits "few hours", 6.5h does not
        assert_eq!(light_score, 10);
        assert!(heavy_score < light_score);
    }

    #[test]
    fn rank_sorts_by_score_then_deadline() {
        let engine = MatchingEngine::new();
        let profile = sample_profile();

        let mut strong = sample_opportunity("strong");
        strong.eligibility.states = vec!["California".to_string()];
        strong.tags = vec!["undergraduate".to_string(), "code".to_string()];
        strong.amount = 10000.0;

        let weak = sample_opportunity("weak");

        let ranked = engine.rank(vec![weak, strong], &profile);
        assert!(!ranked.is_empty());
        for pair in ranked.windows(2) {
            assert!(pair[0].match_score >= pair[1].match_score);
            if pair[0].match_score == pair[1].match_score {
                assert!(pair[0].days_until_deadline() <= pair[1].days_until_deadline());
            }
        }
        for opp in &ranked {
            assert!(opp.match_score >= MIN_MATCH_SCORE);
            assert!(opp.match_tier.is_some());
            assert!(opp.priority_level.is_some());
            assert!(opp.match_explanation.is_some());
        }
    }

    #[test]
    fn deadline_tie_breaks_ascending() {
        let engine = MatchingEngine::new();
        let profile = UserProfile::default();

        let mut near = sample_opportunity("near");
        near.deadline = future_date(10);
        let mut far = sample_opportunity("far");
        far.deadline = future_date(40);

        let ranked = engine.rank(vec![far, near], &profile);
        assert_eq!(ranked.len(), 2);
        if ranked[0].match_score == ranked[1].match_score {
            assert_eq!(ranked[0].id, "near");
        }
    }
}
