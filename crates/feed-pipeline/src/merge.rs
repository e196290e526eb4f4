use std::collections::HashMap;

use matching_core::Opportunity;

/// Identity key for cross-source deduplication: source URL when present,
/// else the normalized name, else the session id. Ids can be unstable
/// timestamps on first discovery, so content identity comes first.
pub fn identity_key(opportunity: &Opportunity) -> String {
    if let Some(url) = opportunity.source_url.as_deref() {
        let trimmed = url.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let name = opportunity.name.trim().to_lowercase();
    if !name.is_empty() {
        return name;
    }

    opportunity.id.clone()
}

/// Combine the post-flush live set with a snapshot fetch into one pool.
///
/// Snapshot items are inserted first, then live items; on an identity
/// conflict the live item wins, since it was observed more recently. The
/// result preserves first-seen relative order. Freshness-based reordering is
/// the pipeline's job, not this step's.
pub fn merge(live: Vec<Opportunity>, snapshot: Vec<Opportunity>) -> Vec<Opportunity> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, Opportunity> = HashMap::new();

    for opportunity in snapshot.into_iter().chain(live) {
        let key = identity_key(&opportunity);
        if !by_key.contains_key(&key) {
            order.push(key.clone());
        }
        by_key.insert(key, opportunity);
    }

    tracing::debug!("Merged pool holds {} unique opportunities", order.len());

    order.into_iter().filter_map(|key| by_key.remove(&key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opportunity(id: &str, name: &str, source_url: Option<&str>) -> Opportunity {
        let mut opp: Opportunity =
            serde_json::from_str(&format!(r#"{{"id":"{id}","name":"{name}"}}"#)).unwrap();
        opp.source_url = source_url.map(str::to_string);
        opp
    }

    #[test]
    fn same_source_url_collapses_to_one() {
        let live = vec![opportunity("x", "Live copy", Some("https://devpost.com/h/foo"))];
        let snapshot = vec![opportunity("y", "Snapshot copy", Some("https://devpost.com/h/foo"))];

        let merged = merge(live, snapshot);
        assert_eq!(merged.len(), 1);
        // live wins on conflict
        assert_eq!(merged[0].id, "x");
    }

    #[test]
    fn normalized_name_deduplicates_without_urls() {
        let live = vec![opportunity("a", "  Tech Grant ", None)];
        let snapshot = vec![opportunity("b", "tech grant", None)];

        let merged = merge(live, snapshot);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "a");
    }

    #[test]
    fn falls_back_to_id_when_nameless() {
        let live = vec![opportunity("a", "", None)];
        let snapshot = vec![opportunity("b", "", None)];

        let merged = merge(live, snapshot);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let snapshot = vec![
            opportunity("s1", "First", None),
            opportunity("s2", "Second", None),
        ];
        let live = vec![
            opportunity("l1", "Third", None),
            opportunity("l2", "second", None), // replaces s2 in place
        ];

        let merged = merge(live, snapshot);
        let ids: Vec<&str> = merged.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "l2", "l1"]);
    }
}
