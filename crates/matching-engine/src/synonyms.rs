//! Interest-to-keyword synonym table.
//!
//! Built once per engine instance. Every edge between two keyed interests is
//! guaranteed bidirectional: the constructor inserts the return edge whenever
//! a seed lists a keyword that is itself a table key.

use std::collections::{HashMap, HashSet};

/// Seed entries. Keywords that are themselves keys (e.g. "blockchain" under
/// "web3") get their return edge added at construction time.
const SEED: &[(&str, &[&str])] = &[
    (
        "artificial intelligence",
        &[
            "ai", "machine learning", "deep learning", "neural", "nlp", "gpt", "llm",
            "generative", "ml", "tensorflow", "pytorch",
        ],
    ),
    (
        "ai",
        &[
            "artificial intelligence", "machine learning", "deep learning", "neural", "nlp",
            "gpt", "llm", "generative", "ml", "tensorflow", "pytorch",
        ],
    ),
    (
        "web development",
        &[
            "web", "frontend", "backend", "fullstack", "react", "node", "javascript",
            "typescript", "html", "css", "nextjs", "vue", "angular",
        ],
    ),
    (
        "blockchain",
        &[
            "crypto", "web3", "defi", "nft", "ethereum", "solana", "smart contract",
            "dorahacks", "buidl", "dao",
        ],
    ),
    (
        "web3",
        &[
            "blockchain", "crypto", "defi", "nft", "ethereum", "solana", "smart contract",
            "decentralized", "dorahacks", "buidl", "dao", "dapp",
        ],
    ),
    (
        "cybersecurity",
        &[
            "security", "hacking", "penetration", "bug bounty", "ctf", "infosec",
            "ethical hacking", "intigriti", "hackerone",
        ],
    ),
    (
        "data science",
        &[
            "data", "analytics", "statistics", "visualization", "machine learning",
            "big data", "kaggle", "pandas", "numpy",
        ],
    ),
    (
        "mobile",
        &["ios", "android", "react native", "flutter", "swift", "kotlin", "app"],
    ),
    ("game development", &["game", "unity", "3d", "unreal", "gaming", "gamedev"]),
    (
        "hackathons",
        &[
            "hackathon", "hack", "build", "competition", "sprint", "devpost", "mlh",
            "dorahacks", "taikai", "hackquest", "buidl",
        ],
    ),
    (
        "software",
        &[
            "engineering", "developer", "programming", "code", "tech", "coding",
            "algorithm", "api",
        ],
    ),
    ("design", &["ui", "ux", "figma", "product", "creative", "graphics"]),
    ("fintech", &["finance", "banking", "payments", "trading", "financial", "defi"]),
    ("healthcare", &["medical", "biotech", "health", "telemedicine"]),
    (
        "entrepreneurship",
        &["startup", "business", "innovation", "founder", "venture", "pitch"],
    ),
    (
        "cloud",
        &["aws", "azure", "gcp", "serverless", "devops", "kubernetes", "docker"],
    ),
    (
        "coding",
        &[
            "code", "programming", "developer", "software", "hackathon", "algorithm",
            "python", "javascript",
        ],
    ),
    (
        "python",
        &["django", "flask", "pandas", "numpy", "data science", "ml"],
    ),
    (
        "open source",
        &["github", "contribution", "oss", "linux", "community"],
    ),
];

pub struct SynonymTable {
    entries: HashMap<String, Vec<String>>,
}

impl SynonymTable {
    /// Build the built-in table and symmetrize edges between keyed entries
    pub fn builtin() -> Self {
        let mut entries: HashMap<String, Vec<String>> = HashMap::new();
        for (key, synonyms) in SEED {
            entries.insert(
                key.to_string(),
                synonyms.iter().map(|s| s.to_string()).collect(),
            );
        }

        let keys: Vec<String> = entries.keys().cloned().collect();
        for key in &keys {
            let synonyms = entries[key].clone();
            for synonym in synonyms {
                if let Some(reverse) = entries.get_mut(&synonym) {
                    if !reverse.contains(key) {
                        reverse.push(key.clone());
                    }
                }
            }
        }

        Self { entries }
    }

    /// Expand interests into a flat lowercase keyword set.
    ///
    /// Each interest contributes itself plus its synonyms; unknown interests
    /// contribute only themselves.
    pub fn expand(&self, interests: &[String]) -> HashSet<String> {
        let mut expanded = HashSet::new();
        for interest in interests {
            let lower = interest.trim().to_lowercase();
            if lower.is_empty() {
                continue;
            }
            if let Some(synonyms) = self.entries.get(&lower) {
                expanded.extend(synonyms.iter().map(|s| s.to_lowercase()));
            }
            expanded.insert(lower);
        }
        expanded
    }

    /// Edges pointing at a keyed entry that lack a return edge.
    /// Empty on a correctly constructed table.
    pub fn missing_reverse_edges(&self) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for (key, synonyms) in &self.entries {
            for synonym in synonyms {
                if let Some(reverse) = self.entries.get(synonym) {
                    if !reverse.contains(key) {
                        missing.push((key.clone(), synonym.clone()));
                    }
                }
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyed_edge_has_a_return_edge() {
        let table = SynonymTable::builtin();
        assert!(table.missing_reverse_edges().is_empty());
    }

    #[test]
    fn expansion_is_bidirectional_between_keys() {
        let table = SynonymTable::builtin();

        let from_web3 = table.expand(&["web3".to_string()]);
        assert!(from_web3.contains("blockchain"));

        let from_blockchain = table.expand(&["blockchain".to_string()]);
        assert!(from_blockchain.contains("web3"));
    }

    #[test]
    fn unknown_interest_expands_to_itself() {
        let table = SynonymTable::builtin();
        let expanded = table.expand(&["Underwater Basket Weaving".to_string()]);
        assert_eq!(expanded.len(), 1);
        assert!(expanded.contains("underwater basket weaving"));
    }

    #[test]
    fn expansion_lowercases_and_includes_synonyms() {
        let table = SynonymTable::builtin();
        let expanded = table.expand(&["Web Development".to_string()]);
        assert!(expanded.contains("web development"));
        assert!(expanded.contains("react"));
        assert!(expanded.contains("typescript"));
    }
}
