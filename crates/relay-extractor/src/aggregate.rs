//! Per-network aggregation
//!
//! Two independent signals feed the tally: one count per extracted record,
//! and explicit "Jazz: 3" style mentions found in the page text. They are
//! added together.

use regex::Regex;
use relay_core::{NetworkSummary, NumberRecord, Subtype, TOTAL_ROW, UNKNOWN_CATEGORY};

use crate::records::CategoryRule;

/// Nouns that may sit between a network name and its count
const COUNT_NOUNS: &str = r"(?:sims?|numbers?|connections?)";

/// A count printed next to a network name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMention {
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Clone)]
struct MentionRule {
    category: String,
    patterns: Vec<Regex>,
}

/// Folds records and count mentions into per-network rows plus a Total row
#[derive(Debug, Clone)]
pub struct NetworkAggregator {
    /// Category order of the output; never mutated after construction
    seed: Vec<String>,
    mention_rules: Vec<MentionRule>,
}

impl NetworkAggregator {
    pub fn new(categories: &[CategoryRule]) -> Result<Self, regex::Error> {
        let mut seed: Vec<String> = categories.iter().map(|c| c.category.clone()).collect();
        seed.push(UNKNOWN_CATEGORY.to_string());

        let mention_rules = categories
            .iter()
            .filter(|c| !c.keywords.is_empty())
            .map(|c| {
                let names = c
                    .keywords
                    .iter()
                    .map(|k| regex::escape(k))
                    .collect::<Vec<_>>()
                    .join("|");
                Ok(MentionRule {
                    category: c.category.clone(),
                    patterns: vec![
                        // "Jazz SIMs: 3", "Zong = 2"
                        Regex::new(&format!(
                            r"(?i)\b(?:{names})\b\s*{COUNT_NOUNS}?\s*[:=]\s*(\d{{1,3}})\b"
                        ))?,
                        // "3 Telenor SIMs"
                        Regex::new(&format!(
                            r"(?i)\b(\d{{1,3}})\s+(?:{names})\s+{COUNT_NOUNS}\b"
                        ))?,
                    ],
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            seed,
            mention_rules,
        })
    }

    /// Find explicit per-network counts in plain text
    pub fn scan_count_mentions(&self, text: &str) -> Vec<CountMention> {
        let mut mentions = Vec::new();
        for rule in &self.mention_rules {
            for pattern in &rule.patterns {
                for caps in pattern.captures_iter(text) {
                    let Some(count) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
                        continue;
                    };
                    mentions.push(CountMention {
                        category: rule.category.clone(),
                        count,
                    });
                }
            }
        }
        mentions
    }

    /// Build summary rows
    ///
    /// Rows with a zero total are dropped; a Total row is appended only when
    /// at least one row remains.
    pub fn aggregate(&self, records: &[NumberRecord], mentions: &[CountMention]) -> Vec<NetworkSummary> {
        // Fresh accumulator per call, seeded from the immutable category list
        let mut tally: Vec<(String, u32, u32)> =
            self.seed.iter().map(|c| (c.clone(), 0, 0)).collect();

        for record in records {
            let slot = slot_for(&mut tally, &record.category);
            match record.subtype {
                Subtype::VoiceData => slot.1 = slot.1.saturating_add(1),
                Subtype::DataOnly => slot.2 = slot.2.saturating_add(1),
            }
        }

        for mention in mentions {
            let slot = slot_for(&mut tally, &mention.category);
            slot.1 = slot.1.saturating_add(mention.count);
        }

        let mut rows: Vec<NetworkSummary> = tally
            .into_iter()
            .filter(|(_, voice, data)| voice.saturating_add(*data) > 0)
            .map(|(category, voice, data)| NetworkSummary::new(category, voice, data))
            .collect();

        if rows.is_empty() {
            return rows;
        }

        let voice = rows.iter().fold(0u32, |acc, r| acc.saturating_add(r.voice_data_count));
        let data = rows.iter().fold(0u32, |acc, r| acc.saturating_add(r.data_only_count));
        rows.push(NetworkSummary::new(TOTAL_ROW, voice, data));
        rows
    }
}

fn slot_for<'a>(tally: &'a mut Vec<(String, u32, u32)>, category: &str) -> &'a mut (String, u32, u32) {
    let index = match tally.iter().position(|(c, _, _)| c == category) {
        Some(index) => index,
        None => {
            tally.push((category.to_string(), 0, 0));
            tally.len() - 1
        }
    };
    &mut tally[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::default_categories;
    use proptest::prelude::*;

    fn aggregator() -> NetworkAggregator {
        NetworkAggregator::new(&default_categories()).unwrap()
    }

    fn record(category: &str, subtype: Subtype) -> NumberRecord {
        NumberRecord::new("03001234567", category, subtype)
    }

    #[test]
    fn test_empty_input_has_no_total_row() {
        assert!(aggregator().aggregate(&[], &[]).is_empty());
    }

    #[test]
    fn test_rows_follow_seed_order_with_total_last() {
        let records = vec![
            record("Telenor", Subtype::VoiceData),
            record("Jazz", Subtype::VoiceData),
            record("Jazz", Subtype::DataOnly),
        ];
        let rows = aggregator().aggregate(&records, &[]);
        let names: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["Jazz", "Telenor", "Total"]);
        assert_eq!(rows[0], NetworkSummary::new("Jazz", 1, 1));
        assert_eq!(rows[2], NetworkSummary::new("Total", 2, 1));
    }

    #[test]
    fn test_mentions_add_to_record_counts() {
        let records = vec![record("Zong", Subtype::VoiceData)];
        let mentions = vec![CountMention {
            category: "Zong".to_string(),
            count: 2,
        }];
        let rows = aggregator().aggregate(&records, &mentions);
        assert_eq!(rows[0], NetworkSummary::new("Zong", 3, 0));
        assert_eq!(rows.last().unwrap().total, 3);
    }

    #[test]
    fn test_unknown_and_unseeded_categories() {
        let records = vec![
            record("unknown", Subtype::VoiceData),
            record("Onic", Subtype::DataOnly),
        ];
        let rows = aggregator().aggregate(&records, &[]);
        let names: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["unknown", "Onic", "Total"]);
    }

    #[test]
    fn test_calls_do_not_share_state() {
        let agg = aggregator();
        let first = agg.aggregate(&[record("Jazz", Subtype::VoiceData)], &[]);
        let second = agg.aggregate(&[record("Jazz", Subtype::VoiceData)], &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_scan_count_mentions() {
        let text = "Jazz SIMs: 3\nZong = 1\n2 Telenor numbers\nUfone: 03331234567";
        let mentions = aggregator().scan_count_mentions(text);
        assert_eq!(
            mentions,
            vec![
                CountMention { category: "Jazz".into(), count: 3 },
                CountMention { category: "Zong".into(), count: 1 },
                CountMention { category: "Telenor".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_mentions_ignore_keyword_inside_words() {
        assert!(aggregator().scan_count_mentions("Jazzy: 4").is_empty());
    }

    fn arb_record() -> impl Strategy<Value = NumberRecord> {
        (
            prop::sample::select(vec!["Jazz", "Zong", "Telenor", "Ufone", "unknown", "Other"]),
            any::<bool>(),
        )
            .prop_map(|(category, data_only)| {
                let subtype = if data_only { Subtype::DataOnly } else { Subtype::VoiceData };
                record(category, subtype)
            })
    }

    proptest! {
        #[test]
        fn prop_total_row_sums_other_rows(
            records in prop::collection::vec(arb_record(), 0..40),
            extra in prop::collection::vec((0usize..4, 0u32..20), 0..5),
        ) {
            let categories = ["Jazz", "Zong", "Telenor", "Ufone"];
            let mentions: Vec<CountMention> = extra
                .into_iter()
                .map(|(i, count)| CountMention { category: categories[i].to_string(), count })
                .collect();

            let rows = aggregator().aggregate(&records, &mentions);
            for row in &rows {
                prop_assert_eq!(row.total, row.voice_data_count + row.data_only_count);
            }
            if let Some((total, others)) = rows.split_last() {
                prop_assert!(total.is_total_row());
                prop_assert!(others.iter().all(|r| r.total > 0 && !r.is_total_row()));
                prop_assert_eq!(total.total, others.iter().map(|r| r.total).sum::<u32>());
            } else {
                let mention_sum: u32 = mentions.iter().map(|m| m.count).sum();
                prop_assert!(records.is_empty() && mention_sum == 0);
            }
        }
    }
}
