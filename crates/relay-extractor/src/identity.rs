//! Identity report assembly
//!
//! Runs the three extraction passes over one scraped page and folds the
//! results into an [`AggregateReport`].

use relay_core::{AggregateReport, IdentityConfig, RelayError, Result};

use crate::aggregate::NetworkAggregator;
use crate::fields::TextFieldExtractor;
use crate::markup::plain_text;
use crate::records::{default_categories, ContextualRecordExtractor};

/// Turns an identity lookup page into a report
#[derive(Debug, Clone)]
pub struct IdentityExtractor {
    fields: TextFieldExtractor,
    records: ContextualRecordExtractor,
    aggregator: NetworkAggregator,
    count_explicit_mentions: bool,
}

impl IdentityExtractor {
    pub fn new(
        fields: TextFieldExtractor,
        records: ContextualRecordExtractor,
        aggregator: NetworkAggregator,
        count_explicit_mentions: bool,
    ) -> Self {
        Self {
            fields,
            records,
            aggregator,
            count_explicit_mentions,
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        let categories = default_categories();
        let records = ContextualRecordExtractor::new(config.window_size)
            .map_err(|e| RelayError::Config(format!("number pattern: {e}")))?
            .dedupe(config.dedupe_records);
        let aggregator = NetworkAggregator::new(&categories)
            .map_err(|e| RelayError::Config(format!("count mention pattern: {e}")))?;

        Ok(Self::new(
            TextFieldExtractor::owner_fields(&config.address_labels),
            records,
            aggregator,
            config.count_explicit_mentions,
        ))
    }

    pub fn extract(&self, markup: &str) -> AggregateReport {
        let owner = self.fields.extract_owner(markup);

        // Tag attributes (logo file names, css classes) often carry the network
        let records = self.records.extract_records(markup);

        let mentions = if self.count_explicit_mentions {
            self.aggregator.scan_count_mentions(&plain_text(markup))
        } else {
            Vec::new()
        };
        let networks = self.aggregator.aggregate(&records, &mentions);

        tracing::debug!(
            "Identity extraction: {} record(s), {} network row(s), {} count mention(s)",
            records.len(),
            networks.len(),
            mentions.len()
        );

        AggregateReport::new(owner, records, networks)
    }
}
