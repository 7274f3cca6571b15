//! Relay Extractor - Free-text extraction pipeline
//!
//! Recovers typed data from provider pages that return markup instead of
//! structured payloads:
//! - Labelled scalar fields (owner name, CNIC, address)
//! - Phone number records classified by surrounding keywords
//! - Per-network counts with a synthetic Total row

pub mod aggregate;
pub mod fields;
pub mod identity;
pub mod markup;
pub mod records;

pub use aggregate::{CountMention, NetworkAggregator};
pub use fields::{CaptureRule, ExtractedFields, FieldSpec, PostProcess, TextFieldExtractor};
pub use identity::IdentityExtractor;
pub use markup::{plain_text, segments, Segment};
pub use records::{context_window, default_categories, CategoryRule, ContextualRecordExtractor};
