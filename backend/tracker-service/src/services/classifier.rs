//! Event classification
//!
//! Turns decoded `/track` parameters into counter increments. Two intents are
//! evaluated independently:
//!
//! - campaign tracking: `campaign`, `source` and `status` all present
//! - visit analytics: `source == "visit"` with `platform` and `w` present
//!
//! Field descriptors are written to the store verbatim, so the concatenation
//! order `source:<s>:status:<st>[:tag:<t>][:website:<w>]` must not change.

use crate::models::{IncrementOperation, TrackParams};

/// Status substituted when the reported status is not an integer.
pub const INVALID_STATUS: &str = "901";

pub const TAG_REQUESTS_KEY: &str = "tag_requests";

/// Result of classifying one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// At least one intent matched (counts as a received event)
    pub matched: bool,
    pub operations: Vec<IncrementOperation>,
}

pub fn classify(params: &TrackParams) -> Classification {
    let campaign_intent =
        !params.campaign.is_empty() && !params.source.is_empty() && !params.status.is_empty();
    let visit_intent =
        params.source == "visit" && !params.platform.is_empty() && !params.website.is_empty();

    if !campaign_intent && !visit_intent {
        return Classification::default();
    }

    let website = sanitize_website(&params.website);
    let mut operations = Vec::with_capacity(2);

    if campaign_intent {
        campaign_operations(params, website, &mut operations);
    }

    if visit_intent {
        if let Some(op) = visit_operation(&params.platform, website) {
            operations.push(op);
        }
    }

    Classification {
        matched: true,
        operations,
    }
}

/// Website ids that are not integers, or are zero, count as absent.
pub fn sanitize_website(raw: &str) -> &str {
    match raw.parse::<i64>() {
        Ok(0) | Err(_) => "",
        Ok(_) => raw,
    }
}

fn campaign_operations(params: &TrackParams, website: &str, out: &mut Vec<IncrementOperation>) {
    let tag = if params.tag == "false" { "" } else { params.tag.as_str() };
    let status = if params.status.parse::<i64>().is_ok() {
        params.status.as_str()
    } else {
        INVALID_STATUS
    };

    let mut field = format!("source:{}:status:{}", params.source, status);

    if !tag.is_empty() {
        field.push_str(":tag:");
        field.push_str(tag);

        if params.source == "tag" {
            out.push(IncrementOperation::hincrby(TAG_REQUESTS_KEY, tag));
        }
    }

    if !website.is_empty() {
        field.push_str(":website:");
        field.push_str(website);
    }

    out.push(IncrementOperation::hincrby(
        format!("campaign:{}", params.campaign),
        field,
    ));
}

fn visit_operation(platform: &str, website: &str) -> Option<IncrementOperation> {
    if website.is_empty() {
        return None;
    }

    Some(IncrementOperation::hincrby(
        format!("website:{}", website),
        format!("platform:{}", platform),
    ))
}
