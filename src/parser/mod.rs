//! Wait-time feed parsing
//!
//! The feed is a flat XML document: the root holds one element per branch and
//! every child of a branch element is a named attribute (`town`, `licensing`,
//! `registration`, ...). The two service attributes carry `H:MM:SS` wait times
//! which are converted to fractional minutes here.

use tracing::{debug, warn};

use crate::constants::{CLOSED_TOKEN, ERROR_TOKEN, TOWN_ATTRIBUTE};
use crate::error::{MetricsError, Result};
use crate::types::{AttributeValue, BranchRecord, Service, WaitTimeSnapshot};

/// Convert a feed wait time into minutes.
///
/// `Error` and `Closed` map to zero. Otherwise the value must have at least
/// three colon-separated fields: whole hours, whole minutes and (possibly
/// fractional) seconds.
pub fn parse_wait_time(value: &str) -> Result<f64> {
    let value = value.trim();
    if value == ERROR_TOKEN || value == CLOSED_TOKEN {
        return Ok(0.0);
    }

    let fields: Vec<&str> = value.split(':').map(str::trim).collect();
    if fields.len() < 3 {
        return Err(MetricsError::Parse(format!(
            "wait time '{}' is not in H:MM:SS form",
            value
        )));
    }

    let hours: u64 = fields[0]
        .parse()
        .map_err(|_| invalid_field(value, "hours", fields[0]))?;
    let minutes: u64 = fields[1]
        .parse()
        .map_err(|_| invalid_field(value, "minutes", fields[1]))?;
    let seconds: f64 = fields[2]
        .parse()
        .map_err(|_| invalid_field(value, "seconds", fields[2]))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid_field(value, "seconds", fields[2]));
    }

    Ok(hours as f64 * 60.0 + minutes as f64 + seconds / 60.0)
}

fn invalid_field(value: &str, field: &str, raw: &str) -> MetricsError {
    MetricsError::Parse(format!(
        "wait time '{}' has non-numeric {} field '{}'",
        value, field, raw
    ))
}

/// Parse the feed document into a snapshot keyed by branch town.
///
/// Malformed XML or a malformed service wait time fails the whole parse.
/// Branches without a `town` are skipped with a warning.
pub fn parse_snapshot(xml: &str) -> Result<WaitTimeSnapshot> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let document = roxmltree::Document::parse_with_options(xml, options)
        .map_err(|e| MetricsError::Parse(format!("feed is not valid XML: {}", e)))?;

    let mut snapshot = WaitTimeSnapshot::new();
    for (index, branch) in document
        .root_element()
        .children()
        .filter(|n| n.is_element())
        .enumerate()
    {
        let record = parse_branch(branch)?;

        let Some(town) = record.town().map(str::to_string) else {
            warn!(
                "Skipping branch #{} <{}>: no {} attribute",
                index,
                branch.tag_name().name(),
                TOWN_ATTRIBUTE
            );
            continue;
        };

        if snapshot.insert(town.clone(), record).is_some() {
            warn!("Duplicate branch town '{}' in feed; keeping the last entry", town);
        }
    }

    debug!("Parsed {} branches from feed", snapshot.len());
    Ok(snapshot)
}

fn parse_branch(branch: roxmltree::Node<'_, '_>) -> Result<BranchRecord> {
    let mut record = BranchRecord::new();
    for attr in branch.children().filter(|n| n.is_element()) {
        let name = attr.tag_name().name();
        let text = attr.text().unwrap_or_default().trim();

        let value = match Service::from_name(name) {
            Some(_) => AttributeValue::Minutes(parse_wait_time(text).map_err(|e| {
                MetricsError::Parse(format!("branch attribute '{}': {}", name, e))
            })?),
            None => AttributeValue::Raw(text.to_string()),
        };
        record.insert(name, value);
    }
    Ok(record)
}
