//! Splits counter names of the form `<kind>>>><tag>>>>traffic>>><direction>`.

use crate::types::{Direction, ParsedName, ResourceKind};

pub const SEPARATOR: &str = ">>>";

const TRAFFIC_SEGMENT: &str = "traffic";

/// Parse a counter name into its traffic components.
///
/// Returns `None` for anything that is not exactly four separator-delimited
/// segments with a known kind, a non-empty tag, the literal `traffic` and a
/// known direction. Most names in an unfiltered registry dump do not match,
/// so `None` is an ordinary outcome.
pub fn parse(name: &str) -> Option<ParsedName<'_>> {
    let mut segments = name.splitn(5, SEPARATOR);

    let resource_kind = resource_kind(segments.next()?)?;
    let tag = segments.next().filter(|tag| !tag.is_empty())?;
    if segments.next()? != TRAFFIC_SEGMENT {
        return None;
    }
    let direction = direction(segments.next()?)?;

    // Anything after the direction is trailing content, not a shorter match.
    if segments.next().is_some() {
        return None;
    }

    Some(ParsedName {
        resource_kind,
        tag,
        direction,
    })
}

fn resource_kind(segment: &str) -> Option<ResourceKind> {
    match segment {
        "inbound" => Some(ResourceKind::Inbound),
        "outbound" => Some(ResourceKind::Outbound),
        "user" => Some(ResourceKind::User),
        _ => None,
    }
}

fn direction(segment: &str) -> Option<Direction> {
    match segment {
        "uplink" => Some(Direction::Uplink),
        "downlink" => Some(Direction::Downlink),
        _ => None,
    }
}
