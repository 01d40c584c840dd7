//! XMLTV timestamp helpers
//!
//! Guide timestamps look like `20250101120000 +0800`. Some feeds omit the
//! offset, in which case the time is taken as UTC.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

const XMLTV_FORMAT_WITH_OFFSET: &str = "%Y%m%d%H%M%S %z";
const XMLTV_FORMAT_NAIVE: &str = "%Y%m%d%H%M%S";

/// Parse an XMLTV `start`/`stop` attribute value
pub fn parse_xmltv_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    DateTime::parse_from_str(value, XMLTV_FORMAT_WITH_OFFSET)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, XMLTV_FORMAT_NAIVE)
                .ok()
                .and_then(|dt| FixedOffset::east_opt(0).map(|utc| dt.and_utc().with_timezone(&utc)))
        })
}
