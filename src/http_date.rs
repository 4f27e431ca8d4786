//! Parsing and formatting of HTTP timestamps (RFC 7231 IMF-fixdate).
//!
//! `time`'s `Rfc2822` well-known format accepts and produces the same
//! `Mon, 01 Jan 2024 00:00:00 GMT` shape HTTP uses for `Last-Modified` and
//! `If-Modified-Since`.

use std::time::SystemTime;

use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

/// Parses a header value as an HTTP timestamp. Returns `None` on anything
/// unparsable rather than erroring — callers treat that as "absent" per the
/// engine's header-parse-failure policy.
pub fn parse(value: &str) -> Option<SystemTime> {
    OffsetDateTime::parse(value.trim(), &Rfc2822)
        .ok()
        .map(SystemTime::from)
}

/// Formats a timestamp as IMF-fixdate for `Last-Modified` response headers.
pub fn format(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc2822)
        .expect("Rfc2822 formatting of a valid OffsetDateTime cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn round_trips_through_format_and_parse() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let formatted = format(now);
        let parsed = parse(&formatted).unwrap();
        assert_eq!(parsed, now);
    }

    #[test]
    fn parses_canonical_imf_fixdate() {
        let parsed = parse("Mon, 01 Jan 2024 00:00:00 GMT").unwrap();
        let expected = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("not a date").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn not_after_comparison_matches_equal_timestamps() {
        let t = parse("Mon, 01 Jan 2024 00:00:00 GMT").unwrap();
        let client = parse("Mon, 01 Jan 2024 00:00:00 GMT").unwrap();
        assert!(t <= client);
    }
}
