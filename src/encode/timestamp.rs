//! Local wall-clock timestamp parsing.

use chrono::{DateTime, MappedLocalTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::{AmbiguousTime, CellError};

/// Parse `token` with `format` as a wall-clock time in `tz`, normalized to UTC.
pub(crate) fn parse_timestamp(
    token: &str,
    format: &str,
    tz: Tz,
    ambiguous: AmbiguousTime,
) -> Result<DateTime<Utc>, CellError> {
    let naive = NaiveDateTime::parse_from_str(token, format)
        .map_err(|e| CellError::invalid(format!("expected timestamp '{format}': {e}")))?;

    let local = match tz.from_local_datetime(&naive) {
        MappedLocalTime::Single(dt) => dt,
        MappedLocalTime::Ambiguous(earliest, latest) => match ambiguous {
            AmbiguousTime::Earliest => earliest,
            AmbiguousTime::Latest => latest,
            AmbiguousTime::Reject => {
                return Err(CellError::invalid(format!(
                    "{naive} is ambiguous in {}",
                    tz.name()
                )));
            }
        },
        MappedLocalTime::None => {
            return Err(CellError::invalid(format!(
                "{naive} does not exist in {}",
                tz.name()
            )));
        }
    };

    Ok(local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::America::New_York;

    use super::parse_timestamp;
    use crate::encode::{AmbiguousTime, DEFAULT_TIMESTAMP_FORMAT};
    use crate::error::ConversionKind;

    fn parse(token: &str, ambiguous: AmbiguousTime) -> Result<chrono::DateTime<Utc>, super::CellError> {
        parse_timestamp(token, DEFAULT_TIMESTAMP_FORMAT, New_York, ambiguous)
    }

    #[test]
    fn summer_time_is_four_hours_behind_utc() {
        let ts = parse("2013-09-01 00:00:00", AmbiguousTime::Earliest).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2013, 9, 1, 4, 0, 0).unwrap());
    }

    #[test]
    fn winter_time_is_five_hours_behind_utc() {
        let ts = parse("2013-12-31 23:59:59", AmbiguousTime::Earliest).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2014, 1, 1, 4, 59, 59).unwrap());
    }

    #[test]
    fn fall_back_overlap_follows_policy() {
        // 2013-11-03 01:30 happens twice in New York.
        let early = parse("2013-11-03 01:30:00", AmbiguousTime::Earliest).unwrap();
        let late = parse("2013-11-03 01:30:00", AmbiguousTime::Latest).unwrap();
        assert_eq!(early, Utc.with_ymd_and_hms(2013, 11, 3, 5, 30, 0).unwrap());
        assert_eq!(late, Utc.with_ymd_and_hms(2013, 11, 3, 6, 30, 0).unwrap());
        assert!(parse("2013-11-03 01:30:00", AmbiguousTime::Reject).is_err());
    }

    #[test]
    fn spring_forward_gap_is_invalid() {
        let err = parse("2013-03-10 02:30:00", AmbiguousTime::Earliest).unwrap_err();
        assert_eq!(err.kind, ConversionKind::InvalidToken);
        assert!(err.message.contains("does not exist"));
    }

    #[test]
    fn wrong_shape_is_invalid() {
        for bad in ["2013-09-01", "2013-09-01T00:00:00", "2013-13-01 00:00:00", "x"] {
            assert!(parse(bad, AmbiguousTime::Earliest).is_err(), "token {bad:?}");
        }
    }
}
