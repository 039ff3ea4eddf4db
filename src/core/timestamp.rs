use chrono::Local;
#[cfg(test)]
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Identity of one run. Captured once and reused for the archive name,
/// every log line and the webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub(crate) struct RunTimestamp(String);

impl RunTimestamp {
    pub(crate) fn now() -> Self {
        Self(Local::now().format(TIMESTAMP_FORMAT).to_string())
    }

    #[cfg(test)]
    pub(crate) fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime.format(TIMESTAMP_FORMAT).to_string())
    }
}

impl fmt::Display for RunTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> RunTimestamp {
        let datetime = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap();
        RunTimestamp::from_datetime(datetime)
    }

    #[test]
    fn formats_fixed_width_zero_padded() {
        assert_eq!(at(2024, 1, 2, 3, 4, 5).to_string(), "20240102-030405");
    }

    #[test]
    fn lexical_order_follows_time() {
        let earlier = at(2024, 9, 30, 23, 59, 59);
        let later = at(2024, 10, 1, 0, 0, 0);
        assert!(earlier.to_string() < later.to_string());
        assert!(earlier < later);
    }

    #[test]
    fn now_has_expected_shape() {
        let now = RunTimestamp::now();
        let pattern = regex::Regex::new(r"^\d{8}-\d{6}$").unwrap();
        assert!(pattern.is_match(&now.to_string()), "{}", now);
    }
}
