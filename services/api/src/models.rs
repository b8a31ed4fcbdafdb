//! Request payloads and query strings that are not domain commands

use serde::Deserialize;
use tracker::calendar::parse_day;
use tracker::{DayRange, TrackerResult};
use uuid::Uuid;

/// `?from=&to=` on progress history, both inclusive
#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ProgressQuery {
    pub fn range(&self) -> TrackerResult<DayRange> {
        let from = self.from.as_deref().map(parse_day).transpose()?;
        let to = self.to.as_deref().map(parse_day).transpose()?;
        DayRange::new(from, to)
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinByCodeRequest {
    pub invite_code: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn progress_query_builds_a_day_range() {
        let query = ProgressQuery {
            from: Some("2026-04-01".to_string()),
            to: None,
        };
        let range = query.range().unwrap();
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2026, 4, 1));
        assert_eq!(range.to, None);

        let inverted = ProgressQuery {
            from: Some("2026-04-10".to_string()),
            to: Some("2026-04-01".to_string()),
        };
        assert!(inverted.range().is_err());

        let garbage = ProgressQuery {
            from: Some("yesterday".to_string()),
            to: None,
        };
        assert!(garbage.range().is_err());
    }
}
