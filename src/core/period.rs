use crate::domain::model::ReportingWindow;
use crate::utils::error::{ReportError, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

pub const DEFAULT_UTC_OFFSET_SECONDS: i32 = 3 * 3600;
pub const DEFAULT_BOUNDARY_HOUR: u32 = 15;
pub const DEFAULT_BOUNDARY_MINUTE: u32 = 31;
pub const DEFAULT_DEAD_ZONE_MINUTES: i64 = 2;

/// When reporting cycles turn over: a fixed local wall-clock time in a fixed-offset zone.
///
/// A cycle opens at the boundary on day `d` and closes `dead_zone` before the boundary on
/// day `d + 1`. Instants inside the dead zone belong to no cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSchedule {
    offset: FixedOffset,
    boundary: NaiveTime,
    dead_zone: Duration,
}

impl CycleSchedule {
    pub fn try_new(
        offset_seconds: i32,
        boundary_hour: u32,
        boundary_minute: u32,
        dead_zone_minutes: i64,
    ) -> Result<Self> {
        let offset = FixedOffset::east_opt(offset_seconds).ok_or_else(|| {
            ReportError::InvalidConfigValueError {
                field: "utc_offset_seconds".to_string(),
                value: offset_seconds.to_string(),
                reason: "Offset must be within ±24h".to_string(),
            }
        })?;
        let boundary = NaiveTime::from_hms_opt(boundary_hour, boundary_minute, 0).ok_or_else(|| {
            ReportError::InvalidConfigValueError {
                field: "boundary".to_string(),
                value: format!("{}:{}", boundary_hour, boundary_minute),
                reason: "Not a valid wall-clock time".to_string(),
            }
        })?;
        if !(0..24 * 60).contains(&dead_zone_minutes) {
            return Err(ReportError::InvalidConfigValueError {
                field: "dead_zone_minutes".to_string(),
                value: dead_zone_minutes.to_string(),
                reason: "Dead zone must be shorter than a day".to_string(),
            });
        }

        Ok(Self {
            offset,
            boundary,
            dead_zone: Duration::minutes(dead_zone_minutes),
        })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Absolute instant of the boundary on local calendar day `day`.
    pub fn boundary_on(&self, day: NaiveDate) -> DateTime<Utc> {
        let local = day.and_time(self.boundary);
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }

    /// The cycle in progress at `now`, or the one that most recently closed.
    pub fn window_at(&self, now: DateTime<Utc>) -> ReportingWindow {
        let local_today = now.with_timezone(&self.offset).date_naive();
        let boundary_today = self.boundary_on(local_today);

        // Fixed offset, so neighbouring boundaries are exactly one day apart.
        let opening = if now < boundary_today {
            boundary_today - Duration::days(1)
        } else {
            boundary_today
        };

        ReportingWindow {
            start: opening,
            end: opening + Duration::days(1) - self.dead_zone,
            offset: self.offset,
        }
    }
}

impl Default for CycleSchedule {
    fn default() -> Self {
        Self::try_new(
            DEFAULT_UTC_OFFSET_SECONDS,
            DEFAULT_BOUNDARY_HOUR,
            DEFAULT_BOUNDARY_MINUTE,
            DEFAULT_DEAD_ZONE_MINUTES,
        )
        .expect("default cycle schedule is valid")
    }
}
