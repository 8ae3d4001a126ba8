//! Daily creation counts for the marketplace entities.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;

use crate::entities::{card, offer, publication, user};
use crate::error::AppError;

/// Default window length, in days, ending today.
pub const DEFAULT_RANGE_DAYS: u64 = 30;
/// Longest window a single request may ask for.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Which table a statistics request counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticType {
    Users,
    Cards,
    Publications,
    Offers,
}

impl StatisticType {
    /// # Errors
    ///
    /// `BadRequest` for anything outside `users | cards | publications | offers`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_lowercase().as_str() {
            "users" => Ok(Self::Users),
            "cards" => Ok(Self::Cards),
            "publications" => Ok(Self::Publications),
            "offers" => Ok(Self::Offers),
            other => Err(AppError::BadRequest(format!(
                "Unknown statistics type '{other}', expected users, cards, publications or offers"
            ))),
        }
    }
}

/// Inclusive range of calendar days (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Build a range from optional `YYYY-MM-DD` strings.
    ///
    /// A missing `to` means `today`; a missing `from` means the 30 days ending at `to`.
    ///
    /// # Errors
    ///
    /// `BadRequest` for malformed dates, `from > to`, or a range over 366 days.
    pub fn resolve(
        from: Option<&str>,
        to: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, AppError> {
        let to = to.map(parse_date).transpose()?.unwrap_or(today);
        let from = match from {
            Some(raw) => parse_date(raw)?,
            None => to
                .checked_sub_days(Days::new(DEFAULT_RANGE_DAYS - 1))
                .unwrap_or(to),
        };

        if from > to {
            return Err(AppError::BadRequest(
                "'from' must not be after 'to'".to_string(),
            ));
        }
        if (to - from).num_days() + 1 > MAX_RANGE_DAYS {
            return Err(AppError::BadRequest(format!(
                "Date range cannot exceed {MAX_RANGE_DAYS} days"
            )));
        }

        Ok(Self { from, to })
    }

    fn start(&self) -> DateTime<FixedOffset> {
        self.from.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset()
    }

    /// First instant after the range.
    fn end(&self) -> DateTime<FixedOffset> {
        self.to
            .checked_add_days(Days::new(1))
            .unwrap_or(self.to)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .fixed_offset()
    }

    fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.from.iter_days().take_while(|d| *d <= self.to)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!("Invalid date '{raw}', expected YYYY-MM-DD"))
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    #[serde(rename = "type")]
    pub kind: StatisticType,
    pub from: String,
    pub to: String,
    pub total: u64,
    pub data: Vec<DailyCount>,
}

/// Count timestamps per UTC day, emitting a zero for days without any.
#[must_use]
pub fn bucket_by_day(range: &DateRange, timestamps: &[DateTime<FixedOffset>]) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, u64> = range.days().map(|d| (d, 0)).collect();

    for ts in timestamps {
        let day = ts.with_timezone(&Utc).date_naive();
        if let Some(count) = counts.get_mut(&day) {
            *count += 1;
        }
    }

    counts
        .into_iter()
        .map(|(date, count)| DailyCount {
            date: date.format("%Y-%m-%d").to_string(),
            count,
        })
        .collect()
}

pub struct StatisticsService;

impl StatisticsService {
    /// Daily creation counts of `kind` over `range`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the database query fails.
    pub async fn daily_counts(
        db: &DatabaseConnection,
        kind: StatisticType,
        range: DateRange,
    ) -> Result<StatisticsResponse, AppError> {
        let (start, end) = (range.start(), range.end());

        let timestamps = match kind {
            StatisticType::Users => {
                created_between::<user::Entity>(db, user::Column::CreatedAt, start, end).await?
            }
            StatisticType::Cards => {
                created_between::<card::Entity>(db, card::Column::CreatedAt, start, end).await?
            }
            StatisticType::Publications => {
                created_between::<publication::Entity>(
                    db,
                    publication::Column::CreatedAt,
                    start,
                    end,
                )
                .await?
            }
            StatisticType::Offers => {
                created_between::<offer::Entity>(db, offer::Column::CreatedAt, start, end).await?
            }
        };

        let data = bucket_by_day(&range, &timestamps);
        let total = data.iter().map(|d| d.count).sum();

        Ok(StatisticsResponse {
            kind,
            from: range.from.format("%Y-%m-%d").to_string(),
            to: range.to.format("%Y-%m-%d").to_string(),
            total,
            data,
        })
    }
}

async fn created_between<E: EntityTrait>(
    db: &DatabaseConnection,
    column: E::Column,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Result<Vec<DateTime<FixedOffset>>, AppError> {
    let rows = E::find()
        .select_only()
        .column(column)
        .filter(column.gte(start))
        .filter(column.lt(end))
        .into_tuple::<DateTime<FixedOffset>>()
        .all(db)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap_or_default()
    }

    #[test]
    fn test_default_range_is_thirty_days_ending_today() {
        let today = date("2026-10-17");
        let range = DateRange::resolve(None, None, today).ok();
        assert_eq!(
            range,
            Some(DateRange {
                from: date("2026-09-18"),
                to: today
            })
        );
    }

    #[test]
    fn test_range_rejects_inverted_and_oversized() {
        let today = date("2026-10-17");
        assert!(DateRange::resolve(Some("2026-10-10"), Some("2026-10-01"), today).is_err());
        assert!(DateRange::resolve(Some("2025-01-01"), Some("2026-01-02"), today).is_err());
        assert!(DateRange::resolve(Some("2025-01-01"), Some("2026-01-01"), today).is_ok());
        assert!(DateRange::resolve(Some("17/10/2026"), None, today).is_err());
    }

    #[test]
    fn test_bucket_by_day_zero_fills() {
        let range = DateRange {
            from: date("2026-10-01"),
            to: date("2026-10-03"),
        };
        let ts = |raw: &str| {
            DateTime::parse_from_rfc3339(raw).unwrap_or_else(|_| Utc::now().fixed_offset())
        };
        let buckets = bucket_by_day(
            &range,
            &[
                ts("2026-10-01T08:00:00+00:00"),
                ts("2026-10-01T23:59:59+00:00"),
                ts("2026-10-03T00:00:00+00:00"),
                ts("2026-10-04T00:00:00+00:00"),
            ],
        );

        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 0, 1]);
        assert_eq!(buckets[1].date, "2026-10-02");
    }

    #[test]
    fn test_bucket_by_day_uses_utc() {
        let range = DateRange {
            from: date("2026-10-01"),
            to: date("2026-10-02"),
        };
        let late = DateTime::parse_from_rfc3339("2026-10-01T23:30:00-02:00")
            .unwrap_or_else(|_| Utc::now().fixed_offset());
        let counts: Vec<u64> = bucket_by_day(&range, &[late])
            .iter()
            .map(|b| b.count)
            .collect();
        assert_eq!(counts, vec![0, 1]);
    }

    #[test]
    fn test_statistic_type_parse() {
        assert_eq!(StatisticType::parse("Users").ok(), Some(StatisticType::Users));
        assert_eq!(
            StatisticType::parse("offers").ok(),
            Some(StatisticType::Offers)
        );
        assert!(StatisticType::parse("games").is_err());
    }
}
