use chrono::TimeDelta;
use diesel::pg::data_types::PgInterval;

use crate::error::{DbError, Result};

/// Postgres intervals carry months and days separately from the time part, we only ever write
/// the time part, but rows written by hand may use the others.
const DAYS_PER_MONTH: i64 = 30;

/// Converts a duration to an `interval`, rejecting anything that does not fit in microseconds
pub fn to_interval(duration: TimeDelta) -> Result<PgInterval> {
    let micros = duration.num_microseconds().ok_or_else(|| {
        DbError::InvalidInput(format!("duration {duration} overflows an interval"))
    })?;
    Ok(PgInterval::from_microseconds(micros))
}

pub fn from_interval(interval: PgInterval) -> TimeDelta {
    let days = interval.days as i64 + interval.months as i64 * DAYS_PER_MONTH;
    TimeDelta::days(days) + TimeDelta::microseconds(interval.microseconds)
}

pub fn to_interval_opt(duration: Option<TimeDelta>) -> Result<Option<PgInterval>> {
    duration.map(to_interval).transpose()
}

pub fn from_interval_opt(interval: Option<PgInterval>) -> Option<TimeDelta> {
    interval.map(from_interval)
}

/// Serde helpers rendering durations as whole seconds
pub mod seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<TimeDelta, D::Error> {
        let secs = i64::deserialize(d)?;
        TimeDelta::try_seconds(secs)
            .ok_or_else(|| serde::de::Error::custom(format!("{secs} seconds is out of range")))
    }

    pub mod option {
        use chrono::TimeDelta;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(d: &Option<TimeDelta>, s: S) -> Result<S::Ok, S::Error> {
            match d {
                Some(d) => s.serialize_some(&d.num_seconds()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TimeDelta>, D::Error> {
            Option::<i64>::deserialize(d)?
                .map(|secs| {
                    TimeDelta::try_seconds(secs).ok_or_else(|| {
                        serde::de::Error::custom(format!("{secs} seconds is out of range"))
                    })
                })
                .transpose()
        }
    }
}
