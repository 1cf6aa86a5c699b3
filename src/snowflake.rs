use std::fmt;
use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::BigInt;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A chat platform id (guild, channel, user, role, message...)
///
/// Stored as `int8`, the cast to and from `i64` preserves every bit. On the wire it is
/// rendered as a string since JSON consumers lose precision above 2^53.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = BigInt)]
pub struct Snowflake(pub u64);

impl Snowflake {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for u64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl ToSql<BigInt, Pg> for Snowflake {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(&(self.0 as i64).to_be_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<BigInt, Pg> for Snowflake {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = <i64 as FromSql<BigInt, Pg>>::from_sql(bytes)?;
        Ok(Self(raw as u64))
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct SnowflakeVisitor;

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a snowflake as a string or an unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Snowflake(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(Snowflake)
            .map_err(|_| E::custom(format!("negative snowflake {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_string() {
        let id = Snowflake(u64::MAX);
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"18446744073709551615\""
        );
    }

    #[test]
    fn deserializes_from_string_or_number() {
        let a: Snowflake = serde_json::from_str("\"508391840525975553\"").unwrap();
        let b: Snowflake = serde_json::from_str("508391840525975553").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<Snowflake>("-1").is_err());
    }

    #[test]
    fn optional_fields_round_trip_through_json() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Row {
            channel_id: Option<Snowflake>,
        }
        let row = Row {
            channel_id: Some(Snowflake(555)),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"channel_id":"555"}"#);
        assert_eq!(serde_json::from_str::<Row>(&json).unwrap(), row);
    }
}
