//! 서비스 타임스탬프 serde 헬퍼
//!
//! 서비스는 RFC 3339 대신 `2025-11-29 12:34:56.789012` 같은 UTC naive 문자열을 돌려준다.
//! 두 형식을 모두 받아들이고, 직렬화는 RFC 3339로 한다.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// `null` 허용 버전 (`last_heartbeat`)
///
/// 서비스는 값이 없을 때 `null` 대신 문자열 `"None"`을 보내기도 한다.
/// 읽을 수 없는 값은 모두 `None`으로 취급한다.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.and_then(|raw| super::parse(&raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_service_format() {
        let dt = parse("2025-11-29 12:34:56.789012").expect("naive timestamp");
        assert_eq!(dt.year(), 2025);
        assert_eq!(dt.hour(), 12);
        assert_eq!(dt.nanosecond(), 789_012_000);
    }

    #[test]
    fn test_parse_without_fraction_and_rfc3339() {
        assert!(parse("2025-11-29 12:34:56").is_some());
        let dt = parse("2025-11-29T21:34:56+09:00").expect("rfc3339 timestamp");
        assert_eq!(dt.hour(), 12);
    }

    #[derive(Debug, serde::Deserialize)]
    struct Heartbeat {
        #[serde(default, with = "super::option")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_option_treats_none_string_as_missing() {
        let hb: Heartbeat = serde_json::from_str(r#"{"at":"None"}"#).unwrap();
        assert!(hb.at.is_none());
        let hb: Heartbeat = serde_json::from_str(r#"{"at":"garbled"}"#).unwrap();
        assert!(hb.at.is_none());
        let hb: Heartbeat = serde_json::from_str(r#"{"at":"2025-11-29 09:15:00"}"#).unwrap();
        assert_eq!(hb.at.unwrap().hour(), 9);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("None").is_none());
        assert!(parse("").is_none());
    }
}
