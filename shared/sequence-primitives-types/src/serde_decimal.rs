//! Serialize big integers as decimal strings.
//!
//! Accepts decimal strings, `0x` strings (where the target type parses them) and plain JSON
//! numbers on the way in.

use core::{fmt::Display, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Str(String),
    Num(u64),
}

pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr,
    T::Err: Display,
    D: Deserializer<'de>,
{
    let raw = match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    };
    raw.trim().parse().map_err(de::Error::custom)
}
