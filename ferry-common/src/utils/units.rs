// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error::FsError;
use crate::FsResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static UNIT_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*(-?\d+)\s*([a-zA-Z]*)\s*$").ok());

fn split_unit(s: &str) -> FsResult<(i64, String)> {
    let pattern = match UNIT_PATTERN.as_ref() {
        Some(v) => v,
        None => return Err(FsError::internal("unit pattern failed to compile")),
    };

    let caps = pattern
        .captures(s)
        .ok_or_else(|| FsError::conf(format!("invalid value: {}", s)))?;
    let num = caps[1]
        .parse::<i64>()
        .map_err(|e| FsError::conf(format!("invalid number {}: {}", s, e)))?;
    Ok((num, caps[2].to_lowercase()))
}

/// Size with a unit suffix, e.g. `4096`, `64KB`, `10MB`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ByteUnit(u64);

impl ByteUnit {
    pub const KB: u64 = 1024;
    pub const MB: u64 = 1024 * Self::KB;
    pub const GB: u64 = 1024 * Self::MB;

    pub fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub fn from_str(s: &str) -> FsResult<Self> {
        let (num, unit) = split_unit(s)?;
        if num < 0 {
            return Err(FsError::conf(format!("size must not be negative: {}", s)));
        }
        let scale = match unit.as_str() {
            "" | "b" => 1,
            "k" | "kb" => Self::KB,
            "m" | "mb" => Self::MB,
            "g" | "gb" => Self::GB,
            _ => return Err(FsError::conf(format!("unknown size unit: {}", s))),
        };
        Ok(Self(num as u64 * scale))
    }

    pub fn as_byte(&self) -> u64 {
        self.0
    }
}

/// Duration with a unit suffix, e.g. `0ms`, `5s`, `10m`, `6h`. Negative values mean "never".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DurationUnit(Option<Duration>);

impl DurationUnit {
    pub fn from_str(s: &str) -> FsResult<Self> {
        let (num, unit) = split_unit(s)?;
        if num < 0 {
            return Ok(Self(None));
        }
        let num = num as u64;
        let dur = match unit.as_str() {
            "ms" => Duration::from_millis(num),
            "" | "s" => Duration::from_secs(num),
            "m" | "min" => Duration::from_secs(num * 60),
            "h" => Duration::from_secs(num * 3600),
            "d" => Duration::from_secs(num * 86400),
            _ => return Err(FsError::conf(format!("unknown duration unit: {}", s))),
        };
        Ok(Self(Some(dur)))
    }

    pub fn as_duration(&self) -> Duration {
        self.0.unwrap_or(Duration::MAX)
    }

    pub fn as_option(&self) -> Option<Duration> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes() {
        assert_eq!(ByteUnit::from_str("4096").unwrap().as_byte(), 4096);
        assert_eq!(ByteUnit::from_str("64KB").unwrap().as_byte(), 64 * 1024);
        assert_eq!(ByteUnit::from_str("10mb").unwrap().as_byte(), 10 * 1024 * 1024);
        assert!(ByteUnit::from_str("-1MB").is_err());
        assert!(ByteUnit::from_str("1XB").is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(
            DurationUnit::from_str("0ms").unwrap().as_duration(),
            Duration::ZERO
        );
        assert_eq!(
            DurationUnit::from_str("10m").unwrap().as_duration(),
            Duration::from_secs(600)
        );
        assert_eq!(DurationUnit::from_str("-1").unwrap().as_option(), None);
        assert!(DurationUnit::from_str("abc").is_err());
    }
}
