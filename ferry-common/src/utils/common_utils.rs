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

use crate::FsResult;
use chrono::{Local, TimeZone};
use regex::Regex;
use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct LocalTime;

impl LocalTime {
    pub const TIME_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S%.3f";

    pub fn mills() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Renders epoch millis as `yyyy-MM-ddTHH:mm:ss.SSS` in local time.
    pub fn format_mills(mills: i64) -> String {
        match Local.timestamp_millis_opt(mills).single() {
            Some(t) => t.format(Self::TIME_FORMAT).to_string(),
            None => mills.to_string(),
        }
    }
}

pub struct CommonUtils;

impl CommonUtils {
    pub const TMP_SUFFIX_LEN: usize = 10;

    pub fn uuid() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// `<epoch-millis>-<32 hex>`, unique per submission.
    pub fn create_task_id() -> String {
        format!("{}-{}", LocalTime::mills(), Self::uuid())
    }

    /// Fixed-width hex digest of an arbitrary key, safe to embed in a node name.
    pub fn key_hash(key: &str) -> FsResult<String> {
        let hash = murmur3::murmur3_x64_128(&mut Cursor::new(key.as_bytes()), 0)?;
        Ok(format!("{:032x}", hash))
    }

    pub fn tmp_name(name: &str) -> String {
        let uuid = Self::uuid();
        format!("{}{}", name, &uuid[..Self::TMP_SUFFIX_LEN])
    }

    /// `?` matches one char, `*` any run; the whole name must match.
    pub fn wildcard_to_regex(pattern: &str) -> FsResult<Regex> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        for c in pattern.chars() {
            match c {
                '?' => expr.push('.'),
                '*' => expr.push_str(".*"),
                c => expr.push_str(&regex::escape(&c.to_string())),
            }
        }
        expr.push('$');
        Ok(Regex::new(&expr)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_format() {
        let id = CommonUtils::create_task_id();
        let (mills, suffix) = id.split_once('-').unwrap();
        assert!(mills.parse::<u64>().is_ok());
        assert_eq!(suffix.len(), 32);
        assert_ne!(id, CommonUtils::create_task_id());
    }

    #[test]
    fn key_hash_is_fixed_width() {
        let a = CommonUtils::key_hash("file:///a/b").unwrap();
        let b = CommonUtils::key_hash(&"x".repeat(4096)).unwrap();
        assert_eq!(a.len(), 32);
        assert_eq!(b.len(), 32);
        assert_eq!(a, CommonUtils::key_hash("file:///a/b").unwrap());
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn wildcard() {
        let re = CommonUtils::wildcard_to_regex("data-?.c*v").unwrap();
        assert!(re.is_match("data-1.csv"));
        assert!(re.is_match("data-2.cv"));
        assert!(!re.is_match("data-12.csv"));
        assert!(!re.is_match("data-1xcsv"));
        assert!(!re.is_match("xdata-1.csv"));
    }

    #[test]
    fn tmp_name() {
        let name = CommonUtils::tmp_name("a.txt");
        assert!(name.starts_with("a.txt"));
        assert_eq!(name.len(), "a.txt".len() + CommonUtils::TMP_SUFFIX_LEN);
    }
}
