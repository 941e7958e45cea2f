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

use crate::state::{DataInfo, DataType, ResourceLocator};
use crate::utils::CommonUtils;
use crate::FsResult;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DataField {
    UploadTime,
    Size,
    Type,
    Name,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub field: DataField,
    pub asc: bool,
}

impl OrderKey {
    pub fn asc(field: DataField) -> Self {
        Self { field, asc: true }
    }

    pub fn desc(field: DataField) -> Self {
        Self { field, asc: false }
    }

    fn compare(&self, a: &DataInfo, b: &DataInfo) -> Ordering {
        let ord = match self.field {
            DataField::UploadTime => a.upload_time.cmp(&b.upload_time),
            DataField::Size => a.size.cmp(&b.size),
            DataField::Type => a.data_type.cmp(&b.data_type),
            DataField::Name => a.name().cmp(b.name()),
        };
        if self.asc {
            ord
        } else {
            ord.reverse()
        }
    }
}

/// Inclusive range, an open end is `None`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RangeValue {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl RangeValue {
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, v: i64) -> bool {
        self.min.map(|min| v >= min).unwrap_or(true) && self.max.map(|max| v <= max).unwrap_or(true)
    }
}

/// Listing request: which items under `locator`, in what order, and which slice.
///
/// With `keep == false` every listed item is deleted as it is handed out.
#[derive(Debug, Clone)]
pub struct DataInfoQuery {
    pub locator: ResourceLocator,
    pub offset: usize,
    pub limit: usize,
    pub keep: bool,
    pub order_keys: Vec<OrderKey>,
    pub name: Option<Regex>,
    pub types: HashSet<DataType>,
    pub upload_time: RangeValue,
    pub size: RangeValue,
}

impl DataInfoQuery {
    pub const DEFAULT_OFFSET: usize = 0;
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn new(locator: ResourceLocator) -> Self {
        Self {
            locator,
            offset: Self::DEFAULT_OFFSET,
            limit: Self::DEFAULT_LIMIT,
            keep: true,
            order_keys: vec![],
            name: None,
            types: HashSet::new(),
            upload_time: RangeValue::default(),
            size: RangeValue::default(),
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_order(mut self, key: OrderKey) -> Self {
        self.order_keys.push(key);
        self
    }

    /// Name filter with `?` and `*` wildcards.
    pub fn with_name(mut self, wildcard: &str) -> FsResult<Self> {
        self.name = Some(CommonUtils::wildcard_to_regex(wildcard)?);
        Ok(self)
    }

    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.types.insert(data_type);
        self
    }

    pub fn with_upload_time(mut self, range: RangeValue) -> Self {
        self.upload_time = range;
        self
    }

    pub fn with_size(mut self, range: RangeValue) -> Self {
        self.size = range;
        self
    }

    pub fn has_predicate(&self) -> bool {
        self.name.is_some()
            || !self.types.is_empty()
            || !self.upload_time.is_unbounded()
            || !self.size.is_unbounded()
    }

    pub fn has_order(&self) -> bool {
        !self.order_keys.is_empty()
    }

    pub fn matches(&self, info: &DataInfo) -> bool {
        if let Some(name) = &self.name {
            if !name.is_match(info.name()) {
                return false;
            }
        }
        if !self.types.is_empty() && !self.types.contains(&info.data_type) {
            return false;
        }
        self.upload_time.contains(info.upload_time) && self.size.contains(info.size)
    }

    /// Compares by each order key in turn, the first non-equal key decides.
    pub fn compare(&self, a: &DataInfo, b: &DataInfo) -> Ordering {
        for key in &self.order_keys {
            let ord = key.compare(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}
