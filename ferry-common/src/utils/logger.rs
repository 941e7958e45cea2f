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

use crate::conf::LogConf;
use once_cell::sync::OnceCell;
use std::str::FromStr;
use tracing::Level;

static LOGGER: OnceCell<()> = OnceCell::new();

/// Process logging bootstrap: `log` records are bridged into a `tracing` fmt subscriber.
pub struct Logger;

impl Logger {
    pub fn init(conf: LogConf) {
        LOGGER.get_or_init(|| {
            let level = Level::from_str(&conf.level).unwrap_or(Level::INFO);
            let _ = tracing_log::LogTracer::init();
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_target(conf.display_target)
                .with_thread_names(conf.display_thread)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        });
    }

    pub fn init_default() {
        Self::init(LogConf::default())
    }
}
