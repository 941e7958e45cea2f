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

use std::fmt::Display;
use thiserror::Error;

/// Error type shared by every ferry crate.
///
/// Payloads are rendered messages so the error stays `Clone`: a finished task keeps its
/// failure and hands a copy to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FsError {
    #[error("{0}")]
    IO(String),

    #[error("{0}")]
    UriParse(String),

    #[error("{0}")]
    LockConflict(String),

    #[error("{0}")]
    Coordination(String),

    #[error("{0}")]
    Task(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Conf(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Common(String),
}

/// Taxonomy tag an outer transport uses to pick a status code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    UriParse,
    LockConflict,
    Coordination,
    Task,
    NotFound,
    Unsupported,
    InvalidArgument,
    Conf,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::UriParse | ErrorKind::InvalidArgument | ErrorKind::Conf => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::LockConflict => 409,
            ErrorKind::Unsupported => 501,
            ErrorKind::Coordination | ErrorKind::Task => 503,
            ErrorKind::Io | ErrorKind::Internal => 500,
        }
    }
}

impl FsError {
    pub fn io(msg: impl Display) -> Self {
        Self::IO(msg.to_string())
    }

    pub fn uri_parse(msg: impl Display) -> Self {
        Self::UriParse(msg.to_string())
    }

    pub fn lock_conflict(msg: impl Display) -> Self {
        Self::LockConflict(msg.to_string())
    }

    pub fn coordination(msg: impl Display) -> Self {
        Self::Coordination(msg.to_string())
    }

    pub fn task(msg: impl Display) -> Self {
        Self::Task(msg.to_string())
    }

    pub fn not_found(msg: impl Display) -> Self {
        Self::NotFound(msg.to_string())
    }

    pub fn unsupported(msg: impl Display) -> Self {
        Self::Unsupported(msg.to_string())
    }

    pub fn invalid_argument(msg: impl Display) -> Self {
        Self::InvalidArgument(msg.to_string())
    }

    pub fn conf(msg: impl Display) -> Self {
        Self::Conf(msg.to_string())
    }

    pub fn internal(msg: impl Display) -> Self {
        Self::Internal(msg.to_string())
    }

    pub fn common(msg: impl Display) -> Self {
        Self::Common(msg.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::IO(_) => ErrorKind::Io,
            FsError::UriParse(_) => ErrorKind::UriParse,
            FsError::LockConflict(_) => ErrorKind::LockConflict,
            FsError::Coordination(_) => ErrorKind::Coordination,
            FsError::Task(_) => ErrorKind::Task,
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::Unsupported(_) => ErrorKind::Unsupported,
            FsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            FsError::Conf(_) => ErrorKind::Conf,
            FsError::Internal(_) | FsError::Common(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl From<std::io::Error> for FsError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(value.to_string()),
            _ => Self::IO(value.to_string()),
        }
    }
}

impl From<toml::de::Error> for FsError {
    fn from(value: toml::de::Error) -> Self {
        Self::Conf(value.to_string())
    }
}

impl From<regex::Error> for FsError {
    fn from(value: regex::Error) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}

impl From<prometheus::Error> for FsError {
    fn from(value: prometheus::Error) -> Self {
        Self::Common(value.to_string())
    }
}

impl From<tokio::task::JoinError> for FsError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<FsError> for std::io::Error {
    fn from(value: FsError) -> Self {
        match value {
            FsError::NotFound(msg) => std::io::Error::new(std::io::ErrorKind::NotFound, msg),
            e => std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        }
    }
}

#[macro_export]
macro_rules! err_box {
    ($($arg:tt)*) => {
        Err($crate::error::FsError::common(format!($($arg)*)))
    };
}

#[macro_export]
macro_rules! err_ext {
    ($e:expr) => {
        Err($crate::error::FsError::from($e))
    };
}
