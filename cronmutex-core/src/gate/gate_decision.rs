/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Outcome of a gate decision.

use std::fmt;

/// Why the caller should not run the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The mutex name can't be used as a cache key.
    InvalidName,
    /// The cache server could not be reached.
    Unreachable,
    /// Someone else holds the lock.
    Contended,
    /// The task ran too recently.
    TooSoon {
        /// Seconds since the last recorded run. Negative if the last run
        /// was recorded by a host with a clock ahead of ours.
        elapsed_seconds: i64,
    },
    /// The time of the last run could not be read.
    MetadataUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidName => write!(f, "invalid mutex name"),
            Self::Unreachable => write!(f, "cache unreachable"),
            Self::Contended => write!(f, "lock held by someone else"),
            Self::TooSoon { elapsed_seconds } => {
                write!(f, "last run was {elapsed_seconds} s ago")
            }
            Self::MetadataUnavailable => write!(f, "time of last run unavailable"),
        }
    }
}

/// Decision whether the caller should run the task now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Run the task.
    Run,
    /// Don't run the task.
    Skip(SkipReason),
}

impl GateDecision {
    /// Return `true` if the caller should run the task.
    pub fn should_run(&self) -> bool {
        matches!(self, Self::Run)
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::Skip(reason) => write!(f, "skip ({reason})"),
        }
    }
}
