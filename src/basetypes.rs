// Copyright 2024 Surfcut Developers

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//     http://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use num_traits::Num;
use num_traits::Signed;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

pub type NodeId = usize;
pub type EdgeId = usize;

/// Scalar type usable as an edge capacity.
///
/// Integer and floating point networks share a single solver; the only
/// thing that differs between them is how "infinite" is represented.
pub trait FlowNum:
    Num
    + PartialOrd
    + FromStr
    + Clone
    + Copy
    + PartialEq
    + std::fmt::Debug
    + std::fmt::Display
    + num_traits::bounds::Bounded
    + num_traits::cast::ToPrimitive
    + std::ops::AddAssign
    + std::ops::SubAssign
    + Sync
    + Send
    + Sized
    + Signed
    + 'static
{
    /// Capacity that never saturates on the graphs we build.
    fn big_value() -> Self {
        let four = Self::one() + Self::one() + Self::one() + Self::one();
        Self::max_value() / four
    }

    /// `false` for NaN and negative values.
    fn is_valid_capacity(&self) -> bool {
        *self >= Self::zero()
    }

    /// Sum of two capacities, `None` when it does not fit in `Self`.
    fn add_checked(&self, other: &Self) -> Option<Self>;

    /// Infinite capacities only exist for floating point types.
    fn is_unbounded(&self) -> bool {
        false
    }
}

macro_rules! integer_flow_num {
    ($($t:ty),*) => {$(
        impl FlowNum for $t {
            fn add_checked(&self, other: &Self) -> Option<Self> {
                self.checked_add(*other)
            }
        }
    )*};
}

macro_rules! float_flow_num {
    ($($t:ident),*) => {$(
        impl FlowNum for $t {
            fn big_value() -> Self {
                $t::INFINITY
            }

            fn add_checked(&self, other: &Self) -> Option<Self> {
                Some(self + other)
            }

            fn is_unbounded(&self) -> bool {
                self.is_infinite()
            }
        }
    )*};
}

integer_flow_num!(i32, i64, i128, isize);
float_flow_num!(f32, f64);

/// Side of the minimum cut a node ends up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalType {
    Source,
    Sink,
}

impl fmt::Display for TerminalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalType::Source => write!(f, "source"),
            TerminalType::Sink => write!(f, "sink"),
        }
    }
}

/// Verbosity of the solvers, ordered from silent to everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Quiet,
    Error,
    #[default]
    User,
    Debug,
    All,
}

impl LogLevel {
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Quiet && *self >= level
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Quiet => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::User => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::All => LevelFilter::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Error => "error",
            LogLevel::User => "user",
            LogLevel::Debug => "debug",
            LogLevel::All => "all",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" => Ok(LogLevel::Quiet),
            "error" => Ok(LogLevel::Error),
            "user" => Ok(LogLevel::User),
            "debug" => Ok(LogLevel::Debug),
            "all" => Ok(LogLevel::All),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Settings handed to a network or surface solver when it is created.
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    pub log_level: LogLevel,
    /// Checked between augmentation rounds; when set the solve stops with
    /// `SurfcutError::Interrupted`.
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl SolverConfig {
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

/// Counters collected by the max-flow solver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveStats {
    pub growth_steps: usize,
    pub augmentations: usize,
    pub orphans: usize,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering_and_parsing() {
        assert!(LogLevel::All > LogLevel::Debug);
        assert!(LogLevel::Debug.enabled(LogLevel::User));
        assert!(!LogLevel::User.enabled(LogLevel::Debug));
        assert!(!LogLevel::Quiet.enabled(LogLevel::Quiet));
        assert_eq!("Debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Quiet.level_filter(), LevelFilter::OFF);
    }

    #[test]
    fn test_big_value_does_not_overflow_when_added() {
        let big = <i64 as FlowNum>::big_value();
        assert!(big.checked_add(big).is_some());
        assert!(<f64 as FlowNum>::big_value().is_infinite());
        assert!(!f64::NAN.is_valid_capacity());
        assert!(!(-1i32).is_valid_capacity());
    }

    #[test]
    fn test_checked_capacity_sums() {
        assert_eq!(i64::MAX.add_checked(&1), None);
        assert_eq!(3i32.add_checked(&4), Some(7));
        assert_eq!(
            f64::INFINITY.add_checked(&1.0),
            Some(f64::INFINITY)
        );
        assert!(f32::INFINITY.is_unbounded());
        assert!(!i128::MAX.is_unbounded());
        assert!(!1.5f64.is_unbounded());
    }

    #[test]
    fn test_interrupt_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let config = SolverConfig::default().with_interrupt(flag.clone());
        assert!(!config.interrupted());
        flag.store(true, Ordering::Relaxed);
        assert!(config.interrupted());
        assert!(!SolverConfig::default().interrupted());
    }
}
