use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Unit {
    B,
    KB,
    MB,
    GB,
    TB,
    PB,
    EB,
    ZB,
    YB,
}

impl Unit {
    const ALL: [Unit; 9] = [
        Unit::B,
        Unit::KB,
        Unit::MB,
        Unit::GB,
        Unit::TB,
        Unit::PB,
        Unit::EB,
        Unit::ZB,
        Unit::YB,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::B => "B",
            Unit::KB => "KB",
            Unit::MB => "MB",
            Unit::GB => "GB",
            Unit::TB => "TB",
            Unit::PB => "PB",
            Unit::EB => "EB",
            Unit::ZB => "ZB",
            Unit::YB => "YB",
        }
    }
}

/// A byte count scaled for display. Never use `value` for comparisons;
/// keep the original integer for that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HumanSize {
    pub value: f64,
    pub unit: Unit,
}

impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.value, self.unit.as_str())
    }
}

/// Scales `bytes` by powers of 1024 until it drops below 1024, stopping at YB.
pub fn humanize(bytes: u64) -> HumanSize {
    let mut value = bytes as f64;
    let mut index = 0;

    while value >= 1024.0 && index < Unit::ALL.len() - 1 {
        value /= 1024.0;
        index += 1;
    }

    HumanSize {
        value,
        unit: Unit::ALL[index],
    }
}
