use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A spatial or temporal partition of a data source, such as a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Range {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Cache key of a partition: `"x:y:z"`, or `""` for the whole source.
    pub fn key(range: Option<&Range>) -> String {
        range.map(Range::to_string).unwrap_or_default()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.x, self.y, self.z)
    }
}

impl FromStr for Range {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [x, y, z] = parts.as_slice() else {
            return Err(format!("expected x:y:z, got \"{s}\""));
        };
        let parse = |p: &str| {
            p.trim()
                .parse::<i64>()
                .map_err(|e| format!("invalid range component \"{p}\": {e}"))
        };
        Ok(Range::new(parse(x)?, parse(y)?, parse(z)?))
    }
}
