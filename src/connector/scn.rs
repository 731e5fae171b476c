use std::fmt;
use std::str::FromStr;

use oracle::sql_type::{FromSql, OracleType, ToSql};
use oracle::Connection;
use serde::{Deserialize, Serialize};

/// A system change number.
///
/// SCNs totally order changes in the database. Zero is the "unset" sentinel;
/// each database version additionally has a maximum sentinel that shows up as
/// the next-change field of the current redo log. Every documented sentinel
/// fits in 64 bits, so comparisons stay plain integer comparisons.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Scn(u64);

impl Scn {
    pub const ZERO: Scn = Scn(0);

    /// Maximum SCN on 11.2 through 12.1.
    pub const MAX_11_2: Scn = Scn((1 << 48) - 1);
    /// Maximum SCN on 12.2 through 19.5.
    pub const MAX_12_2: Scn = Scn(u64::MAX);
    /// Maximum SCN on 19.6 and later.
    pub const MAX_19_6: Scn = Scn(9_295_429_630_892_703_743);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Zero is never a valid change number, only the "not yet set" marker.
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }

    pub const fn saturating_add(self, delta: u64) -> Scn {
        Scn(self.0.saturating_add(delta))
    }

    /// How far `self` is ahead of `earlier`, or zero if it is not.
    pub const fn gap_from(self, earlier: Scn) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// The maximum SCN sentinel for a database version, or `None` when the
    /// version predates mining support.
    pub fn max_for_version(version: DatabaseVersion) -> Option<Scn> {
        let DatabaseVersion { major, maintenance } = version;
        if (major == 19 && maintenance >= 6) || major > 19 {
            Some(Self::MAX_19_6)
        } else if (major == 12 && maintenance >= 2) || major > 12 {
            Some(Self::MAX_12_2)
        } else if (major == 11 && maintenance >= 2) || major == 12 {
            Some(Self::MAX_11_2)
        } else {
            None
        }
    }
}

impl From<u64> for Scn {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Scn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Scn {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Scn)
    }
}

impl FromSql for Scn {
    fn from_sql(val: &oracle::SqlValue) -> oracle::Result<Self> {
        let v: u64 = val.get()?;
        Ok(Scn(v))
    }
}

impl ToSql for Scn {
    fn oratype(&self, _conn: &Connection) -> oracle::Result<OracleType> {
        Ok(OracleType::Number(20, 0))
    }

    fn to_sql(&self, val: &mut oracle::SqlValue) -> oracle::Result<()> {
        val.set(&self.0)
    }
}

/// Major and maintenance release of the connected database, as parsed from
/// its version banner. Only these two fields matter for SCN sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseVersion {
    pub major: u32,
    pub maintenance: u32,
}

impl fmt::Display for DatabaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.maintenance)
    }
}
