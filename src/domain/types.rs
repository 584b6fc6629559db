//! Shared domain types.
//!
//! These types are intentionally small and copyable where possible so they can be:
//!
//! - used as join keys while reshaping evaluation output
//! - exported to CSV/JSON
//! - compared and ordered without allocating

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Date formats accepted for date-valued index entries and period bounds.
///
/// ISO first; the others show up in spreadsheet exports often enough to be worth
/// accepting. Parsing stays deterministic because the first match wins.
const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

const TIMESTAMP_FMTS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// One entry of a time index.
///
/// A table's index is homogeneous: every key has the same [`IndexKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexKey {
    Integer(i64),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl IndexKey {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexKey::Integer(_) => IndexKind::Integer,
            IndexKey::Date(_) => IndexKind::Date,
            IndexKey::Timestamp(_) => IndexKind::Timestamp,
        }
    }

    /// Position on a continuous axis, used for plotting.
    ///
    /// Dates map to days since the Unix epoch, timestamps to seconds.
    pub fn as_f64(&self) -> f64 {
        match self {
            IndexKey::Integer(v) => *v as f64,
            IndexKey::Date(d) => {
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
                (*d - epoch).num_days() as f64
            }
            IndexKey::Timestamp(ts) => ts.and_utc().timestamp() as f64,
        }
    }

    /// Convert this key to `kind`, if there is a lossless (or conventional) mapping.
    ///
    /// A date becomes midnight on a timestamp index; nothing else converts.
    pub fn coerce_to(self, kind: IndexKind) -> Option<IndexKey> {
        match (self, kind) {
            (key, kind) if key.kind() == kind => Some(key),
            (IndexKey::Date(d), IndexKind::Timestamp) => {
                Some(IndexKey::Timestamp(d.and_time(NaiveTime::MIN)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Integer(v) => write!(f, "{v}"),
            IndexKey::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            IndexKey::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<NaiveDate> for IndexKey {
    fn from(value: NaiveDate) -> Self {
        IndexKey::Date(value)
    }
}

impl From<NaiveDateTime> for IndexKey {
    fn from(value: NaiveDateTime) -> Self {
        IndexKey::Timestamp(value)
    }
}

impl From<i64> for IndexKey {
    fn from(value: i64) -> Self {
        IndexKey::Integer(value)
    }
}

/// The native type of a time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Integer,
    Date,
    Timestamp,
}

impl IndexKind {
    /// Parse text into a key of this kind.
    pub fn parse(self, s: &str) -> Option<IndexKey> {
        let s = s.trim();
        match self {
            IndexKind::Integer => s.parse::<i64>().ok().map(IndexKey::Integer),
            IndexKind::Date => DATE_FMTS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(IndexKey::Date),
            IndexKind::Timestamp => TIMESTAMP_FMTS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(IndexKey::Timestamp)
                .or_else(|| IndexKind::Date.parse(s).and_then(|k| k.coerce_to(IndexKind::Timestamp))),
        }
    }

    /// Guess the kind of an index from its first entry: integer, then date, then timestamp.
    pub fn infer(sample: &str) -> Option<IndexKind> {
        [IndexKind::Integer, IndexKind::Date, IndexKind::Timestamp]
            .into_iter()
            .find(|kind| kind.parse(sample).is_some())
    }
}

/// A period boundary as supplied by the caller, before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum PeriodBound {
    Key(IndexKey),
    Text(String),
}

impl From<IndexKey> for PeriodBound {
    fn from(value: IndexKey) -> Self {
        PeriodBound::Key(value)
    }
}

impl From<NaiveDate> for PeriodBound {
    fn from(value: NaiveDate) -> Self {
        PeriodBound::Key(IndexKey::Date(value))
    }
}

impl From<i64> for PeriodBound {
    fn from(value: i64) -> Self {
        PeriodBound::Key(IndexKey::Integer(value))
    }
}

impl From<&str> for PeriodBound {
    fn from(value: &str) -> Self {
        PeriodBound::Text(value.to_string())
    }
}

impl From<String> for PeriodBound {
    fn from(value: String) -> Self {
        PeriodBound::Text(value)
    }
}

impl fmt::Display for PeriodBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodBound::Key(k) => write!(f, "{k}"),
            PeriodBound::Text(s) => write!(f, "'{s}'"),
        }
    }
}

/// A validated, inclusive `[start, end]` window over a time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: IndexKey,
    pub end: IndexKey,
}

impl Period {
    pub fn contains(&self, key: &IndexKey) -> bool {
        *key >= self.start && *key <= self.end
    }
}

/// The pre- and post-intervention periods of one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periods {
    pub pre: Period,
    pub post: Period,
}

/// Presentation of the outcome.
///
/// Variant order is the display order (`Original < Pointwise < Cumulative`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Original,
    PointEffects,
    CumulativeEffects,
}

impl Scale {
    pub const ALL: [Scale; 3] = [Scale::Original, Scale::PointEffects, Scale::CumulativeEffects];

    pub fn as_str(self) -> &'static str {
        match self {
            Scale::Original => "original",
            Scale::PointEffects => "point_effects",
            Scale::CumulativeEffects => "cumulative_effects",
        }
    }

    pub fn pretty(self) -> &'static str {
        match self {
            Scale::Original => "Original",
            Scale::PointEffects => "Pointwise",
            Scale::CumulativeEffects => "Cumulative",
        }
    }
}

/// Any statistic an evaluation table may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Observed,
    Mean,
    Median,
    Lower,
    Upper,
    Std,
}

impl Statistic {
    pub const ALL: [Statistic; 6] = [
        Statistic::Observed,
        Statistic::Mean,
        Statistic::Median,
        Statistic::Lower,
        Statistic::Upper,
        Statistic::Std,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Statistic::Observed => "observed",
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Lower => "lower",
            Statistic::Upper => "upper",
            Statistic::Std => "std",
        }
    }

    pub fn from_name(s: &str) -> Option<Statistic> {
        Statistic::ALL.into_iter().find(|stat| stat.as_str() == s)
    }

    /// The line statistic this maps to, if it is drawn as a line.
    pub fn as_line(self) -> Option<LineStat> {
        match self {
            Statistic::Observed => Some(LineStat::Observed),
            Statistic::Mean => Some(LineStat::Mean),
            Statistic::Median => Some(LineStat::Median),
            Statistic::Lower | Statistic::Upper | Statistic::Std => None,
        }
    }
}

/// Statistics drawn as lines in the plot frame.
///
/// Variant order is the display order (`Observed < Mean < Median`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStat {
    Observed,
    Mean,
    Median,
}

impl LineStat {
    pub fn as_str(self) -> &'static str {
        match self {
            LineStat::Observed => "observed",
            LineStat::Mean => "mean",
            LineStat::Median => "median",
        }
    }

    pub fn pretty(self) -> &'static str {
        match self {
            LineStat::Observed => "Observed",
            LineStat::Mean => "Mean",
            LineStat::Median => "Median",
        }
    }
}

/// How an uncertainty band was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BandMethod {
    /// Posterior quantiles (`*_lower` / `*_upper` columns).
    Quantiles,
    /// Normal approximation `mean ± z·std`.
    Std,
}

impl BandMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            BandMethod::Quantiles => "quantiles",
            BandMethod::Std => "std",
        }
    }
}
