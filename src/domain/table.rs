//! In-memory time-series tables.
//!
//! A [`TimeSeriesTable`] is an ordered index plus named columns of equal length.
//! Numeric columns hold `Option<f64>` so missing observations stay explicit all
//! the way to the masked target series handed to the model.

use crate::domain::{IndexKey, IndexKind};
use crate::error::{AppError, Result};

/// A strictly increasing, homogeneous time index.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIndex {
    keys: Vec<IndexKey>,
}

impl TimeIndex {
    pub fn new(keys: Vec<IndexKey>) -> Result<Self> {
        if let Some(first) = keys.first() {
            let kind = first.kind();
            if let Some(bad) = keys.iter().find(|k| k.kind() != kind) {
                return Err(AppError::Schema(format!(
                    "Index mixes {kind:?} and {:?} entries (first offender: {bad}).",
                    bad.kind()
                )));
            }
        }
        if let Some(w) = keys.windows(2).find(|w| w[0] >= w[1]) {
            return Err(AppError::Schema(format!(
                "Index must be strictly increasing and unique: {} is followed by {}.",
                w[0], w[1]
            )));
        }
        Ok(Self { keys })
    }

    /// The index kind, or `None` for an empty index.
    pub fn kind(&self) -> Option<IndexKind> {
        self.keys.first().map(IndexKey::kind)
    }

    pub fn keys(&self) -> &[IndexKey] {
        &self.keys
    }

    pub fn first(&self) -> Option<&IndexKey> {
        self.keys.first()
    }

    pub fn last(&self) -> Option<&IndexKey> {
        self.keys.last()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Column storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn values(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn missing_count(&self) -> usize {
        (0..self.data.len()).filter(|&i| self.data.is_missing(i)).count()
    }

    /// Non-missing numeric observations (empty for text columns).
    pub fn observed(&self) -> Vec<f64> {
        self.values()
            .map(|v| v.iter().flatten().copied().collect())
            .unwrap_or_default()
    }
}

/// An ordered-by-time table of named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    index: TimeIndex,
    columns: Vec<Column>,
}

impl TimeSeriesTable {
    pub fn new(index: TimeIndex, columns: Vec<Column>) -> Result<Self> {
        for (i, col) in columns.iter().enumerate() {
            if col.data.len() != index.len() {
                return Err(AppError::Schema(format!(
                    "Column `{}` has {} values but the index has {} entries.",
                    col.name,
                    col.data.len(),
                    index.len()
                )));
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(AppError::Schema(format!("Duplicate column name `{}`.", col.name)));
            }
        }
        Ok(Self { index, columns })
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Project onto `names`, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<TimeSeriesTable> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name)
                    .cloned()
                    .ok_or_else(|| AppError::MissingColumn((*name).to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TimeSeriesTable {
            index: self.index.clone(),
            columns,
        })
    }

    /// Keep the rows whose index key satisfies `keep`.
    pub fn filter_rows(&self, keep: impl Fn(&IndexKey) -> bool) -> TimeSeriesTable {
        let rows: Vec<usize> = self
            .index
            .keys()
            .iter()
            .enumerate()
            .filter(|(_, k)| keep(k))
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&rows)
    }

    /// Drop every row with at least one missing value.
    pub fn drop_missing_rows(&self) -> TimeSeriesTable {
        let rows: Vec<usize> = (0..self.len())
            .filter(|&i| self.columns.iter().all(|c| !c.data.is_missing(i)))
            .collect();
        self.take_rows(&rows)
    }

    /// Append `other` below `self`. Column names must match in order and the
    /// combined index must stay strictly increasing.
    pub fn concat_rows(&self, other: &TimeSeriesTable) -> Result<TimeSeriesTable> {
        if self.column_names() != other.column_names() {
            return Err(AppError::Schema(format!(
                "Cannot concatenate tables with different columns: {:?} vs {:?}.",
                self.column_names(),
                other.column_names()
            )));
        }
        let mut keys = self.index.keys().to_vec();
        keys.extend_from_slice(other.index.keys());
        let index = TimeIndex::new(keys)?;

        let columns = self
            .columns
            .iter()
            .zip(&other.columns)
            .map(|(a, b)| {
                let data = match (&a.data, &b.data) {
                    (ColumnData::Numeric(x), ColumnData::Numeric(y)) => {
                        ColumnData::Numeric(x.iter().chain(y).copied().collect())
                    }
                    (ColumnData::Text(x), ColumnData::Text(y)) => {
                        ColumnData::Text(x.iter().chain(y).cloned().collect())
                    }
                    _ => {
                        return Err(AppError::Schema(format!(
                            "Column `{}` is numeric in one table and text in the other.",
                            a.name
                        )));
                    }
                };
                Ok(Column {
                    name: a.name.clone(),
                    data,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TimeSeriesTable { index, columns })
    }

    /// Replace the columns while keeping the index.
    pub(crate) fn with_columns(&self, columns: Vec<Column>) -> Result<TimeSeriesTable> {
        TimeSeriesTable::new(self.index.clone(), columns)
    }

    fn take_rows(&self, rows: &[usize]) -> TimeSeriesTable {
        let keys = rows.iter().map(|&i| self.index.keys()[i]).collect();
        TimeSeriesTable {
            // A subsequence of a strictly increasing index is strictly increasing.
            index: TimeIndex { keys },
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(rows),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TimeSeriesTable {
        let index = TimeIndex::new((1..=4).map(IndexKey::Integer).collect()).unwrap();
        TimeSeriesTable::new(
            index,
            vec![
                Column::numeric("y", vec![Some(1.0), None, Some(3.0), Some(4.0)]),
                Column::numeric("x", vec![Some(0.5), Some(0.6), Some(0.7), Some(0.8)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn index_rejects_duplicates_and_disorder() {
        let dup = TimeIndex::new(vec![IndexKey::Integer(1), IndexKey::Integer(1)]);
        assert!(matches!(dup, Err(AppError::Schema(_))));
        let back = TimeIndex::new(vec![IndexKey::Integer(2), IndexKey::Integer(1)]);
        assert!(matches!(back, Err(AppError::Schema(_))));
    }

    #[test]
    fn filter_and_drop_missing() {
        let t = table();
        let tail = t.filter_rows(|k| *k > IndexKey::Integer(1));
        assert_eq!(tail.len(), 3);
        let clean = tail.drop_missing_rows();
        assert_eq!(clean.index().keys(), &[IndexKey::Integer(3), IndexKey::Integer(4)]);
    }

    #[test]
    fn concat_requires_increasing_index() {
        let t = table();
        let head = t.filter_rows(|k| *k <= IndexKey::Integer(2));
        let tail = t.filter_rows(|k| *k > IndexKey::Integer(2));
        assert_eq!(head.concat_rows(&tail).unwrap(), t);
        assert!(tail.concat_rows(&head).is_err());
    }

    #[test]
    fn select_unknown_column_is_missing_column() {
        let err = table().select(&["z"]).unwrap_err();
        assert!(matches!(err, AppError::MissingColumn(name) if name == "z"));
    }
}
