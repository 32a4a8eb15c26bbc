use std::collections::BTreeMap;

use super::resample::TimeSeries;

/// A time-indexed table of f64 columns. Rows are keyed by a unique timestamp (nanoseconds since
/// the epoch) and kept sorted. Missing values are NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: BTreeMap<i64, Vec<f64>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.rows.keys().next().copied()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.rows.keys().next_back().copied()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (i64, &[f64])> + '_ {
        self.rows.iter().map(|(t, row)| (*t, row.as_slice()))
    }

    /// Insert a full row, replacing any row already held at that timestamp. Short rows are
    /// padded with NaN.
    pub fn push_row(&mut self, timestamp: i64, mut values: Vec<f64>) {
        values.resize(self.columns.len(), f64::NAN);
        self.rows.insert(timestamp, values);
    }

    /// Add an empty column (all NaN) and return its index. Existing columns are left alone.
    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in self.rows.values_mut() {
            row.push(f64::NAN);
        }
        self.columns.len() - 1
    }

    /// Outer join a series into the table as column `name`
    pub fn insert_series(&mut self, name: &str, series: &TimeSeries) {
        let idx = self.ensure_column(name);
        let width = self.columns.len();
        for (t, v) in series.iter() {
            let row = self
                .rows
                .entry(t)
                .or_insert_with(|| vec![f64::NAN; width]);
            row[idx] = v;
        }
    }

    /// Set a column from values aligned with the current rows
    pub fn set_column(&mut self, name: &str, values: &[f64]) {
        let idx = self.ensure_column(name);
        for (row, v) in self.rows.values_mut().zip(values.iter()) {
            row[idx] = *v;
        }
    }

    pub fn column(&self, name: &str) -> Option<TimeSeries> {
        let idx = self.column_index(name)?;
        Some(TimeSeries {
            times: self.rows.keys().copied().collect(),
            values: self.rows.values().map(|row| row[idx]).collect(),
        })
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.values().map(|row| row[idx]).collect())
    }

    /// Drop every row that holds a NaN in any column
    pub fn drop_missing(&mut self) {
        self.rows.retain(|_, row| row.iter().all(|v| !v.is_nan()));
    }

    /// Fill NaN values by linear interpolation in time between the surrounding valid values.
    /// Leading and trailing gaps take the nearest valid value. All-NaN columns are untouched.
    pub fn interpolate_time(&mut self) {
        let times: Vec<i64> = self.rows.keys().copied().collect();
        for idx in 0..self.columns.len() {
            let values: Vec<f64> = self.rows.values().map(|row| row[idx]).collect();
            let filled = interpolate(&times, &values);
            for (row, v) in self.rows.values_mut().zip(filled) {
                row[idx] = v;
            }
        }
    }

    /// Union with another table. Where both hold a timestamp, the other table's row wins.
    pub fn merge_keep_last(&mut self, other: Table) {
        let indices: Vec<usize> = other
            .columns
            .iter()
            .map(|name| self.ensure_column(name))
            .collect();
        let width = self.columns.len();
        for (t, other_row) in other.rows {
            let mut row = vec![f64::NAN; width];
            for (src, dst) in indices.iter().enumerate() {
                row[*dst] = other_row[src];
            }
            self.rows.insert(t, row);
        }
    }
}

fn interpolate(times: &[i64], values: &[f64]) -> Vec<f64> {
    let valid: Vec<usize> = (0..values.len()).filter(|i| !values[*i].is_nan()).collect();
    let (first, last) = match (valid.first(), valid.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return values.to_vec(),
    };

    let mut out = values.to_vec();
    out[..first].iter_mut().for_each(|v| *v = values[first]);
    out[last + 1..].iter_mut().for_each(|v| *v = values[last]);
    for pair in valid.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let span = (times[b] - times[a]) as f64;
        for i in a + 1..b {
            let frac = (times[i] - times[a]) as f64 / span;
            out[i] = values[a] + frac * (values[b] - values[a]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(times: &[i64], values: &[f64]) -> TimeSeries {
        TimeSeries::new(times.to_vec(), values.to_vec())
    }

    #[test]
    fn test_outer_join() {
        let mut table = Table::new();
        table.insert_series("LF", &series(&[0, 10, 20], &[1.0, 2.0, 3.0]));
        table.insert_series("HF", &series(&[10, 30], &[4.0, 5.0]));
        assert_eq!(table.columns(), ["LF", "HF"]);
        assert_eq!(table.len(), 4);
        let hf = table.column("HF").unwrap();
        assert_eq!(hf.times, vec![0, 10, 20, 30]);
        assert!(hf.values[0].is_nan());
        assert_eq!(hf.values[1], 4.0);
        assert!(table.column_values("LF").unwrap()[3].is_nan());

        table.drop_missing();
        assert_eq!(table.timestamps().collect::<Vec<_>>(), vec![10]);
    }

    #[test]
    fn test_interpolate_time() {
        let mut table = Table::with_columns(vec!["a".to_string()]);
        table.push_row(0, vec![f64::NAN]);
        table.push_row(10, vec![1.0]);
        table.push_row(20, vec![f64::NAN]);
        table.push_row(40, vec![4.0]);
        table.push_row(50, vec![f64::NAN]);
        table.interpolate_time();
        assert_eq!(table.column_values("a").unwrap(), vec![1.0, 1.0, 2.0, 4.0, 4.0]);
    }

    #[test]
    fn test_merge_keep_last() {
        let mut first = Table::with_columns(vec!["a".to_string(), "b".to_string()]);
        first.push_row(0, vec![1.0, 2.0]);
        first.push_row(10, vec![3.0, 4.0]);
        let mut second = Table::with_columns(vec!["b".to_string(), "a".to_string()]);
        second.push_row(10, vec![40.0, 30.0]);
        second.push_row(20, vec![60.0, 50.0]);
        first.merge_keep_last(second);
        assert_eq!(first.columns(), ["a", "b"]);
        assert_eq!(first.column_values("a").unwrap(), vec![1.0, 30.0, 50.0]);
        assert_eq!(first.column_values("b").unwrap(), vec![2.0, 40.0, 60.0]);
        assert_eq!(first.first_timestamp(), Some(0));
        assert_eq!(first.last_timestamp(), Some(20));
    }
}
