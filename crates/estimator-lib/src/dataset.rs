//! Tabular training data
//!
//! A column-named table of optional numeric cells loaded from CSV. Empty,
//! `NA`/`NaN` and non-numeric cells load as missing values; the trainer
//! drops rows with missing values in the columns it uses.

use crate::error::{EstimatorError, Result};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Numeric table with named columns and possibly-missing cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Load a table from a CSV file with a header row
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EstimatorError::Data(format!(
                "dataset not found: {}",
                path.display()
            )));
        }

        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            rows = table.len(),
            columns = table.columns.len(),
            "Loaded dataset"
        );
        Ok(table)
    }

    /// Load a table from any CSV source with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Self::new(columns);

        for record in reader.records() {
            let record = record?;
            let row = (0..table.columns.len())
                .map(|i| record.get(i).and_then(parse_cell))
                .collect();
            table.rows.push(row);
        }

        Ok(table)
    }

    /// Append a row; it must have one cell per column
    pub fn push_row(&mut self, row: Vec<Option<f64>>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EstimatorError::Data(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Set a column from per-row values, replacing it if it already exists
    pub fn set_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(EstimatorError::Data(format!(
                "column '{}' has {} values, table has {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }
}

fn parse_cell(raw: &str) -> Option<f64> {
    match raw {
        "" | "NA" | "N/A" | "NaN" | "nan" | "null" => None,
        _ => raw.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Age,Weight,Height,BodyFat\n\
                       23,154.25,67.75,12.3\n\
                       22, 173.25 ,72.25,6.1\n\
                       ,150,NA,25.3\n\
                       26,abc,66.25,10.4\n";

    #[test]
    fn test_from_reader_parses_cells() {
        let table = Table::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.columns(), &["Age", "Weight", "Height", "BodyFat"]);
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[1][1], Some(173.25));
        assert_eq!(table.rows()[2][0], None);
        assert_eq!(table.rows()[2][2], None);
        assert_eq!(table.rows()[3][1], None);
    }

    #[test]
    fn test_missing_file_is_data_error() {
        let err = Table::from_csv_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, EstimatorError::Data(_)));
    }

    #[test]
    fn test_set_column_appends_and_replaces() {
        let mut table = Table::from_reader(CSV.as_bytes()).unwrap();
        table
            .set_column("Height_cm", vec![Some(1.0), Some(2.0), None, Some(4.0)])
            .unwrap();
        assert!(table.has_column("Height_cm"));
        assert_eq!(table.columns().len(), 5);

        table
            .set_column("Height_cm", vec![Some(9.0), None, None, None])
            .unwrap();
        assert_eq!(table.columns().len(), 5);
        assert_eq!(table.column("Height_cm").unwrap()[0], Some(9.0));
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        assert!(table.push_row(vec![Some(1.0)]).is_err());
        assert!(table.push_row(vec![Some(1.0), None]).is_ok());
        assert_eq!(table.len(), 1);
    }
}
