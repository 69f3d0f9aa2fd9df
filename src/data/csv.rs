//! CSV feature loading
//!
//! Every non-empty, non-comment line is one positional feature vector. When
//! the file is labelled, the last column holds the ±1 class label. A leading
//! header line is detected and skipped automatically.

use crate::core::{DenseFeatures, Result, SVMError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Feature vectors loaded from CSV, with optional labels
#[derive(Debug, Clone)]
pub struct CSVDataset {
    features: DenseFeatures,
    labels: Option<Vec<f64>>,
}

impl CSVDataset {
    /// Load a CSV file; `labelled` selects whether the last column is a label
    pub fn from_file<P: AsRef<Path>>(path: P, labelled: bool) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::from_reader(BufReader::new(file), labelled)
    }

    /// Load CSV text from a reader
    pub fn from_reader<R: BufRead>(reader: R, labelled: bool) -> Result<Self> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut labels = Vec::new();
        let mut seen_data = false;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if !seen_data && Self::is_header_line(line) {
                seen_data = true;
                continue;
            }
            seen_data = true;

            let mut values = Self::parse_data_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            if labelled {
                let label = values.pop().ok_or_else(|| {
                    SVMError::ParseError(format!("Line {} has no label column", line_num + 1))
                })?;
                if label != 1.0 && label != -1.0 {
                    return Err(SVMError::ParseError(format!(
                        "Invalid label on line {}: expected -1 or +1, got {}",
                        line_num + 1,
                        label
                    )));
                }
                labels.push(label);
            }
            if let Some(first) = rows.first() {
                if first.len() != values.len() {
                    return Err(SVMError::ParseError(format!(
                        "Line {} has {} features, expected {}",
                        line_num + 1,
                        values.len(),
                        first.len()
                    )));
                }
            }
            rows.push(values);
        }

        if rows.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        let features = DenseFeatures::from_rows(&rows)?;
        Ok(Self {
            features,
            labels: labelled.then_some(labels),
        })
    }

    /// A header has mostly non-numeric fields
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();
        let non_numeric_count = fields
            .iter()
            .filter(|field| field.trim().parse::<f64>().is_err())
            .count();
        non_numeric_count * 2 > fields.len()
    }

    fn parse_data_line(line: &str) -> std::result::Result<Vec<f64>, String> {
        line.split(',')
            .map(|field| {
                let field = field.trim();
                field
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{field}'"))
            })
            .collect()
    }

    pub fn features(&self) -> &DenseFeatures {
        &self.features
    }

    pub fn labels(&self) -> Option<&[f64]> {
        self.labels.as_deref()
    }

    /// Split into the feature matrix and labels
    pub fn into_parts(self) -> (DenseFeatures, Option<Vec<f64>>) {
        (self.features, self.labels)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_unlabelled_rows() {
        let data = "0.0,1.0,2.0\n# comment\n\n3.0,4.0,5.0\n";
        let dataset = CSVDataset::from_reader(Cursor::new(data), false).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.features().dim(), 3);
        assert_eq!(dataset.features().row(1), &[3.0, 4.0, 5.0]);
        assert!(dataset.labels().is_none());
    }

    #[test]
    fn test_labelled_rows_with_header() {
        let data = "p1,p2,label\n0.5,0.25,1\n-0.5,0.75,-1\n";
        let dataset = CSVDataset::from_reader(Cursor::new(data), true).unwrap();

        assert_eq!(dataset.features().dim(), 2);
        assert_eq!(dataset.labels(), Some(&[1.0, -1.0][..]));

        let (features, labels) = dataset.into_parts();
        assert_eq!(features.row(0), &[0.5, 0.25]);
        assert_eq!(labels.unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_label() {
        let data = "1.0,2.0,3\n";
        let result = CSVDataset::from_reader(Cursor::new(data), true);
        assert!(matches!(result, Err(SVMError::ParseError(_))));
    }

    #[test]
    fn test_ragged_rows() {
        let data = "1.0,2.0\n1.0,2.0,3.0\n";
        let result = CSVDataset::from_reader(Cursor::new(data), false);
        assert!(matches!(result, Err(SVMError::ParseError(_))));
    }

    #[test]
    fn test_bad_number_reports_line() {
        let data = "1.0,2.0\n1.0,abc\n";
        match CSVDataset::from_reader(Cursor::new(data), false) {
            Err(SVMError::ParseError(msg)) => assert!(msg.contains("line 2")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        let result = CSVDataset::from_reader(Cursor::new("# nothing\n"), false);
        assert!(matches!(result, Err(SVMError::EmptyDataset)));
    }
}
