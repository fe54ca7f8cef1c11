use std::io::Read;

use hashbrown::HashMap;

use crate::errors::{AllergenError, Result};
use crate::labels::{LABELS, N_LABELS};
use crate::normalizer::normalize;

/// Name of the text column.
pub const TEXT_COLUMN: &str = "text";

/// Labeled corpus. Texts are normalized when they are added.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    texts: Vec<String>,
    labels: Vec<[bool; N_LABELS]>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a CSV file with a header row.
    ///
    /// The `text` column and every label column are looked up by name; other columns are ignored.
    ///
    /// # Errors
    ///
    /// * [`AllergenError::Schema`] if the header or a record lacks a required column.
    /// * [`AllergenError::LabelValue`] if a label cell is not 0, 1 or a missing value.
    pub fn from_csv_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
        let headers = rdr.headers()?.clone();
        for column in std::iter::once(TEXT_COLUMN).chain(LABELS) {
            if !headers.iter().any(|h| h == column) {
                return Err(AllergenError::schema(None, column));
            }
        }

        let mut dataset = Self::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            dataset.push_row(i + 1, headers.iter().zip(record.iter()))?;
        }
        log::info!("# of rows: {}", dataset.len());
        Ok(dataset)
    }

    /// Adds one row given as `(column, value)` pairs.
    ///
    /// A missing label value (empty cell) is 0. A missing column is an error.
    pub fn push_fields<'a, I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.push_row(self.len() + 1, fields)
    }

    fn push_row<'a, I>(&mut self, row: usize, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let fields: HashMap<&str, &str> = fields.into_iter().collect();
        let text = *fields
            .get(TEXT_COLUMN)
            .ok_or_else(|| AllergenError::schema(Some(row), TEXT_COLUMN))?;
        let mut labels = [false; N_LABELS];
        for (label, column) in labels.iter_mut().zip(LABELS) {
            let value = fields
                .get(column)
                .ok_or_else(|| AllergenError::schema(Some(row), column))?;
            *label = parse_label(value)
                .ok_or_else(|| AllergenError::label_value(row, column, *value))?;
        }
        self.push(text, labels);
        Ok(())
    }

    /// Adds a text with its labels in [`LABELS`] order.
    pub fn push<S>(&mut self, text: S, labels: [bool; N_LABELS])
    where
        S: AsRef<str>,
    {
        self.texts.push(normalize(text));
        self.labels.push(labels);
    }

    /// Normalized texts.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Labels of each row, in [`LABELS`] order.
    pub fn labels(&self) -> &[[bool; N_LABELS]] {
        &self.labels
    }

    /// Binary targets of the `idx`-th label.
    pub fn label_column(&self, idx: usize) -> impl Iterator<Item = bool> + '_ {
        self.labels.iter().map(move |ls| ls[idx])
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Cell contents read as a missing value.
const NA_VALUES: [&str; 19] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "",
];

/// Parses a label cell. A missing value means 0.
fn parse_label(value: &str) -> Option<bool> {
    let value = value.trim();
    if NA_VALUES.contains(&value) {
        return Some(false);
    }
    match value.parse::<f64>() {
        Ok(v) if v == 0.0 => Some(false),
        Ok(v) if v == 1.0 => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "text,peanuts,tree_nuts,milk,eggs,fish,shellfish,wheat_gluten,soy,sesame";

    #[test]
    fn test_from_csv_reader() {
        let csv = format!(
            "{HEADER}\n\
             \"<b>Peanut</b> Butter, 2 tbsp\",1,0,0,0,0,0,0,0,0\n\
             Salmon fillet,0,0,0,0,1.0,,0,0,0\n"
        );
        let ds = Dataset::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(vec!["peanut butter tbsp", "salmon fillet"], ds.texts());
        assert_eq!(
            vec![
                [true, false, false, false, false, false, false, false, false],
                [false, false, false, false, true, false, false, false, false],
            ],
            ds.labels()
        );
        assert_eq!(vec![false, true], ds.label_column(4).collect::<Vec<_>>());
    }

    #[test]
    fn test_from_csv_reader_extra_columns_and_order() {
        let csv = "id,sesame,soy,wheat_gluten,shellfish,fish,eggs,milk,tree_nuts,peanuts,text\n\
                   7,1,0,0,0,0,0,0,0,0,tahini\n";
        let ds = Dataset::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(vec!["tahini"], ds.texts());
        assert!(ds.labels()[0][8]);
        assert!(!ds.labels()[0][0]);
    }

    #[test]
    fn test_from_csv_reader_empty_text() {
        let csv = format!("{HEADER}\n,0,0,0,0,0,0,0,0,0\n");
        let ds = Dataset::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(vec![""], ds.texts());
    }

    #[test]
    fn test_from_csv_reader_missing_header_column() {
        let csv = "text,peanuts,tree_nuts,eggs,fish,shellfish,wheat_gluten,soy,sesame\n\
                   bread,0,0,0,0,0,1,0,0\n";
        let err = Dataset::from_csv_reader(csv.as_bytes()).err().unwrap();

        assert_eq!("SchemaError: header: missing column `milk`", &err.to_string());
        match err {
            AllergenError::Schema(e) => assert_eq!("milk", e.column()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_from_csv_reader_missing_text_header() {
        let csv = "body,peanuts,tree_nuts,milk,eggs,fish,shellfish,wheat_gluten,soy,sesame\n";
        let err = Dataset::from_csv_reader(csv.as_bytes()).err().unwrap();

        assert_eq!("SchemaError: header: missing column `text`", &err.to_string());
    }

    #[test]
    fn test_from_csv_reader_short_record() {
        let csv = format!(
            "{HEADER}\n\
             toast,0,0,0,1,0,0,1,0,0\n\
             cheese,0,0,1\n"
        );
        let err = Dataset::from_csv_reader(csv.as_bytes()).err().unwrap();

        assert_eq!("SchemaError: row 2: missing column `eggs`", &err.to_string());
    }

    #[test]
    fn test_from_csv_reader_invalid_label() {
        let csv = format!("{HEADER}\nsoy sauce,0,0,0,0,0,0,0,2,0\n");
        let err = Dataset::from_csv_reader(csv.as_bytes()).err().unwrap();

        assert_eq!(
            "LabelValueError: row 1: column `soy`: invalid label value \"2\"",
            &err.to_string()
        );
    }

    #[test]
    fn test_from_csv_reader_non_numeric_label() {
        let csv = format!("{HEADER}\nsoy sauce,0,0,0,0,0,0,0,yes,0\n");
        let err = Dataset::from_csv_reader(csv.as_bytes()).err().unwrap();

        assert!(matches!(err, AllergenError::LabelValue(_)));
    }

    #[test]
    fn test_push_fields_missing_milk() {
        let mut ds = Dataset::new();
        let fields = [
            ("text", "Pancakes"),
            ("peanuts", "0"),
            ("tree_nuts", "0"),
            ("eggs", "1"),
            ("fish", "0"),
            ("shellfish", "0"),
            ("wheat_gluten", "1"),
            ("soy", "0"),
            ("sesame", "0"),
        ];
        let err = ds.push_fields(fields).err().unwrap();

        match err {
            AllergenError::Schema(e) => {
                assert_eq!("milk", e.column());
                assert_eq!(Some(1), e.row());
            }
            _ => unreachable!(),
        }
        assert!(ds.is_empty());
    }

    #[test]
    fn test_push_fields_missing_value_is_zero() {
        let mut ds = Dataset::new();
        let mut fields = vec![("text", "Omelette")];
        fields.extend(LABELS.iter().map(|&l| (l, "")));
        fields[4] = ("eggs", "1");
        ds.push_fields(fields).unwrap();

        assert_eq!(
            [false, false, false, true, false, false, false, false, false],
            ds.labels()[0]
        );
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(Some(false), parse_label(""));
        assert_eq!(Some(false), parse_label("0"));
        assert_eq!(Some(true), parse_label(" 1 "));
        assert_eq!(Some(true), parse_label("1.0"));
        assert_eq!(None, parse_label("-1"));
        assert_eq!(None, parse_label("0.5"));
        assert_eq!(None, parse_label("inf"));
    }

    #[test]
    fn test_parse_label_missing_values() {
        for value in ["NaN", "nan", "NA", "N/A", "null", "NULL", "None", "<NA>", " NaN "] {
            assert_eq!(Some(false), parse_label(value));
        }
    }

    #[test]
    fn test_from_csv_reader_na_labels() {
        let csv = format!("{HEADER}
sesame bagel,NaN,NA,null,,0,0,1,0,1
");
        let ds = Dataset::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(
            [false, false, false, false, false, false, true, false, true],
            ds.labels()[0]
        );
    }
}
