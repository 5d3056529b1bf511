use std::fmt;

// ---------------------------------------------------------------------------
// Value – a single cell in a loaded table
// ---------------------------------------------------------------------------

/// Markers the surveys use for suppressed or insufficient-sample cells.
pub const SENTINELS: &[&str] = &["*", "Q", "(D)", "NA", "N/A", "--"];

/// A dynamically-typed cell mirroring the dtypes a CSV, spreadsheet or
/// database column can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so values can be sorted and collected into sets --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Value::Null, Value::Float)
    }
}

impl From<Option<i64>> for Value {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Value::Null, Value::Integer)
    }
}

impl Value {
    /// Guess the type of a raw text cell the way a CSV reader would.
    pub fn infer(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::Text(s.to_string())
    }

    /// Interpret the cell as a survey measure.
    ///
    /// * numbers pass through, text is parsed after stripping thousands separators
    /// * nulls, empty text and suppression sentinels are "not available" (`Ok(None)`)
    /// * any other text is an error carrying the offending cell
    pub fn as_measure(&self) -> Result<Option<f64>, String> {
        match self {
            Value::Float(v) if v.is_nan() => Ok(None),
            Value::Float(v) => Ok(Some(*v)),
            Value::Integer(i) => Ok(Some(*i as f64)),
            Value::Null => Ok(None),
            Value::Bool(b) => Err(b.to_string()),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || is_sentinel(trimmed) {
                    return Ok(None);
                }
                trimmed
                    .replace(',', "")
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| s.clone())
            }
        }
    }

    /// Interpret the cell as an integer code (NAICS code, year, id).
    /// Non-numeric text yields `None`, mirroring a coercing numeric cast.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            Value::Text(s) => {
                let trimmed = s.trim();
                trimmed.parse::<i64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.fract() == 0.0)
                        .map(|v| v as i64)
                })
            }
            _ => None,
        }
    }

    /// Text form of the cell, `None` for nulls.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

pub fn is_sentinel(s: &str) -> bool {
    SENTINELS.iter().any(|m| m.eq_ignore_ascii_case(s))
}

/// Column names are compared trimmed and lower-cased so that file and store
/// sources of the same dataset line up.
pub fn normalize_column(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Table – one loaded dataset
// ---------------------------------------------------------------------------

/// A rectangular, immutable-once-loaded table of named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, normalising column names. Short rows are padded with nulls.
    pub fn new<S: AsRef<str>>(columns: &[S], rows: Vec<Vec<Value>>) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| normalize_column(c.as_ref())).collect();
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// Build a table from raw text cells, inferring each cell's type.
    pub fn from_text(columns: &[&str], rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| Value::infer(cell)).collect())
            .collect();
        Table::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_column(name);
        self.columns.iter().position(|c| *c == wanted)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Return a new table holding only the rows the predicate keeps.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_not_available() {
        assert_eq!(Value::from("*").as_measure(), Ok(None));
        assert_eq!(Value::from("Q").as_measure(), Ok(None));
        assert_eq!(Value::from(" q ").as_measure(), Ok(None));
        assert_eq!(Value::Null.as_measure(), Ok(None));
        assert_eq!(Value::Float(f64::NAN).as_measure(), Ok(None));
    }

    #[test]
    fn thousands_separators_are_stripped() {
        assert_eq!(Value::from("1,234.5").as_measure(), Ok(Some(1234.5)));
        assert_eq!(Value::Integer(7).as_measure(), Ok(Some(7.0)));
    }

    #[test]
    fn garbage_text_is_rejected() {
        assert_eq!(Value::from("lots").as_measure(), Err("lots".to_string()));
    }

    #[test]
    fn integer_codes_coerce() {
        assert_eq!(Value::from("311").as_i64(), Some(311));
        assert_eq!(Value::Float(2015.0).as_i64(), Some(2015));
        assert_eq!(Value::from("31-33").as_i64(), None);
    }

    #[test]
    fn columns_are_normalised_and_rows_padded() {
        let table = Table::new(&[" Municipal ", "AVGEMP"], vec![vec![Value::from("Boston")]]);
        assert_eq!(table.columns(), &["municipal".to_string(), "avgemp".to_string()]);
        assert!(table.has_column("AvgEmp"));
        assert_eq!(table.rows()[0][1], Value::Null);
    }

    #[test]
    fn from_text_infers_types() {
        let table = Table::from_text(&["a", "b", "c"], &[&["1", "2.5", "x"]]);
        assert_eq!(
            table.rows()[0],
            vec![Value::Integer(1), Value::Float(2.5), Value::from("x")]
        );
    }
}
