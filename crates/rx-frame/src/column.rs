//! Typed in-memory columns and named column sets.

use crate::error::{FrameError, Result};

/// Shape of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// One value per entry.
    Scalar,
    /// A variable-length list of values per entry.
    Jagged,
}

/// A jagged (variable-length) column: flat values + per-entry offsets.
///
/// `offsets` has length `n_entries + 1`. Entry `i` has values
/// `flat[offsets[i]..offsets[i+1]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct JaggedCol {
    /// Flat array of all values across all entries.
    pub flat: Vec<f64>,
    /// Entry boundaries: `offsets.len() == n_entries + 1`.
    pub offsets: Vec<usize>,
}

impl JaggedCol {
    /// Build from one list per entry.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Self {
        let mut flat = Vec::new();
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0);
        for r in rows {
            flat.extend_from_slice(r.as_ref());
            offsets.push(flat.len());
        }
        Self { flat, offsets }
    }

    /// Values of entry `row`.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.flat[self.offsets[row]..self.offsets[row + 1]]
    }

    /// Get element `index` of entry `row`. Returns `oor` for out-of-range.
    pub fn get(&self, row: usize, index: usize, oor: f64) -> f64 {
        self.row(row).get(index).copied().unwrap_or(oor)
    }

    /// Number of entries.
    pub fn n_entries(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    fn append(&mut self, other: &JaggedCol) {
        let base = self.flat.len();
        self.flat.extend_from_slice(&other.flat);
        self.offsets.extend(other.offsets.iter().skip(1).map(|o| o + base));
    }
}

/// A single named column's storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Floating-point scalars.
    F64(Vec<f64>),
    /// Integer scalars (identifiers, counts, PDG codes).
    I64(Vec<i64>),
    /// Boolean scalars.
    Bool(Vec<bool>),
    /// Variable-length per-entry lists.
    Jagged(JaggedCol),
}

impl Column {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Column::F64(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Jagged(j) => j.n_entries(),
        }
    }

    /// Whether the column has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape of the column.
    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Jagged(_) => ColumnKind::Jagged,
            _ => ColumnKind::Scalar,
        }
    }

    /// Scalar value of entry `row` as `f64`. Jagged columns yield `NaN`.
    #[inline]
    pub fn f64_at(&self, row: usize) -> f64 {
        match self {
            Column::F64(v) => v[row],
            Column::I64(v) => v[row] as f64,
            Column::Bool(v) => {
                if v[row] {
                    1.0
                } else {
                    0.0
                }
            }
            Column::Jagged(_) => f64::NAN,
        }
    }

    /// Scalar value of entry `row` as `i64`. Floats truncate; jagged yields 0.
    #[inline]
    pub fn i64_at(&self, row: usize) -> i64 {
        match self {
            Column::F64(v) => v[row] as i64,
            Column::I64(v) => v[row],
            Column::Bool(v) => i64::from(v[row]),
            Column::Jagged(_) => 0,
        }
    }

    /// Scalar value of entry `row` as a flag (non-zero is true).
    #[inline]
    pub fn flag_at(&self, row: usize) -> bool {
        match self {
            Column::F64(v) => v[row] != 0.0,
            Column::I64(v) => v[row] != 0,
            Column::Bool(v) => v[row],
            Column::Jagged(_) => false,
        }
    }

    /// List of entry `row`. Scalar columns yield an empty slice.
    #[inline]
    pub fn jagged_at(&self, row: usize) -> &[f64] {
        match self {
            Column::Jagged(j) => j.row(row),
            _ => &[],
        }
    }

    fn append(&mut self, other: &Column) -> bool {
        match (self, other) {
            (Column::F64(a), Column::F64(b)) => a.extend_from_slice(b),
            (Column::I64(a), Column::I64(b)) => a.extend_from_slice(b),
            (Column::Bool(a), Column::Bool(b)) => a.extend_from_slice(b),
            (Column::Jagged(a), Column::Jagged(b)) => a.append(b),
            _ => return false,
        }
        true
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::F64(v)
    }
}

impl From<Vec<i64>> for Column {
    fn from(v: Vec<i64>) -> Self {
        Column::I64(v)
    }
}

impl From<Vec<bool>> for Column {
    fn from(v: Vec<bool>) -> Self {
        Column::Bool(v)
    }
}

impl From<JaggedCol> for Column {
    fn from(j: JaggedCol) -> Self {
        Column::Jagged(j)
    }
}

/// An ordered set of equally long, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSet {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl ColumnSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. The first column fixes the entry count.
    pub fn with_column(mut self, name: impl Into<String>, column: impl Into<Column>) -> Result<Self> {
        self.push(name, column)?;
        Ok(self)
    }

    /// Add a column in place.
    pub fn push(&mut self, name: impl Into<String>, column: impl Into<Column>) -> Result<()> {
        let name = name.into();
        let column = column.into();
        if self.names.contains(&name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first()
            && first.len() != column.len()
        {
            return Err(FrameError::LengthMismatch {
                name,
                expected: first.len(),
                found: column.len(),
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Number of entries (0 for an empty set).
    pub fn len(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Whether the set holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    /// Column by position.
    pub fn column_at(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    /// Concatenate sets entry-wise (e.g. several files of one sample).
    ///
    /// All sets must carry the same column names with the same storage type.
    pub fn concat(sets: &[ColumnSet]) -> Result<ColumnSet> {
        let Some((first, rest)) = sets.split_first() else {
            return Ok(ColumnSet::new());
        };
        let mut out = first.clone();
        for (k, set) in rest.iter().enumerate() {
            if set.names.len() != out.names.len() {
                return Err(FrameError::Incompatible(format!(
                    "set {} has {} columns, expected {}",
                    k + 1,
                    set.names.len(),
                    out.names.len()
                )));
            }
            for (name, column) in out.names.iter().zip(out.columns.iter_mut()) {
                let other = set.column(name).ok_or_else(|| {
                    FrameError::Incompatible(format!("set {} lacks column '{}'", k + 1, name))
                })?;
                if !column.append(other) {
                    return Err(FrameError::Incompatible(format!(
                        "column '{}' changes storage type in set {}",
                        name,
                        k + 1
                    )));
                }
            }
        }
        Ok(out)
    }
}
