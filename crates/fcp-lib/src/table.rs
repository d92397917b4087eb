use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FcpError, Result};

/// Semantic role of a measurement column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Time,
    Potential,
    Capacity,
    Current,
}

impl Field {
    /// Required fields in resolution order.
    pub const ALL: [Field; 4] = [Field::Time, Field::Potential, Field::Capacity, Field::Current];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Time => "time",
            Field::Potential => "potential",
            Field::Capacity => "capacity",
            Field::Current => "current",
        }
    }

    /// Axis label for the transformed values produced by [`crate::transforms::axis_values`].
    pub fn axis_label(&self, mass_normalized: bool) -> &'static str {
        match self {
            Field::Time => "Time (h)",
            Field::Potential => "Potential (V)",
            Field::Capacity if mass_normalized => "Capacity (mAh/g)",
            Field::Capacity => "Capacity (mAh)",
            Field::Current => "Current (mA)",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Field::ALL
            .into_iter()
            .find(|field| field.name() == wanted)
            .ok_or_else(|| format!("unknown field '{}'", s))
    }
}

/// Column-major numeric table loaded from one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Table {
    /// Build a table from columns; every column must have the same length and
    /// there must be one header per column.
    pub fn from_columns(
        name: impl Into<String>,
        headers: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        if headers.len() != columns.len() {
            return Err(FcpError::Load {
                file: name,
                reason: format!(
                    "{} header(s) for {} column(s)",
                    headers.len(),
                    columns.len()
                ),
            });
        }
        if let Some(first) = columns.first() {
            let rows = first.len();
            if let Some(pos) = columns.iter().position(|col| col.len() != rows) {
                return Err(FcpError::Load {
                    file: name,
                    reason: format!(
                        "column {} has {} row(s), expected {}",
                        pos + 1,
                        columns[pos].len(),
                        rows
                    ),
                });
            }
        }
        Ok(Self {
            name,
            headers,
            columns,
        })
    }

    /// Build a table from fixed-arity rows.
    pub fn from_rows(
        name: impl Into<String>,
        headers: Vec<String>,
        rows: &[Vec<f64>],
    ) -> Result<Self> {
        let name = name.into();
        let arity = headers.len();
        let mut columns = vec![Vec::with_capacity(rows.len()); arity];
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != arity {
                return Err(FcpError::Load {
                    file: name,
                    reason: format!(
                        "row {} has {} field(s), expected {}",
                        idx + 1,
                        row.len(),
                        arity
                    ),
                });
            }
            for (col, value) in columns.iter_mut().zip(row) {
                col.push(*value);
            }
        }
        Self::from_columns(name, headers, columns)
    }

    /// Source file name, used as a legend label.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn column(&self, idx: usize) -> Option<&[f64]> {
        self.columns.get(idx).map(Vec::as_slice)
    }

    pub(crate) fn drop_leading_rows(mut self, count: usize) -> Self {
        for col in &mut self.columns {
            col.drain(..count.min(col.len()));
        }
        self
    }

    pub(crate) fn map_column(mut self, idx: usize, f: impl Fn(f64) -> f64) -> Self {
        if let Some(col) = self.columns.get_mut(idx) {
            col.iter_mut().for_each(|value| *value = f(*value));
        }
        self
    }
}
