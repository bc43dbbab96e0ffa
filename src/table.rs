//! In-memory tables exchanged between sources and the executor.

use crate::value::Value;
use std::fmt;

/// Column names plus rows of values. Column names are physical names
/// without any table alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// A table as delivered by a source, before any query processing
pub type RawTable = Table;

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builder-style row append. Missing trailing cells are filled with null.
    pub fn with_row(mut self, row: impl IntoIterator<Item = Value>) -> Self {
        self.push_row(row.into_iter().collect());
        self
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Copy holding only `columns`, in that order. Returns the first missing
    /// column name on failure.
    pub fn project(&self, columns: &[String]) -> Result<Table, String> {
        let indices = columns
            .iter()
            .map(|c| self.column_index(c).ok_or_else(|| c.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Table {
            columns: columns.to_vec(),
            rows: self
                .rows
                .iter()
                .map(|row| {
                    indices
                        .iter()
                        .map(|i| row.get(*i).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect(),
        })
    }
}

impl fmt::Display for Table {
    /// Plain text grid, one line per row.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|row| row.get(i).map_or(0, |c| c.chars().count()))
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |f: &mut fmt::Formatter<'_>, values: &[String]| -> fmt::Result {
            let padded: Vec<String> = values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:<width$}", v, width = *w))
                .collect();
            writeln!(f, "{}", padded.join(" | ").trim_end())
        };

        line(f, &self.columns)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &cells {
            line(f, row)?;
        }
        write!(f, "({} rows)", self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::new(["id", "name"])
            .with_row([Value::Integer(1), Value::from("ann")])
            .with_row([Value::Integer(2)])
    }

    #[test]
    fn test_rows_are_padded() {
        let table = people();
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(1, "name"), Some(&Value::Null));
        assert_eq!(table.value(0, "missing"), None);
    }

    #[test]
    fn test_project() {
        let table = people();
        let projected = table.project(&["name".to_string()]).unwrap();
        assert_eq!(projected.columns, vec!["name"]);
        assert_eq!(projected.rows[0], vec![Value::from("ann")]);
        assert_eq!(table.project(&["age".to_string()]).unwrap_err(), "age");
    }

    #[test]
    fn test_display() {
        let rendered = people().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "id | name");
        assert_eq!(lines[1], "---+-----");
        assert_eq!(lines[2], "1  | ann");
        assert_eq!(lines[3], "2  |");
        assert_eq!(lines[4], "(2 rows)");
    }
}
