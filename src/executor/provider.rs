//! Value providers binding expression references to row slots.

use crate::executor::{RowSchema, TableSlots};
use crate::expression::{ExpressionError, ExpressionResult, ValueProvider};
use crate::value::Value;

/// Resolves the columns of one table within a row.
///
/// `alias.column` and a bare `column` both resolve; any other dotted name is
/// looked up as a whole.
pub struct TableRowProvider<'a> {
    slots: &'a TableSlots,
    row: &'a [Value],
}

impl<'a> TableRowProvider<'a> {
    pub fn new(slots: &'a TableSlots, row: &'a [Value]) -> Self {
        Self { slots, row }
    }

    /// Rebinds the provider to another row.
    pub fn bind(&mut self, row: &'a [Value]) {
        self.row = row;
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        let column = match name.split_once('.') {
            Some((prefix, column)) if prefix == self.slots.alias => column,
            _ => name,
        };
        self.slots
            .position(column)
            .or_else(|| self.slots.position(name))
            .and_then(|pos| self.row.get(pos))
    }
}

impl ValueProvider for TableRowProvider<'_> {
    fn get_value(&self, name: &str) -> ExpressionResult<Value> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownIdentifier {
                name: name.to_string(),
            })
    }
}

/// Resolves `alias.column` references by dispatching to the named table.
///
/// With a single table, references without a matching alias prefix go to it.
pub struct MultiTableProvider<'a> {
    schema: &'a RowSchema,
    row: &'a [Value],
}

impl<'a> MultiTableProvider<'a> {
    pub fn new(schema: &'a RowSchema, row: &'a [Value]) -> Self {
        Self { schema, row }
    }

    pub fn bind(&mut self, row: &'a [Value]) {
        self.row = row;
    }
}

impl ValueProvider for MultiTableProvider<'_> {
    fn get_value(&self, name: &str) -> ExpressionResult<Value> {
        let table = name
            .split_once('.')
            .and_then(|(prefix, _)| self.schema.table(prefix))
            .or(match self.schema.tables.as_slice() {
                [single] => Some(single),
                _ => None,
            });

        match table {
            Some(slots) => TableRowProvider::new(slots, self.row).get_value(name),
            None => Err(ExpressionError::UnknownIdentifier {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_table_provider() {
        let slots = TableSlots::new("u", &columns(&["id", "cn.first"]), 0);
        let row = vec![Value::Integer(7), Value::from("Ann")];
        let mut provider = TableRowProvider::new(&slots, &row);

        assert_eq!(provider.get_value("u.id").unwrap(), Value::Integer(7));
        assert_eq!(provider.get_value("id").unwrap(), Value::Integer(7));
        assert_eq!(provider.get_value("cn.first").unwrap(), Value::from("Ann"));
        assert!(provider.get_value("u.missing").is_err());

        let other = vec![Value::Integer(8), Value::Null];
        provider.bind(&other);
        assert_eq!(provider.get_value("id").unwrap(), Value::Integer(8));
    }

    #[test]
    fn test_multi_table_provider() {
        let left = RowSchema::single("a", &columns(&["id", "x"]));
        let right = RowSchema::single("b", &columns(&["id", "y"]));
        let schema = RowSchema::concat(&left, &right);
        let row = vec![
            Value::Integer(1),
            Value::from("a"),
            Value::Integer(2),
            Value::from("c"),
        ];
        let provider = MultiTableProvider::new(&schema, &row);

        assert_eq!(provider.get_value("a.id").unwrap(), Value::Integer(1));
        assert_eq!(provider.get_value("b.id").unwrap(), Value::Integer(2));
        assert_eq!(provider.get_value("b.y").unwrap(), Value::from("c"));
        assert!(matches!(
            provider.get_value("id"),
            Err(ExpressionError::UnknownIdentifier { .. })
        ));
        assert!(provider.get_value("c.id").is_err());
    }
}
