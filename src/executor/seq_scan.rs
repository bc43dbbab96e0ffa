//! Sequential scan executor implementation.

use crate::executor::{Executor, Row, RowSchema};
use crate::sql::QueryResult;
use crate::table::Table;
use log::debug;

/// Executor producing the rows of one loaded table
pub struct SeqScanExecutor {
    alias: String,
    rows: std::vec::IntoIter<Row>,
    output_schema: RowSchema,
}

impl SeqScanExecutor {
    /// Create a new scan over `table`, addressed through `alias`
    pub fn new(alias: impl Into<String>, table: Table) -> Self {
        let alias = alias.into();
        let output_schema = RowSchema::single(alias.clone(), &table.columns);
        Self {
            alias,
            rows: table.rows.into_iter(),
            output_schema,
        }
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> QueryResult<()> {
        debug!("scan '{}': {} rows", self.alias, self.rows.len());
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        Ok(self.rows.next())
    }

    fn output_schema(&self) -> &RowSchema {
        &self.output_schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::collect_rows;
    use crate::value::Value;

    #[test]
    fn test_scan_yields_rows_in_order() -> QueryResult<()> {
        let table = Table::new(["id"])
            .with_row([Value::Integer(1)])
            .with_row([Value::Integer(2)]);
        let mut scan = SeqScanExecutor::new("t", table);

        assert_eq!(scan.output_schema().table("t").unwrap().position("id"), Some(0));
        let rows = collect_rows(&mut scan)?;
        assert_eq!(rows, vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
        Ok(())
    }
}
