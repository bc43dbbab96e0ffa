//! Computed column executor implementation.
//!
//! Appends the values of computed SELECT items to every row of its child.
//! Used once per table for items over a single table, and once after the
//! joins for items combining several tables.

use crate::executor::{Executor, MultiTableProvider, Row, RowSchema};
use crate::expression::{Evaluator, FunctionRegistry};
use crate::sql::{QueryError, QueryResult, SelectItem};
use std::sync::Arc;

/// Executor that adds computed columns
pub struct ComputeExecutor {
    child: Box<dyn Executor>,
    /// Select item index and item of each computed column
    items: Vec<(usize, SelectItem)>,
    functions: Arc<FunctionRegistry>,
    output_schema: RowSchema,
}

impl ComputeExecutor {
    pub fn new(
        child: Box<dyn Executor>,
        items: Vec<(usize, SelectItem)>,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        let mut output_schema = child.output_schema().clone();
        for (item, _) in &items {
            output_schema.push_computed(*item);
        }
        Self {
            child,
            items,
            functions,
            output_schema,
        }
    }
}

impl Executor for ComputeExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.child.init()
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        let Some(mut row) = self.child.next()? else {
            return Ok(None);
        };

        let evaluator = Evaluator::new(&self.functions);
        let provider = MultiTableProvider::new(self.child.output_schema(), &row);
        let values = self
            .items
            .iter()
            .map(|(_, item)| {
                evaluator.evaluate(&item.expression, &provider).map_err(|err| {
                    QueryError::column_evaluation(&item.result_column, &item.source_text, err)
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        row.extend(values);
        Ok(Some(row))
    }

    fn output_schema(&self) -> &RowSchema {
        &self.output_schema
    }
}
