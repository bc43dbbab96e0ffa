//! Projection executor implementation.
//!
//! This executor produces the SELECT columns in SELECT order. Computed items
//! are copied from the position an earlier compute step stored them at;
//! column references and constants are evaluated against the child row.

use crate::executor::{Executor, MultiTableProvider, Row, RowSchema};
use crate::expression::{Evaluator, FunctionRegistry};
use crate::sql::{QueryError, QueryResult, SelectItem};
use crate::value::Value;
use std::sync::Arc;

/// How one output column is obtained
enum Source {
    /// Position of an already computed value in the child row
    Computed(usize),
    /// Evaluated per row from the item's expression
    Evaluated(SelectItem),
}

/// Executor that projects rows onto the SELECT list
pub struct ProjectionExecutor {
    /// Child executor that produces rows
    child: Box<dyn Executor>,
    sources: Vec<Source>,
    /// Result column names, one per output value
    columns: Vec<String>,
    functions: Arc<FunctionRegistry>,
    /// Output schema (projected columns)
    output_schema: RowSchema,
}

impl ProjectionExecutor {
    /// Create a new projection executor
    ///
    /// `items` are the SELECT items in order. An item whose index appears in
    /// the child's computed columns is taken from there.
    pub fn new(
        child: Box<dyn Executor>,
        items: Vec<SelectItem>,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        let columns: Vec<String> = items.iter().map(|i| i.result_column.clone()).collect();
        let sources = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match child.output_schema().computed.get(&index) {
                Some(position) => Source::Computed(*position),
                None => Source::Evaluated(item),
            })
            .collect();
        let output_schema = RowSchema::single("", &columns);

        Self {
            child,
            sources,
            columns,
            functions,
            output_schema,
        }
    }

    /// Names of the produced columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Executor for ProjectionExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.child.init()
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        let Some(row) = self.child.next()? else {
            return Ok(None);
        };

        let evaluator = Evaluator::new(&self.functions);
        let provider = MultiTableProvider::new(self.child.output_schema(), &row);
        let mut projected = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let value = match source {
                Source::Computed(position) => row.get(*position).cloned().unwrap_or(Value::Null),
                Source::Evaluated(item) => evaluator
                    .evaluate(&item.expression, &provider)
                    .map_err(|err| {
                        QueryError::column_evaluation(&item.result_column, &item.source_text, err)
                    })?,
            };
            projected.push(value);
        }

        Ok(Some(projected))
    }

    fn output_schema(&self) -> &RowSchema {
        &self.output_schema
    }
}
