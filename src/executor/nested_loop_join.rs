//! Nested Loop Join executor implementation.
//!
//! This executor performs an inner join between two child executors using the nested loop
//! algorithm. The right child is materialized once during `init()`; for each row of the left
//! child every right row is visited and the combined row is produced when the join keys match.
//!
//! Join keys are the equalities of the `ON` condition. Each side is evaluated against its own
//! child and compared by string form. Without keys the executor produces the cross product.

use crate::executor::{Executor, MultiTableProvider, Row, RowSchema};
use crate::expression::{Evaluator, Expression, FunctionRegistry, NodeId};
use crate::sql::{JoinKey, QueryResult};
use crate::value::Value;
use log::debug;
use std::sync::Arc;

/// Executor that performs a nested loop join
pub struct NestedLoopJoinExecutor {
    /// Left child executor (the tables joined so far)
    left_child: Box<dyn Executor>,
    /// Right child executor (the table being joined)
    right_child: Box<dyn Executor>,
    /// Join condition holding the key nodes; `None` for a cross product
    condition: Option<Expression>,
    keys: Vec<JoinKey>,
    functions: Arc<FunctionRegistry>,
    /// Materialized right rows with their key strings
    right_rows: Vec<(Row, Vec<String>)>,
    /// Current left row with its key strings
    current_left: Option<(Row, Vec<String>)>,
    /// Next right row to compare against the current left row
    right_index: usize,
    /// Output schema (left schema + right schema)
    output_schema: RowSchema,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl NestedLoopJoinExecutor {
    /// Create a join matching rows on the given keys of `condition`
    pub fn new(
        left_child: Box<dyn Executor>,
        right_child: Box<dyn Executor>,
        condition: Expression,
        keys: Vec<JoinKey>,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        Self::build(left_child, right_child, Some(condition), keys, functions)
    }

    /// Create a join producing every combination of left and right rows
    pub fn cross(
        left_child: Box<dyn Executor>,
        right_child: Box<dyn Executor>,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        Self::build(left_child, right_child, None, Vec::new(), functions)
    }

    fn build(
        left_child: Box<dyn Executor>,
        right_child: Box<dyn Executor>,
        condition: Option<Expression>,
        keys: Vec<JoinKey>,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        let output_schema =
            RowSchema::concat(left_child.output_schema(), right_child.output_schema());
        Self {
            left_child,
            right_child,
            condition,
            keys,
            functions,
            right_rows: Vec::new(),
            current_left: None,
            right_index: 0,
            output_schema,
            initialized: false,
        }
    }

    /// Evaluates one side of every key against a row and renders the values.
    fn key_strings(
        evaluator: &Evaluator<'_>,
        condition: Option<&Expression>,
        nodes: impl Iterator<Item = NodeId>,
        schema: &RowSchema,
        row: &[Value],
    ) -> QueryResult<Vec<String>> {
        let Some(condition) = condition else {
            return Ok(Vec::new());
        };
        let provider = MultiTableProvider::new(schema, row);
        nodes
            .map(|node| {
                evaluator
                    .evaluate_node(condition, node, &provider)
                    .map(|value| value.to_string())
                    .map_err(Into::into)
            })
            .collect()
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> QueryResult<()> {
        if self.initialized {
            return Ok(());
        }

        self.left_child.init()?;
        self.right_child.init()?;

        let evaluator = Evaluator::new(&self.functions);
        self.right_rows.clear();
        while let Some(row) = self.right_child.next()? {
            let keys = Self::key_strings(
                &evaluator,
                self.condition.as_ref(),
                self.keys.iter().map(|k| k.join),
                self.right_child.output_schema(),
                &row,
            )?;
            self.right_rows.push((row, keys));
        }

        debug!(
            "join {} keys, {} right rows, columns [{}]",
            self.keys.len(),
            self.right_rows.len(),
            self.output_schema.column_names().join(", ")
        );

        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        if !self.initialized {
            self.init()?;
        }

        let evaluator = Evaluator::new(&self.functions);
        loop {
            if self.current_left.is_none() {
                match self.left_child.next()? {
                    Some(row) => {
                        let keys = Self::key_strings(
                            &evaluator,
                            self.condition.as_ref(),
                            self.keys.iter().map(|k| k.base),
                            self.left_child.output_schema(),
                            &row,
                        )?;
                        self.current_left = Some((row, keys));
                        self.right_index = 0;
                    }
                    None => return Ok(None),
                }
            }

            if let Some((left_row, left_keys)) = &self.current_left {
                while self.right_index < self.right_rows.len() {
                    let (right_row, right_keys) = &self.right_rows[self.right_index];
                    self.right_index += 1;
                    if right_keys == left_keys {
                        let mut combined = left_row.clone();
                        combined.extend(right_row.iter().cloned());
                        return Ok(Some(combined));
                    }
                }
            }

            // Right side exhausted for this left row
            self.current_left = None;
        }
    }

    fn output_schema(&self) -> &RowSchema {
        &self.output_schema
    }
}
