//! Filter executor implementation.
//!
//! This executor keeps the rows of its child for which every given condition
//! node evaluates to true. The same executor serves per-table pushdown
//! filters (several conjunct nodes of the WHERE tree) and the final WHERE
//! filter (its root).

use crate::executor::{Executor, MultiTableProvider, Row, RowSchema};
use crate::expression::{Evaluator, Expression, FunctionRegistry, NodeId};
use crate::sql::QueryResult;
use log::debug;
use std::sync::Arc;

/// Executor that filters rows based on nodes of a condition
pub struct FilterExecutor {
    /// Child executor that produces rows
    child: Box<dyn Executor>,
    /// Condition tree the nodes belong to
    condition: Expression,
    /// Nodes that must all be true for a row to pass
    nodes: Vec<NodeId>,
    functions: Arc<FunctionRegistry>,
    /// Short description used in log output
    label: String,
    seen: usize,
    passed: usize,
}

impl FilterExecutor {
    /// Filter on the whole condition
    pub fn new(
        child: Box<dyn Executor>,
        condition: Expression,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        let root = condition.root();
        Self::with_nodes(child, condition, vec![root], functions, "WHERE")
    }

    /// Filter on selected sub-conditions
    pub fn with_nodes(
        child: Box<dyn Executor>,
        condition: Expression,
        nodes: Vec<NodeId>,
        functions: Arc<FunctionRegistry>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            child,
            condition,
            nodes,
            functions,
            label: label.into(),
            seen: 0,
            passed: 0,
        }
    }
}

impl Executor for FilterExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.child.init()?;
        debug!(
            "filter {}: {}",
            self.label,
            self.nodes
                .iter()
                .map(|id| self.condition.render_node(*id))
                .collect::<Vec<_>>()
                .join(" and ")
        );
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        let evaluator = Evaluator::new(&self.functions);

        while let Some(row) = self.child.next()? {
            self.seen += 1;
            let provider = MultiTableProvider::new(self.child.output_schema(), &row);

            let mut keep = true;
            for node in &self.nodes {
                if !evaluator.evaluate_predicate(&self.condition, *node, &provider)? {
                    keep = false;
                    break;
                }
            }

            if keep {
                self.passed += 1;
                return Ok(Some(row));
            }
        }

        debug!(
            "filter {}: {} of {} rows passed",
            self.label, self.passed, self.seen
        );
        Ok(None)
    }

    fn output_schema(&self) -> &RowSchema {
        self.child.output_schema()
    }
}
