//! Executor layer for query execution.
//!
//! Executors form a Volcano-style iterator tree over in-memory rows: scans
//! feed per-table filters and computed columns, nested loop joins combine
//! tables in FROM order, and a projection produces the SELECT columns. Each
//! executor yields one row at a time through `next()`.

use crate::sql::QueryResult;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

pub mod compute;
pub mod filter;
pub mod nested_loop_join;
pub mod projection;
pub mod provider;
pub mod seq_scan;

pub use compute::ComputeExecutor;
pub use filter::FilterExecutor;
pub use nested_loop_join::NestedLoopJoinExecutor;
pub use projection::ProjectionExecutor;
pub use provider::{MultiTableProvider, TableRowProvider};
pub use seq_scan::SeqScanExecutor;

/// One row of values, laid out according to a [`RowSchema`]
pub type Row = Vec<Value>;

/// Trait for all query executors
pub trait Executor: Send {
    /// Initialize the executor. This must be called before `next()`.
    fn init(&mut self) -> QueryResult<()>;

    /// Get the next row from the executor.
    /// Returns None when there are no more rows.
    fn next(&mut self) -> QueryResult<Option<Row>>;

    /// Layout of the rows this executor produces
    fn output_schema(&self) -> &RowSchema;
}

/// Positions of one table's columns inside a row
#[derive(Debug, Clone, PartialEq)]
pub struct TableSlots {
    pub alias: String,
    columns: HashMap<String, usize>,
}

impl TableSlots {
    pub fn new(alias: impl Into<String>, columns: &[String], offset: usize) -> Self {
        Self {
            alias: alias.into(),
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), offset + i))
                .collect(),
        }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }

    /// Column names ordered by position.
    pub fn column_names(&self) -> Vec<&str> {
        let mut columns: Vec<(&str, usize)> = self
            .columns
            .iter()
            .map(|(name, pos)| (name.as_str(), *pos))
            .collect();
        columns.sort_by_key(|(_, pos)| *pos);
        columns.into_iter().map(|(name, _)| name).collect()
    }

    fn shifted(&self, offset: usize) -> Self {
        Self {
            alias: self.alias.clone(),
            columns: self
                .columns
                .iter()
                .map(|(name, pos)| (name.clone(), pos + offset))
                .collect(),
        }
    }
}

/// Row layout: the tables contributing columns plus computed select items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSchema {
    pub tables: Vec<TableSlots>,
    /// Select item index to the position of its computed value
    pub computed: BTreeMap<usize, usize>,
    pub width: usize,
}

impl RowSchema {
    /// Layout of a single table's rows.
    pub fn single(alias: impl Into<String>, columns: &[String]) -> Self {
        Self {
            tables: vec![TableSlots::new(alias, columns, 0)],
            computed: BTreeMap::new(),
            width: columns.len(),
        }
    }

    /// Layout of `left` rows followed by `right` rows.
    pub fn concat(left: &RowSchema, right: &RowSchema) -> Self {
        let mut tables = left.tables.clone();
        tables.extend(right.tables.iter().map(|t| t.shifted(left.width)));
        let mut computed = left.computed.clone();
        computed.extend(
            right
                .computed
                .iter()
                .map(|(item, pos)| (*item, pos + left.width)),
        );
        Self {
            tables,
            computed,
            width: left.width + right.width,
        }
    }

    /// Appends a computed select item, returning its position.
    pub fn push_computed(&mut self, item: usize) -> usize {
        let position = self.width;
        self.computed.insert(item, position);
        self.width += 1;
        position
    }

    pub fn table(&self, alias: &str) -> Option<&TableSlots> {
        self.tables.iter().find(|t| t.alias == alias)
    }

    /// Column names of the combined row, base tables first. A name already
    /// contributed by an earlier table is left out.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for table in &self.tables {
            for name in table.column_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

/// Runs an executor tree to completion.
pub fn collect_rows(executor: &mut dyn Executor) -> QueryResult<Vec<Row>> {
    executor.init()?;
    let mut rows = Vec::new();
    while let Some(row) = executor.next()? {
        rows.push(row);
    }
    Ok(rows)
}
