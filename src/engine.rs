//! Query engine facade: parse, load and execute in one place.

use crate::config::EngineConfig;
use crate::executor::collect_rows;
use crate::expression::FunctionRegistry;
use crate::planner::QueryPlanner;
use crate::source::TableSource;
use crate::sql::{QueryParser, QueryResult, QueryTree};
use crate::table::Table;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

/// Runs queries against tables supplied by a [`TableSource`]
pub struct QueryEngine {
    config: EngineConfig,
    parser: QueryParser,
    functions: Arc<FunctionRegistry>,
}

impl QueryEngine {
    /// Create an engine with the built-in functions
    pub fn new(config: EngineConfig) -> Self {
        Self::with_functions(config, FunctionRegistry::new())
    }

    /// Create an engine with a custom function registry
    pub fn with_functions(config: EngineConfig, functions: FunctionRegistry) -> Self {
        Self {
            parser: QueryParser::from_config(&config),
            config,
            functions: Arc::new(functions),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn parse(&self, query: &str) -> QueryResult<QueryTree> {
        self.parser.parse(query)
    }

    /// Execute a parsed query over already loaded tables, keyed by alias.
    pub fn execute(&self, tree: &QueryTree, tables: HashMap<String, Table>) -> QueryResult<Table> {
        let planner = QueryPlanner::new(self.functions.clone());
        let mut plan = planner.plan(tree, tables)?;
        let rows = collect_rows(&mut plan)?;
        debug!("query produced {} rows", rows.len());

        Ok(Table {
            columns: plan.columns().to_vec(),
            rows,
        })
    }

    /// Parse `query`, load its tables from `source` and execute it.
    pub async fn query(&self, query: &str, source: &dyn TableSource) -> QueryResult<Table> {
        info!("Executing query: {}", query.trim());
        let tree = self.parse(query)?;
        let tables = source.load_tables(&tree).await?;
        let result = self.execute(&tree, tables)?;
        info!(
            "Query returned {} rows with columns [{}]",
            result.len(),
            result.columns.join(", ")
        );
        Ok(result)
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
