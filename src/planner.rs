//! Query planner turning a parsed query tree plus loaded tables into an
//! executor tree.
//!
//! The plan has a fixed shape:
//! 1. one scan per table, projected to the columns the query needs
//! 2. pushdown filters: WHERE sub-conditions that only touch one table
//! 3. per-table computed columns
//! 4. joins in FROM order (key joins or cross products)
//! 5. the full WHERE filter
//! 6. computed columns spanning several tables
//! 7. the projection onto the SELECT list

use crate::executor::{
    ComputeExecutor, Executor, FilterExecutor, NestedLoopJoinExecutor, ProjectionExecutor,
    SeqScanExecutor,
};
use crate::expression::{BinaryOperator, Expression, FunctionRegistry, NodeId, NodeKind};
use crate::sql::{QueryError, QueryResult, QueryTree, SelectItem, TableNode};
use crate::table::Table;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds executor trees for parsed queries
pub struct QueryPlanner {
    functions: Arc<FunctionRegistry>,
}

impl QueryPlanner {
    pub fn new(functions: Arc<FunctionRegistry>) -> Self {
        Self { functions }
    }

    /// Plan `tree` over `tables`, which maps every alias to its raw table.
    pub fn plan(
        &self,
        tree: &QueryTree,
        mut tables: HashMap<String, Table>,
    ) -> QueryResult<ProjectionExecutor> {
        let pushdown = pushdown_candidates(tree)?;

        let mut plan: Option<Box<dyn Executor>> = None;
        for (index, node) in tree.tables.iter().enumerate() {
            let raw = tables
                .remove(&node.alias)
                .ok_or_else(|| QueryError::MissingBaseTable {
                    alias: node.alias.clone(),
                    context: "the table source".to_string(),
                })?;
            let table_plan = self.plan_table(tree, node, raw, &pushdown[index])?;

            plan = Some(match plan {
                None => table_plan,
                Some(left) => self.plan_join(left, table_plan, node),
            });
        }

        let mut plan = plan.ok_or_else(|| {
            QueryError::InvalidArgument("query has no table in FROM".to_string())
        })?;

        if let Some(condition) = &tree.where_expression {
            plan = Box::new(FilterExecutor::new(
                plan,
                condition.clone(),
                self.functions.clone(),
            ));
        }

        let spanning = computed_items(&tree.select_items, |item| item.tables.len() > 1);
        if !spanning.is_empty() {
            debug!("computing {} multi-table columns", spanning.len());
            plan = Box::new(ComputeExecutor::new(plan, spanning, self.functions.clone()));
        }

        Ok(ProjectionExecutor::new(
            plan,
            tree.select_items.clone(),
            self.functions.clone(),
        ))
    }

    fn plan_table(
        &self,
        tree: &QueryTree,
        node: &TableNode,
        raw: Table,
        pushdown: &[NodeId],
    ) -> QueryResult<Box<dyn Executor>> {
        let table = raw.project(&node.attributes_to_load).map_err(|column| {
            QueryError::InvalidArgument(format!(
                "table '{}' ({}) has no column '{}'",
                node.alias, node.locator, column
            ))
        })?;
        debug!(
            "table '{}': {} rows, columns [{}]",
            node.alias,
            table.len(),
            table.columns.join(", ")
        );

        let mut plan: Box<dyn Executor> = Box::new(SeqScanExecutor::new(&node.alias, table));

        if let Some(condition) = tree.where_expression.as_ref().filter(|_| !pushdown.is_empty()) {
            plan = Box::new(FilterExecutor::with_nodes(
                plan,
                condition.clone(),
                pushdown.to_vec(),
                self.functions.clone(),
                format!("pushdown {}", node.alias),
            ));
        }

        let computed = computed_items(&tree.select_items, |item| {
            item.base_table() == Some(node.alias.as_str())
        });
        if !computed.is_empty() {
            plan = Box::new(ComputeExecutor::new(plan, computed, self.functions.clone()));
        }

        Ok(plan)
    }

    fn plan_join(
        &self,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        node: &TableNode,
    ) -> Box<dyn Executor> {
        match &node.join {
            Some(join) => {
                debug!(
                    "join '{}' to '{}' on {}",
                    join.join_alias, join.base_alias, join.condition
                );
                Box::new(NestedLoopJoinExecutor::new(
                    left,
                    right,
                    join.condition.clone(),
                    join.keys.clone(),
                    self.functions.clone(),
                ))
            }
            None => {
                debug!("cross join '{}'", node.alias);
                Box::new(NestedLoopJoinExecutor::cross(
                    left,
                    right,
                    self.functions.clone(),
                ))
            }
        }
    }
}

/// Non-reference SELECT items accepted by `filter`, with their item index.
fn computed_items(
    items: &[SelectItem],
    filter: impl Fn(&SelectItem) -> bool,
) -> Vec<(usize, SelectItem)> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.is_reference() && !item.is_constant() && filter(item))
        .map(|(index, item)| (index, item.clone()))
        .collect()
}

/// WHERE sub-conditions that can filter a single table before any join,
/// indexed like `tree.tables`.
///
/// For every reference the candidate is its nearest relational ancestor, or
/// the node right below its nearest logical ancestor, or the root. It is
/// pushed down only when all its ancestors are `and` or groups and all of
/// its references belong to the same table.
pub fn pushdown_candidates(tree: &QueryTree) -> QueryResult<Vec<Vec<NodeId>>> {
    let mut pushdown = vec![Vec::new(); tree.tables.len()];
    let Some(condition) = &tree.where_expression else {
        return Ok(pushdown);
    };
    if tree.tables.len() < 2 {
        return Ok(pushdown);
    }

    for (reference_node, reference) in condition.reference_nodes() {
        let table = tree.resolve(reference, "WHERE clause")?.table;
        let candidate = candidate_for(condition, reference_node);

        let eligible = condition.ancestors(candidate).all(|id| {
            matches!(
                condition.kind(id),
                NodeKind::Group(_)
                    | NodeKind::Binary {
                        op: BinaryOperator::And,
                        ..
                    }
            )
        });
        if !eligible {
            trace!(
                "not pushing down '{}': below a non-conjunctive operator",
                condition.render_node(candidate)
            );
            continue;
        }

        let mut single_table = true;
        for (_, other) in condition.reference_nodes_under(candidate) {
            if tree.resolve(other, "WHERE clause")?.table != table {
                single_table = false;
                break;
            }
        }
        if !single_table {
            trace!(
                "not pushing down '{}': refers to several tables",
                condition.render_node(candidate)
            );
            continue;
        }

        if !pushdown[table].contains(&candidate) {
            trace!(
                "pushing down '{}' to '{}'",
                condition.render_node(candidate),
                tree.tables[table].alias
            );
            pushdown[table].push(candidate);
        }
    }

    Ok(pushdown)
}

fn candidate_for(condition: &Expression, reference: NodeId) -> NodeId {
    let mut below = reference;
    for ancestor in condition.ancestors(reference) {
        if let NodeKind::Binary { op, .. } = condition.kind(ancestor) {
            if op.is_relational() {
                return ancestor;
            }
            if op.is_logical() {
                return below;
            }
        }
        below = ancestor;
    }
    condition.root()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::collect_rows;
    use crate::sql::QueryParser;
    use crate::value::Value;

    fn rendered(tree: &QueryTree) -> Vec<Vec<String>> {
        let condition = tree.where_expression.as_ref().unwrap();
        pushdown_candidates(tree)
            .unwrap()
            .iter()
            .map(|nodes| nodes.iter().map(|id| condition.render_node(*id)).collect())
            .collect()
    }

    fn parse(query: &str) -> QueryTree {
        QueryParser::new().parse(query).unwrap()
    }

    #[test]
    fn test_conjuncts_are_pushed_to_their_tables() {
        let tree = parse(
            "SELECT a.id FROM ta AS a INNER JOIN tb AS b ON a.id = b.id \
             WHERE (a.k = 1) and (upper(b.n) = 'X')",
        );
        assert_eq!(
            rendered(&tree),
            vec![vec!["a.k = 1".to_string()], vec!["upper(b.n) = 'X'".to_string()]]
        );
    }

    #[test]
    fn test_disjunction_is_not_pushed() {
        let tree = parse(
            "SELECT a.id FROM ta AS a INNER JOIN tb AS b ON a.id = b.id \
             WHERE (a.k = 1) or (b.k = 2)",
        );
        assert_eq!(rendered(&tree), vec![Vec::<String>::new(), Vec::new()]);
    }

    #[test]
    fn test_cross_table_comparison_is_not_pushed() {
        let tree = parse(
            "SELECT a.id FROM ta AS a, tb AS b WHERE (a.x = b.y) and (a.k = 1)",
        );
        assert_eq!(
            rendered(&tree),
            vec![vec!["a.k = 1".to_string()], Vec::new()]
        );
    }

    #[test]
    fn test_single_table_skips_pushdown() {
        let tree = parse("SELECT id FROM t WHERE id = 1");
        assert_eq!(rendered(&tree), vec![Vec::<String>::new()]);
    }

    fn tables() -> HashMap<String, Table> {
        let a = Table::new(["id", "x", "k"])
            .with_row([Value::Integer(1), Value::from("a"), Value::Integer(1)])
            .with_row([Value::Integer(2), Value::from("b"), Value::Integer(1)]);
        let b = Table::new(["id", "y"])
            .with_row([Value::Integer(1), Value::from("c")])
            .with_row([Value::Integer(2), Value::from("e")])
            .with_row([Value::Integer(3), Value::from("d")]);
        HashMap::from([("a".to_string(), a), ("b".to_string(), b)])
    }

    #[test]
    fn test_plan_join_with_filter_and_computed_columns() -> QueryResult<()> {
        let tree = QueryParser::new().parse(
            "SELECT a.id, a.x + b.y AS xy, upper(b.y) AS big FROM ta AS a \
             INNER JOIN tb AS b ON a.id = b.id WHERE (a.k = 1) and (b.y <> 'e')",
        )?;
        let planner = QueryPlanner::new(Arc::new(FunctionRegistry::new()));
        let mut plan = planner.plan(&tree, tables())?;

        assert_eq!(plan.columns(), ["id", "xy", "big"]);
        let rows = collect_rows(&mut plan)?;
        assert_eq!(
            rows,
            vec![vec![Value::Integer(1), Value::from("ac"), Value::from("C")]]
        );
        Ok(())
    }

    #[test]
    fn test_missing_table_from_source() {
        let tree = parse("SELECT a.id, b.id FROM ta AS a, tb AS b");
        let mut loaded = tables();
        loaded.remove("b");

        let planner = QueryPlanner::new(Arc::new(FunctionRegistry::new()));
        let result = planner.plan(&tree, loaded);
        assert!(matches!(
            result,
            Err(QueryError::MissingBaseTable { ref alias, .. }) if alias == "b"
        ));
    }

    #[test]
    fn test_missing_column_in_raw_table() {
        let tree = parse("SELECT a.nope FROM ta AS a");
        let planner = QueryPlanner::new(Arc::new(FunctionRegistry::new()));
        let result = planner.plan(&tree, tables());
        assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
    }
}
