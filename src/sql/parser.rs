// SQL-subset parser - SELECT ... FROM ... [WHERE ...] into a QueryTree

use super::ast::{resolve_reference, JoinKey, JoinKind, JoinNode, QueryTree, SelectItem, TableNode};
use super::error::{QueryError, QueryResult};
use super::scanner::FromScanner;
use crate::config::EngineConfig;
use crate::expression::{BinaryOperator, Expression, ExpressionParser, NodeId, NodeKind};
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

fn query_regex() -> &'static Regex {
    static QUERY_REGEX: OnceLock<Regex> = OnceLock::new();
    QUERY_REGEX.get_or_init(|| {
        Regex::new(r"(?is)^\s*SELECT\s+(.+?)\s+FROM\s+(.+?)\s*$").expect("valid query regex")
    })
}

fn where_regex() -> &'static Regex {
    static WHERE_REGEX: OnceLock<Regex> = OnceLock::new();
    WHERE_REGEX.get_or_init(|| Regex::new(r"(?i)\sWHERE\s").expect("valid WHERE regex"))
}

fn alias_regex() -> &'static Regex {
    static ALIAS_REGEX: OnceLock<Regex> = OnceLock::new();
    ALIAS_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid alias regex"))
}

const UNSUPPORTED_JOINS: &[&str] = &["LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "NATURAL"];

/// Parser for the `SELECT ... FROM ... [WHERE ...]` subset.
#[derive(Debug, Clone)]
pub struct QueryParser {
    expressions: ExpressionParser,
    parse_from: bool,
    parse_where: bool,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryParser {
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            expressions: ExpressionParser::with_identifier_chars(
                config.additional_identifier_chars.chars(),
            ),
            parse_from: config.parse_from,
            parse_where: config.parse_where,
        }
    }

    pub fn expression_parser(&self) -> &ExpressionParser {
        &self.expressions
    }

    /// Parse a query into a [`QueryTree`]
    pub fn parse(&self, query: &str) -> QueryResult<QueryTree> {
        let text = query.trim().trim_end_matches(';');
        let captures = query_regex().captures(text).ok_or_else(|| {
            QueryError::invalid_query(query, "expected SELECT <columns> FROM <tables> [WHERE <condition>]")
        })?;
        let select_text = captures.get(1).map_or("", |m| m.as_str());
        let from_and_where = captures.get(2).map_or("", |m| m.as_str());

        let (from_text, where_text) = match where_regex().find(from_and_where) {
            Some(m) => (
                from_and_where[..m.start()].trim(),
                Some(from_and_where[m.end()..].trim()),
            ),
            None => (from_and_where.trim(), None),
        };
        if from_text.is_empty() {
            return Err(QueryError::invalid_query(query, "missing table in FROM clause"));
        }
        if where_text == Some("") {
            return Err(QueryError::invalid_query(query, "empty WHERE condition"));
        }

        let mut tables = if self.parse_from {
            self.parse_from_clause(from_text)?
        } else {
            vec![TableNode::new(from_text, from_text)]
        };

        let select_items = self.parse_select_list(select_text, &mut tables)?;

        let where_expression = match where_text {
            Some(text) if self.parse_where => Some(self.parse_where_clause(text, &mut tables)?),
            _ => None,
        };

        debug!(
            "parsed query: {} select items, tables [{}], where: {}",
            select_items.len(),
            tables
                .iter()
                .map(|t| t.alias.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            where_text.unwrap_or("-")
        );

        Ok(QueryTree {
            select_items,
            tables,
            where_text: where_text.map(str::to_string),
            where_expression,
        })
    }

    fn parse_from_clause(&self, text: &str) -> QueryResult<Vec<TableNode>> {
        let mut scanner = FromScanner::new(text);
        let mut tables: Vec<TableNode> = Vec::new();

        loop {
            let table = self.parse_table(&mut scanner, &tables, text)?;
            tables.push(table);

            // Join chain attached to the tables declared so far
            loop {
                if scanner.eat_keyword("INNER") {
                    if !scanner.eat_keyword("JOIN") {
                        return Err(QueryError::InvalidArgument(format!(
                            "expected JOIN after INNER in FROM clause '{}'",
                            text
                        )));
                    }
                } else if !scanner.eat_keyword("JOIN") {
                    if let Some(word) = scanner.peek_word() {
                        if UNSUPPORTED_JOINS
                            .iter()
                            .any(|kind| word.eq_ignore_ascii_case(kind))
                        {
                            return Err(QueryError::InvalidArgument(format!(
                                "unsupported join type '{}', only INNER JOIN is available",
                                word
                            )));
                        }
                    }
                    break;
                }

                let mut joined = self.parse_table(&mut scanner, &tables, text)?;
                if !scanner.eat_keyword("ON") {
                    return Err(QueryError::InvalidArgument(format!(
                        "join of '{}' has no ON condition",
                        joined.alias
                    )));
                }

                let rest = scanner.rest();
                let partial = self.expressions.parse_partial(&rest)?;
                let consumed = rest.chars().count() - partial.remainder.chars().count();
                scanner.advance_by(consumed);

                let join = self.build_join(&partial.parsed, partial.expression, &tables, &joined)?;
                for key in &join.keys {
                    for (_, reference) in join.condition.reference_nodes_under(key.base) {
                        let column = self.join_column(reference);
                        if let Some(base) = tables.iter_mut().find(|t| t.alias == join.base_alias) {
                            base.request_attribute(column);
                        }
                    }
                    for (_, reference) in join.condition.reference_nodes_under(key.join) {
                        joined.request_attribute(self.join_column(reference));
                    }
                }
                joined.join = Some(join);
                tables.push(joined);
            }

            if scanner.is_at_end() {
                break;
            }
            if !scanner.eat_char(',') {
                return Err(QueryError::invalid_query(
                    text,
                    format!("unexpected '{}' in FROM clause", scanner.rest().trim()),
                ));
            }
        }

        Ok(tables)
    }

    /// Column part of a dotted join reference.
    fn join_column<'a>(&self, reference: &'a str) -> &'a str {
        reference
            .split_once('.')
            .map_or(reference, |(_, column)| column)
    }

    /// locator [AS alias]
    fn parse_table(
        &self,
        scanner: &mut FromScanner,
        declared: &[TableNode],
        from_text: &str,
    ) -> QueryResult<TableNode> {
        let locator = scanner.read_locator().ok_or_else(|| {
            QueryError::invalid_query(from_text, "missing or unterminated table name")
        })?;

        let alias = if scanner.eat_keyword("AS") {
            let alias = scanner.peek_word().unwrap_or_default();
            if !alias_regex().is_match(&alias) {
                return Err(QueryError::InvalidArgument(format!(
                    "invalid alias '{}' for table '{}'",
                    alias, locator
                )));
            }
            scanner.advance_by(alias.chars().count());
            alias
        } else {
            locator.clone()
        };

        if declared.iter().any(|t| t.alias == alias) {
            return Err(QueryError::InvalidArgument(format!(
                "table alias '{}' is declared more than once",
                alias
            )));
        }

        Ok(TableNode::new(locator, alias))
    }

    /// Validates an ON condition: equalities joined by AND, each side
    /// referring to exactly one of the joined table and one earlier table.
    fn build_join(
        &self,
        text: &str,
        condition: Expression,
        declared: &[TableNode],
        joined: &TableNode,
    ) -> QueryResult<JoinNode> {
        let mut equalities = Vec::new();
        collect_equalities(&condition, condition.root(), &mut equalities)
            .map_err(|reason| QueryError::ambiguous_join(text, reason))?;

        let mut base_alias: Option<String> = None;
        let mut keys = Vec::new();

        for eq in equalities {
            let NodeKind::Binary { left, right, .. } = condition.kind(eq) else {
                continue;
            };
            let left_alias = side_alias(&condition, *left, text)?;
            let right_alias = side_alias(&condition, *right, text)?;

            let (base_side, join_side, other) = if right_alias == joined.alias {
                (*left, *right, left_alias)
            } else if left_alias == joined.alias {
                (*right, *left, right_alias)
            } else {
                return Err(QueryError::ambiguous_join(
                    text,
                    format!(
                        "'{}' must be compared with a column of another table",
                        joined.alias
                    ),
                ));
            };

            if other == joined.alias {
                return Err(QueryError::ambiguous_join(
                    text,
                    format!("both sides refer to '{}'", joined.alias),
                ));
            }
            if !declared.iter().any(|t| t.alias == other) {
                return Err(QueryError::MissingBaseTable {
                    alias: other,
                    context: format!("join condition '{}'", text),
                });
            }
            match &base_alias {
                Some(existing) if *existing != other => {
                    return Err(QueryError::ambiguous_join(
                        text,
                        format!(
                            "refers to '{}' and '{}' besides '{}', a join links exactly two tables",
                            existing, other, joined.alias
                        ),
                    ))
                }
                _ => base_alias = Some(other),
            }

            keys.push(JoinKey {
                base: base_side,
                join: join_side,
            });
        }

        let base_alias = base_alias
            .ok_or_else(|| QueryError::ambiguous_join(text, "no equality between two tables"))?;

        Ok(JoinNode {
            kind: JoinKind::Inner,
            condition_text: text.to_string(),
            condition,
            base_alias,
            join_alias: joined.alias.clone(),
            keys,
        })
    }

    fn parse_where_clause(
        &self,
        text: &str,
        tables: &mut [TableNode],
    ) -> QueryResult<Expression> {
        let expression = self.expressions.parse(text)?;
        for reference in expression.references() {
            let resolved = resolve_reference(tables, reference, "WHERE clause")?;
            tables[resolved.table].request_attribute(&resolved.column);
        }
        Ok(expression)
    }

    /// item [AS alias] (, item [AS alias])*
    fn parse_select_list(
        &self,
        text: &str,
        tables: &mut [TableNode],
    ) -> QueryResult<Vec<SelectItem>> {
        let mut items = Vec::new();
        let mut rest = text.to_string();

        loop {
            let trimmed = rest.trim_start();
            if trimmed == "*" || trimmed.starts_with("*,") || trimmed.starts_with("* ") {
                return Err(QueryError::SelectAll);
            }

            let partial = self.expressions.parse_partial(trimmed)?;
            let mut remainder = partial.remainder.trim_start().to_string();

            let explicit_alias = match remainder.split_once(char::is_whitespace) {
                Some((word, after)) if word.eq_ignore_ascii_case("AS") => {
                    let after = after.trim_start();
                    let end = after
                        .find(|c: char| c.is_whitespace() || c == ',')
                        .unwrap_or(after.len());
                    let alias = &after[..end];
                    if !alias_regex().is_match(alias) {
                        return Err(QueryError::InvalidArgument(format!(
                            "invalid alias '{}' for '{}'",
                            alias, partial.parsed
                        )));
                    }
                    let alias = alias.to_string();
                    remainder = after[end..].trim_start().to_string();
                    Some(alias)
                }
                _ => None,
            };

            let item = self.build_select_item(
                partial.parsed,
                partial.expression,
                explicit_alias,
                items.len(),
                tables,
            )?;
            items.push(item);

            if remainder.is_empty() {
                break;
            }
            match remainder.strip_prefix(',') {
                Some(next) => rest = next.to_string(),
                None => {
                    return Err(QueryError::invalid_query(
                        text,
                        format!("unexpected '{}' in SELECT list", remainder),
                    ))
                }
            }
        }

        Ok(items)
    }

    fn build_select_item(
        &self,
        source_text: String,
        expression: Expression,
        explicit_alias: Option<String>,
        index: usize,
        tables: &mut [TableNode],
    ) -> QueryResult<SelectItem> {
        let context = format!("SELECT item '{}'", source_text);
        let mut item_tables: Vec<String> = Vec::new();
        let mut column_name = None;

        for reference in expression.references() {
            let resolved = resolve_reference(tables, reference, &context)?;
            let table = &mut tables[resolved.table];
            table.request_attribute(&resolved.column);
            if !item_tables.contains(&table.alias) {
                item_tables.push(table.alias.clone());
            }
            if expression.as_reference().is_some() {
                column_name = Some(resolved.column);
            }
        }

        let has_alias = explicit_alias.is_some();
        let result_column = match (&explicit_alias, &column_name) {
            (Some(alias), _) => alias.clone(),
            (None, Some(column)) => column.clone(),
            (None, None) => {
                return Err(QueryError::InvalidArgument(format!(
                    "computed column '{}' needs an alias, write '{} AS name'",
                    source_text, source_text
                )))
            }
        };

        if let [alias] = item_tables.as_slice() {
            if let Some(table) = tables.iter_mut().find(|t| t.alias == *alias) {
                table.attribute_map.insert(result_column.clone(), index);
            }
        }

        Ok(SelectItem {
            alias: explicit_alias.unwrap_or_else(|| source_text.clone()),
            source_text,
            expression,
            has_alias,
            column_name,
            result_column,
            tables: item_tables,
        })
    }
}

/// Collects the `=` nodes of a conjunction, looking through groups.
fn collect_equalities(
    condition: &Expression,
    id: NodeId,
    found: &mut Vec<NodeId>,
) -> Result<(), String> {
    match condition.kind(id) {
        NodeKind::Group(inner) => collect_equalities(condition, *inner, found),
        NodeKind::Binary {
            op: BinaryOperator::And,
            left,
            right,
        } => {
            collect_equalities(condition, *left, found)?;
            collect_equalities(condition, *right, found)
        }
        NodeKind::Binary {
            op: BinaryOperator::Eq,
            ..
        } => {
            found.push(id);
            Ok(())
        }
        _ => Err(format!(
            "'{}' is not an equality, only '=' comparisons combined with AND are supported",
            condition.render_node(id)
        )),
    }
}

/// The single alias one side of a join equality refers to.
fn side_alias(condition: &Expression, side: NodeId, text: &str) -> QueryResult<String> {
    let mut alias: Option<&str> = None;
    for (_, reference) in condition.reference_nodes_under(side) {
        let Some((prefix, _)) = reference.split_once('.') else {
            return Err(QueryError::ambiguous_join(
                text,
                format!("'{}' is not qualified with a table alias", reference),
            ));
        };
        match alias {
            Some(existing) if existing != prefix => {
                return Err(QueryError::ambiguous_join(
                    text,
                    format!(
                        "'{}' mixes columns of '{}' and '{}'",
                        condition.render_node(side),
                        existing,
                        prefix
                    ),
                ))
            }
            _ => alias = Some(prefix),
        }
    }
    alias.map(str::to_string).ok_or_else(|| {
        QueryError::ambiguous_join(
            text,
            format!(
                "'{}' does not refer to any table",
                condition.render_node(side)
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn parse(query: &str) -> QueryResult<QueryTree> {
        QueryParser::new().parse(query)
    }

    #[test]
    fn test_single_table() -> Result<()> {
        let tree = parse("SELECT name, age + 1 AS next_age FROM people WHERE age > 18;")?;
        assert_eq!(tree.tables.len(), 1);
        let table = &tree.tables[0];
        assert_eq!(table.locator, "people");
        assert_eq!(table.alias, "people");
        assert_eq!(table.attributes_to_load, vec!["name", "age"]);
        assert_eq!(table.attribute_map.get("next_age"), Some(&1));

        assert_eq!(tree.select_items[0].result_column, "name");
        assert!(!tree.select_items[0].has_alias);
        assert_eq!(tree.select_items[0].alias, "name");
        assert_eq!(tree.select_items[1].result_column, "next_age");
        assert_eq!(tree.where_text.as_deref(), Some("age > 18"));
        assert!(tree.where_expression.is_some());
        Ok(())
    }

    #[test]
    fn test_aliases_and_qualified_columns() -> Result<()> {
        let tree = parse("select p.name as who, p.id from people.csv as p")?;
        assert_eq!(tree.tables[0].alias, "p");
        assert_eq!(tree.tables[0].locator, "people.csv");
        assert_eq!(tree.select_items[0].result_column, "who");
        assert_eq!(tree.select_items[0].column_name.as_deref(), Some("name"));
        assert_eq!(tree.select_items[1].result_column, "id");
        assert_eq!(tree.tables[0].attributes_to_load, vec!["name", "id"]);
        Ok(())
    }

    #[test]
    fn test_inner_join_chain() -> Result<()> {
        let tree = parse(
            "SELECT a.id, b.y, c.z FROM ta AS a INNER JOIN tb AS b ON a.id = b.id \
             INNER JOIN tc AS c ON (c.ref = b.y) and (c.kind = b.kind)",
        )?;
        assert_eq!(tree.tables.len(), 3);

        let b = tree.table("b").unwrap();
        let join = b.join.as_ref().unwrap();
        assert_eq!(join.base_alias, "a");
        assert_eq!(join.join_alias, "b");
        assert_eq!(join.condition_text, "a.id = b.id");
        assert_eq!(join.keys.len(), 1);
        assert_eq!(b.attributes_to_load, vec!["id", "y", "kind"]);

        let c = tree.table("c").unwrap();
        let join = c.join.as_ref().unwrap();
        assert_eq!(join.base_alias, "b");
        assert_eq!(join.keys.len(), 2);
        assert_eq!(c.attributes_to_load, vec!["ref", "kind", "z"]);
        Ok(())
    }

    #[test]
    fn test_join_condition_spanning_three_tables_is_rejected() {
        let err = parse(
            "SELECT a.id FROM ta AS a INNER JOIN tb AS b ON a.id = b.id \
             INNER JOIN tc AS c ON (c.ref = b.y) and (c.kind = a.kind)",
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::AmbiguousJoinCondition { .. }), "{:?}", err);
    }

    #[test]
    fn test_join_with_conjunction() -> Result<()> {
        let tree = parse(
            "SELECT a.id FROM ta AS a INNER JOIN tb AS b ON (b.id = a.id) and (a.k = b.k) WHERE b.v > 1",
        )?;
        let join = tree.tables[1].join.as_ref().unwrap();
        assert_eq!(join.keys.len(), 2);
        assert_eq!(join.condition.render_node(join.keys[0].base), "a.id");
        assert_eq!(join.condition.render_node(join.keys[0].join), "b.id");
        assert_eq!(tree.tables[0].attributes_to_load, vec!["id", "k"]);
        assert_eq!(tree.tables[1].attributes_to_load, vec!["id", "k", "v"]);
        Ok(())
    }

    #[test]
    fn test_unparenthesized_conjunction_is_a_flat_chain() {
        // Reads as ((a.k = b.k) and b.x) = a.x, so the left side mixes tables
        let err = parse("SELECT a.id FROM ta AS a INNER JOIN tb AS b ON a.k = b.k and b.x = a.x")
            .unwrap_err();
        assert!(matches!(err, QueryError::AmbiguousJoinCondition { .. }));
    }

    #[test]
    fn test_join_condition_errors() {
        let undotted = parse("SELECT a.x FROM t1 AS a INNER JOIN t2 AS b ON id = b.id").unwrap_err();
        assert!(matches!(undotted, QueryError::AmbiguousJoinCondition { .. }));

        let same_side = parse("SELECT a.x FROM t1 AS a INNER JOIN t2 AS b ON b.id = b.other").unwrap_err();
        assert!(matches!(same_side, QueryError::AmbiguousJoinCondition { .. }));

        let not_equality = parse("SELECT a.x FROM t1 AS a INNER JOIN t2 AS b ON a.id < b.id").unwrap_err();
        assert!(matches!(not_equality, QueryError::AmbiguousJoinCondition { .. }));

        let missing = parse("SELECT a.x FROM t1 AS a INNER JOIN t2 AS b ON z.id = b.id").unwrap_err();
        assert!(matches!(missing, QueryError::MissingBaseTable { alias, .. } if alias == "z"));

        let no_on = parse("SELECT a.x FROM t1 AS a INNER JOIN t2 AS b").unwrap_err();
        assert!(matches!(no_on, QueryError::InvalidArgument(_)));

        let outer = parse("SELECT a.x FROM t1 AS a LEFT JOIN t2 AS b ON a.id = b.id").unwrap_err();
        assert!(matches!(outer, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn test_comma_separated_tables() -> Result<()> {
        let tree = parse("SELECT a.x, b.y FROM t1 AS a, t2 AS b WHERE a.x = b.y")?;
        assert_eq!(tree.tables.len(), 2);
        assert!(tree.tables[1].join.is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_alias() {
        let err = parse("SELECT a.x FROM t1 AS a, t2 AS a").unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn test_select_all_rejected() {
        assert!(matches!(parse("SELECT * FROM t"), Err(QueryError::SelectAll)));
        assert!(matches!(parse("SELECT *, a FROM t"), Err(QueryError::SelectAll)));
    }

    #[test]
    fn test_computed_item_needs_alias() {
        let err = parse("SELECT a.x + b.y FROM t1 AS a, t2 AS b").unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
        let err = parse("SELECT upper(name) FROM t").unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn test_reference_attribution_errors() {
        let err = parse("SELECT a.x FROM t1 AS a, t2 AS b WHERE x = 1").unwrap_err();
        assert!(matches!(err, QueryError::AmbiguousColumn { .. }));

        let err = parse("SELECT a.x FROM t1 AS a, t2 AS b WHERE c.x = 1").unwrap_err();
        assert!(matches!(err, QueryError::MissingBaseTable { .. }));
    }

    #[test]
    fn test_invalid_shapes() {
        for query in ["", "SELECT a", "UPDATE t SET a = 1", "SELECT a FROM t WHERE "] {
            assert!(
                matches!(parse(query), Err(QueryError::InvalidQuery { .. })),
                "{:?}",
                query
            );
        }
        assert!(matches!(
            parse("SELECT a b FROM t"),
            Err(QueryError::InvalidQuery { .. })
        ));
        assert!(matches!(
            parse("SELECT a FROM t WHERE a +"),
            Err(QueryError::Expression(_))
        ));
    }

    #[test]
    fn test_where_and_from_parsing_can_be_disabled() -> Result<()> {
        let config = EngineConfig {
            parse_from: false,
            parse_where: false,
            ..EngineConfig::default()
        };
        let tree = QueryParser::from_config(&config)
            .parse("SELECT cn, mail FROM ou=people,dc=example WHERE (objectClass=person)")?;
        assert_eq!(tree.tables.len(), 1);
        assert_eq!(tree.tables[0].locator, "ou=people,dc=example");
        assert_eq!(tree.tables[0].attributes_to_load, vec!["cn", "mail"]);
        assert_eq!(tree.where_text.as_deref(), Some("(objectClass=person)"));
        assert!(tree.where_expression.is_none());
        Ok(())
    }

    #[test]
    fn test_render() -> Result<()> {
        let tree = parse(
            "select a.id, b.x as bx, 'k' + a.n as label from ta as a inner join tb as b on a.id == b.id where b.x <> 'z'",
        )?;
        assert_eq!(
            tree.to_string(),
            "SELECT a.id, b.x AS bx, 'k' + a.n AS label FROM ta AS a INNER JOIN tb AS b ON a.id = b.id WHERE b.x <> 'z'"
        );
        Ok(())
    }
}
