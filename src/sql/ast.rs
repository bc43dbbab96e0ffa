//! Query tree produced by the SQL-subset parser.

use crate::expression::{Expression, NodeId};
use crate::sql::error::{QueryError, QueryResult};
use std::collections::BTreeMap;
use std::fmt;

/// One entry of the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    /// The item's text as written, trimmed
    pub source_text: String,
    pub expression: Expression,
    /// Explicit alias, or `source_text` when none was given
    pub alias: String,
    pub has_alias: bool,
    /// Physical column name when the item is a bare reference
    pub column_name: Option<String>,
    /// Name of the item's column in the result table
    pub result_column: String,
    /// Aliases of the tables the item references, in order of first use
    pub tables: Vec<String>,
}

impl SelectItem {
    pub fn is_reference(&self) -> bool {
        self.column_name.is_some()
    }

    pub fn is_constant(&self) -> bool {
        self.tables.is_empty()
    }

    /// Alias of the only table referenced, if exactly one is
    pub fn base_table(&self) -> Option<&str> {
        match self.tables.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
}

/// One equality of a join condition, split into its two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinKey {
    /// Side referring to the earlier (base) table
    pub base: NodeId,
    /// Side referring to the joined table
    pub join: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    pub kind: JoinKind,
    pub condition_text: String,
    pub condition: Expression,
    /// Alias of the earlier table the join attaches to
    pub base_alias: String,
    pub join_alias: String,
    pub keys: Vec<JoinKey>,
}

/// A table declared in FROM
#[derive(Debug, Clone, PartialEq)]
pub struct TableNode {
    /// Source-specific name of the data set (file, sheet, LDAP path, ...)
    pub locator: String,
    pub alias: String,
    /// Physical columns the source must deliver, in first-use order
    pub attributes_to_load: Vec<String>,
    /// Result column of each single-table SELECT item over this table, to its item index
    pub attribute_map: BTreeMap<String, usize>,
    /// Join attaching this table to an earlier one
    pub join: Option<JoinNode>,
}

impl TableNode {
    pub fn new(locator: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            alias: alias.into(),
            attributes_to_load: Vec::new(),
            attribute_map: BTreeMap::new(),
            join: None,
        }
    }

    /// Adds a column to load unless it is already requested.
    pub fn request_attribute(&mut self, column: &str) {
        if !self.attributes_to_load.iter().any(|c| c == column) {
            self.attributes_to_load.push(column.to_string());
        }
    }
}

/// A reference resolved to its table and physical column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Index of the table in FROM order
    pub table: usize,
    pub column: String,
}

/// A parsed `SELECT ... FROM ... [WHERE ...]` query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTree {
    pub select_items: Vec<SelectItem>,
    /// Tables in FROM declaration order
    pub tables: Vec<TableNode>,
    pub where_text: Option<String>,
    /// Parsed WHERE condition; `None` when there is no WHERE or it was not parsed
    pub where_expression: Option<Expression>,
}

impl QueryTree {
    pub fn table(&self, alias: &str) -> Option<&TableNode> {
        self.tables.iter().find(|t| t.alias == alias)
    }

    pub fn table_index(&self, alias: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.alias == alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.alias.as_str())
    }

    /// Result column names in SELECT order.
    pub fn result_columns(&self) -> Vec<&str> {
        self.select_items
            .iter()
            .map(|item| item.result_column.as_str())
            .collect()
    }

    /// Attributes a reference to a table.
    ///
    /// `alias.column` goes to the table with that alias. Without a known
    /// prefix the reference belongs to the sole table, taken as a whole as the
    /// column name; with several tables that is an error.
    pub fn resolve(&self, reference: &str, context: &str) -> QueryResult<ColumnRef> {
        resolve_reference(&self.tables, reference, context)
    }
}

pub(crate) fn resolve_reference(
    tables: &[TableNode],
    reference: &str,
    context: &str,
) -> QueryResult<ColumnRef> {
    if let Some((prefix, column)) = reference.split_once('.') {
        if let Some(table) = tables.iter().position(|t| t.alias == prefix) {
            return Ok(ColumnRef {
                table,
                column: column.to_string(),
            });
        }
        if tables.len() == 1 {
            return Ok(ColumnRef {
                table: 0,
                column: reference.to_string(),
            });
        }
        return Err(QueryError::MissingBaseTable {
            alias: prefix.to_string(),
            context: context.to_string(),
        });
    }

    if tables.len() == 1 {
        return Ok(ColumnRef {
            table: 0,
            column: reference.to_string(),
        });
    }
    Err(QueryError::AmbiguousColumn {
        column: reference.to_string(),
        reason: format!(
            "{} tables in FROM, qualify the column with a table alias in {}",
            tables.len(),
            context
        ),
    })
}

fn write_locator(f: &mut fmt::Formatter<'_>, locator: &str) -> fmt::Result {
    if locator.contains(|c: char| c.is_whitespace() || c == ',' || c == '"') {
        write!(f, "\"{}\"", locator.replace('"', "\"\""))
    } else {
        f.write_str(locator)
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, table: &TableNode) -> fmt::Result {
    write_locator(f, &table.locator)?;
    if table.alias != table.locator {
        write!(f, " AS {}", table.alias)?;
    }
    Ok(())
}

impl fmt::Display for QueryTree {
    /// Renders the query in canonical form. Parsing the output yields an
    /// equivalent tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        for (i, item) in self.select_items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let rendered = item.expression.to_string();
            f.write_str(&rendered)?;
            if item.has_alias && item.alias != rendered {
                write!(f, " AS {}", item.alias)?;
            }
        }

        f.write_str(" FROM ")?;
        for (i, table) in self.tables.iter().enumerate() {
            match &table.join {
                Some(join) => {
                    f.write_str(" INNER JOIN ")?;
                    write_table(f, table)?;
                    write!(f, " ON {}", join.condition)?;
                }
                None => {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_table(f, table)?;
                }
            }
        }

        match (&self.where_expression, &self.where_text) {
            (Some(condition), _) => write!(f, " WHERE {}", condition),
            (None, Some(text)) => write!(f, " WHERE {}", text),
            (None, None) => Ok(()),
        }
    }
}
