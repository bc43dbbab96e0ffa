//! Table sources: the callback the engine uses to obtain raw tables.
//!
//! A source receives the parsed query tree so it can see which columns each
//! table needs, and the WHERE text when WHERE evaluation is disabled. It
//! returns one raw table per alias; the executor projects each raw table to
//! its requested columns.

use crate::sql::{QueryTree, TableNode};
use crate::table::Table;
use crate::value::Value;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Loads the raw tables a query refers to
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Load the data set of one FROM entry
    async fn load_table(&self, table: &TableNode) -> Result<Table>;

    /// Load every table of `tree`, keyed by alias.
    ///
    /// Tables are loaded one after another in FROM order. The first error
    /// aborts loading and is returned as is.
    async fn load_tables(&self, tree: &QueryTree) -> Result<HashMap<String, Table>> {
        let mut tables = HashMap::new();
        for node in &tree.tables {
            let table = self.load_table(node).await?;
            debug!(
                "loaded '{}' as '{}': {} rows",
                node.locator,
                node.alias,
                table.len()
            );
            tables.insert(node.alias.clone(), table);
        }
        Ok(tables)
    }
}

/// Tables held in memory, looked up by locator
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, Table>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: impl Into<String>, table: Table) {
        self.tables.insert(locator.into(), table);
    }

    pub fn with_table(mut self, locator: impl Into<String>, table: Table) -> Self {
        self.insert(locator, table);
        self
    }
}

#[async_trait]
impl TableSource for MemorySource {
    async fn load_table(&self, table: &TableNode) -> Result<Table> {
        match self.tables.get(&table.locator) {
            Some(found) => Ok(found.clone()),
            None => bail!("No table named '{}' in memory source", table.locator),
        }
    }
}

/// Reads tables from files holding a JSON array of objects.
///
/// The locator is taken as a file path, relative to the base directory when
/// one is set. An alias can be bound to an explicit path instead.
#[derive(Debug, Clone, Default)]
pub struct JsonFileSource {
    base_dir: Option<PathBuf>,
    bindings: HashMap<String, PathBuf>,
}

impl JsonFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Read the table with the given alias from `path`
    pub fn bind(&mut self, alias: impl Into<String>, path: impl Into<PathBuf>) {
        self.bindings.insert(alias.into(), path.into());
    }

    fn path_for(&self, table: &TableNode) -> PathBuf {
        let path = self
            .bindings
            .get(&table.alias)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(&table.locator));
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl TableSource for JsonFileSource {
    async fn load_table(&self, table: &TableNode) -> Result<Table> {
        let path = self.path_for(table);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read table file {}", path.display()))?;
        parse_json_table(&text, &path)
    }
}

/// Builds a table from a JSON array of objects. Columns are the union of
/// the object keys in order of first appearance; absent keys are null.
fn parse_json_table(text: &str, path: &Path) -> Result<Table> {
    let document: serde_json::Value = serde_json::from_str(text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    let serde_json::Value::Array(records) = document else {
        bail!("{} does not contain a JSON array", path.display());
    };

    let mut columns: Vec<String> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(object) = record.as_object() else {
            bail!("Element {} of {} is not an object", index, path.display());
        };
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new(columns.clone());
    for record in &records {
        let row = columns
            .iter()
            .map(|column| record.get(column).map_or(Value::Null, json_to_value))
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Null, Value::Number),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::QueryParser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_memory_source_loads_every_alias() -> Result<()> {
        let source = MemorySource::new()
            .with_table("people", Table::new(["id"]).with_row([Value::Integer(1)]))
            .with_table("pets", Table::new(["owner"]));
        let tree = QueryParser::new()
            .parse("SELECT p.id FROM people AS p INNER JOIN pets AS q ON q.owner = p.id")?;

        let tables = source.load_tables(&tree).await?;
        assert_eq!(tables.len(), 2);
        assert_eq!(tables["p"].len(), 1);
        assert!(tables["q"].is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_source_unknown_locator() -> Result<()> {
        let tree = QueryParser::new().parse("SELECT id FROM nowhere")?;
        let err = MemorySource::new().load_tables(&tree).await.unwrap_err();
        assert!(err.to_string().contains("nowhere"));
        Ok(())
    }

    #[tokio::test]
    async fn test_json_file_source() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"[{{"id": 1, "score": 2.5, "tags": ["a"]}}, {{"id": 2, "name": "bo", "ok": true}}]"#
        )?;

        let mut source = JsonFileSource::new();
        source.bind("t", file.path());
        let tree = QueryParser::new().parse("SELECT t.id FROM data AS t")?;
        let tables = source.load_tables(&tree).await?;
        let table = &tables["t"];

        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "id"), Some(&Value::Integer(1)));
        assert_eq!(table.value(0, "score"), Some(&Value::Number(2.5)));
        assert_eq!(table.value(0, "tags"), Some(&Value::from(r#"["a"]"#)));
        assert_eq!(table.value(0, "name"), Some(&Value::Null));
        assert_eq!(table.value(1, "name"), Some(&Value::from("bo")));
        assert_eq!(table.value(1, "ok"), Some(&Value::Boolean(true)));
        Ok(())
    }

    #[tokio::test]
    async fn test_json_file_source_rejects_non_arrays() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"id": 1}}"#)?;

        let mut source = JsonFileSource::new();
        source.bind("t", file.path());
        let tree = QueryParser::new().parse("SELECT t.id FROM data AS t")?;
        let err = source.load_tables(&tree).await.unwrap_err();
        assert!(err.to_string().contains("JSON array"));
        Ok(())
    }

    #[tokio::test]
    async fn test_json_file_source_relative_to_base_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("rows.json"), r#"[{"n": "x"}]"#)?;

        let source = JsonFileSource::new().with_base_dir(dir.path());
        let tree = QueryParser::new().parse("SELECT n FROM rows.json")?;
        let tables = source.load_tables(&tree).await?;
        assert_eq!(tables["rows.json"].value(0, "n"), Some(&Value::from("x")));
        Ok(())
    }
}
