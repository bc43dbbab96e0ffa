//! Example joining two in-memory tables with a filtered, computed query

use anyhow::Result;
use tabquery::{MemorySource, QueryEngine, Table, Value};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Creating employees and departments...");
    let mut employees = Table::new(["emp_id", "emp_name", "dept_id", "salary"]);
    for (id, name, dept, salary) in [
        (1, "Alice Johnson", 10, 75000),
        (2, "Bob Smith", 20, 65000),
        (3, "Charlie Brown", 10, 80000),
        (4, "Diana Prince", 30, 90000),
        (5, "Eve Wilson", 20, 70000),
    ] {
        employees.push_row(vec![
            Value::Integer(id),
            Value::from(name),
            Value::Integer(dept),
            Value::Integer(salary),
        ]);
    }

    let mut departments = Table::new(["dept_id", "dept_name", "location"]);
    for (id, name, location) in [
        (10, "Engineering", "Building A"),
        (20, "Sales", "Building B"),
        (40, "Research", "Building D"),
    ] {
        departments.push_row(vec![
            Value::Integer(id),
            Value::from(name),
            Value::from(location),
        ]);
    }

    let source = MemorySource::new()
        .with_table("employees", employees)
        .with_table("departments", departments);
    let engine = QueryEngine::default();

    let queries = [
        "SELECT e.emp_name, d.dept_name FROM employees AS e \
         INNER JOIN departments AS d ON d.dept_id = e.dept_id",
        "SELECT e.emp_name, e.salary / 12 AS monthly, d.location FROM employees AS e \
         INNER JOIN departments AS d ON d.dept_id = e.dept_id \
         WHERE (e.salary >= 70000) and (d.location <> 'Building B')",
        "SELECT upper(e.emp_name) + ' @ ' + d.dept_name AS badge FROM employees AS e \
         INNER JOIN departments AS d ON d.dept_id = e.dept_id WHERE strleft(e.emp_name, ' ') = 'Eve'",
    ];

    for query in queries {
        println!("\n{}", query);
        let result = engine.query(query, &source).await?;
        println!("{}", result);
    }

    // Parse errors carry the offending text
    let err = engine
        .query("SELECT * FROM employees", &source)
        .await
        .unwrap_err();
    println!("\nExpected error: {}", err);

    Ok(())
}
