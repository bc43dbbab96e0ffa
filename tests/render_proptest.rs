//! Property-based tests for query rendering and partial parsing.

use proptest::prelude::*;
use tabquery::expression::ExpressionParser;
use tabquery::sql::QueryParser;

const RESERVED: &[&str] = &[
    "and", "or", "as", "select", "from", "where", "join", "inner", "on", "true", "false", "null",
    "left", "right", "full", "outer", "cross", "natural",
];

/// Strategy for identifiers that are not reserved words.
fn ident_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}".prop_filter("reserved word", |s| !RESERVED.contains(&s.as_str()))
}

/// Strategy for one select-list item and its expected source text.
fn item_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        ident_strategy(),
        (ident_strategy(), 0u16..1000).prop_map(|(c, n)| format!("{} + {}", c, n)),
        (ident_strategy(), ident_strategy()).prop_map(|(f, c)| format!("{}({}, 'a,b')", f, c)),
        (ident_strategy(), 0u16..1000).prop_map(|(c, n)| format!("({} * {})", c, n)),
    ]
}

proptest! {
    /// Property: rendering a parsed query and parsing it again gives the same query.
    #[test]
    fn render_then_parse_is_stable(
        c1 in ident_strategy(),
        c2 in ident_strategy(),
        alias in ident_strategy(),
        left in ident_strategy(),
        right in ident_strategy(),
        n in 0u16..1000,
    ) {
        let query = format!(
            "select t.{c1}, t.{c2} + {n} as {alias} from {left} as t \
             inner join {right} as s on s.{c1} = t.{c2} where (t.{c1} > {n}) and (s.{c2} <> 'x')"
        );
        let parser = QueryParser::new();
        let tree = parser.parse(&query).unwrap();
        let again = parser.parse(&tree.to_string()).unwrap();

        prop_assert_eq!(again.to_string(), tree.to_string());
        prop_assert_eq!(again.result_columns(), tree.result_columns());
        for (before, after) in tree.tables.iter().zip(&again.tables) {
            prop_assert_eq!(&before.locator, &after.locator);
            prop_assert_eq!(&before.alias, &after.alias);
            prop_assert_eq!(&before.attributes_to_load, &after.attributes_to_load);
        }
    }

    /// Property: partial parsing splits a comma-separated list into its items.
    #[test]
    fn partial_parse_splits_lists(items in prop::collection::vec(item_strategy(), 1..6)) {
        let parser = ExpressionParser::new();
        let mut rest = items.join(", ");
        let mut parsed = Vec::new();
        loop {
            let partial = parser.parse_partial(&rest).unwrap();
            parsed.push(partial.parsed);
            match partial.remainder.strip_prefix(',') {
                Some(next) => rest = next.to_string(),
                None => {
                    prop_assert_eq!(partial.remainder, "");
                    break;
                }
            }
        }
        prop_assert_eq!(parsed, items);
    }
}
