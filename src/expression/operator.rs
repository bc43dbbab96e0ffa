//! Operator definitions for expressions.

/// Arithmetic and bitwise operator symbols.
pub const ARITHMETIC_OPERATORS: &[&str] = &["+", "-", "*", "/", "%", "&", "|"];

/// Relational operator symbols. `==` is accepted as an alias of `=`.
pub const RELATIONAL_OPERATORS: &[&str] = &["<", "<=", ">", ">=", "=", "==", "<>", "!="];

/// Logical operator symbols. The word forms match case-insensitively.
pub const LOGICAL_OPERATORS: &[&str] = &["&&", "||", "and", "or"];

/// Longest symbolic operator, in characters.
pub const MAX_SYMBOL_LEN: usize = 2;

/// Binary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,

    // Relational
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,

    // Logical
    And,
    Or,
}

/// Operator families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    Arithmetic,
    Relational,
    Logical,
}

impl BinaryOperator {
    /// Looks up an operator by its written form.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Sub,
            "*" => BinaryOperator::Mul,
            "/" => BinaryOperator::Div,
            "%" => BinaryOperator::Mod,
            "&" => BinaryOperator::BitAnd,
            "|" => BinaryOperator::BitOr,
            "<" => BinaryOperator::Lt,
            "<=" => BinaryOperator::Le,
            ">" => BinaryOperator::Gt,
            ">=" => BinaryOperator::Ge,
            "=" | "==" => BinaryOperator::Eq,
            "<>" | "!=" => BinaryOperator::Ne,
            "&&" => BinaryOperator::And,
            "||" => BinaryOperator::Or,
            word if word.eq_ignore_ascii_case("and") => BinaryOperator::And,
            word if word.eq_ignore_ascii_case("or") => BinaryOperator::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical written form, used when rendering.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }

    pub fn class(&self) -> OperatorClass {
        match self {
            BinaryOperator::Add
            | BinaryOperator::Sub
            | BinaryOperator::Mul
            | BinaryOperator::Div
            | BinaryOperator::Mod
            | BinaryOperator::BitAnd
            | BinaryOperator::BitOr => OperatorClass::Arithmetic,
            BinaryOperator::Lt
            | BinaryOperator::Le
            | BinaryOperator::Gt
            | BinaryOperator::Ge
            | BinaryOperator::Eq
            | BinaryOperator::Ne => OperatorClass::Relational,
            BinaryOperator::And | BinaryOperator::Or => OperatorClass::Logical,
        }
    }

    pub fn is_relational(&self) -> bool {
        self.class() == OperatorClass::Relational
    }

    pub fn is_logical(&self) -> bool {
        self.class() == OperatorClass::Logical
    }
}

/// True if `symbol` is one of the symbolic (non-word) operators.
pub fn is_operator_symbol(symbol: &str) -> bool {
    ARITHMETIC_OPERATORS
        .iter()
        .chain(RELATIONAL_OPERATORS)
        .chain(LOGICAL_OPERATORS)
        .any(|op| *op == symbol && !op.chars().all(|c| c.is_ascii_alphabetic()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_symbol_resolves() {
        for symbol in ARITHMETIC_OPERATORS
            .iter()
            .chain(RELATIONAL_OPERATORS)
            .chain(LOGICAL_OPERATORS)
        {
            assert!(
                BinaryOperator::from_symbol(symbol).is_some(),
                "{} should resolve",
                symbol
            );
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(BinaryOperator::from_symbol("=="), Some(BinaryOperator::Eq));
        assert_eq!(BinaryOperator::from_symbol("!="), Some(BinaryOperator::Ne));
        assert_eq!(BinaryOperator::from_symbol("AND"), Some(BinaryOperator::And));
        assert_eq!(BinaryOperator::from_symbol("Or"), Some(BinaryOperator::Or));
        assert_eq!(BinaryOperator::from_symbol("xor"), None);
    }

    #[test]
    fn test_classes() {
        assert!(BinaryOperator::Le.is_relational());
        assert!(BinaryOperator::Or.is_logical());
        assert_eq!(BinaryOperator::Mod.class(), OperatorClass::Arithmetic);
        assert!(is_operator_symbol("<>"));
        assert!(!is_operator_symbol("and"));
        assert!(!is_operator_symbol("<<"));
    }
}
