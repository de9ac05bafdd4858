//! Postfix expressions carried by plan operators.
//!
//! The engine consumes expressions in postfix form: operands are pushed, an
//! operator pops `arity` operands and pushes its result.

use std::fmt;

use nexus_common::{ColumnId, NexusError, NexusResult, TableId};

use crate::value::Value;

/// Expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprOp {
    /// Logical OR.
    Or,
    /// Greater than.
    Gt,
}

impl ExprOp {
    /// Returns the operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            ExprOp::Or => "OR",
            ExprOp::Gt => "GT",
        }
    }
}

/// One postfix item.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprItem {
    /// Column reference.
    Column {
        /// Owning table.
        table_id: TableId,
        /// Referenced column.
        column_id: ColumnId,
    },
    /// Integer or string literal.
    Const(Value),
    /// Operator applied to the top `arity` operands.
    Op {
        /// Operator.
        op: ExprOp,
        /// Operand count.
        arity: u8,
    },
}

impl fmt::Display for ExprItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprItem::Column {
                table_id,
                column_id,
            } => write!(f, "col({table_id},{column_id})"),
            ExprItem::Const(v) => write!(f, "{v}"),
            ExprItem::Op { op, arity } => write!(f, "{}/{arity}", op.symbol()),
        }
    }
}

/// A postfix expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostfixExpr {
    items: Vec<ExprItem>,
}

impl PostfixExpr {
    /// Creates an empty expression.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-literal expression.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` for anything but integers and strings.
    pub fn literal(value: &Value) -> NexusResult<Self> {
        match value {
            Value::Int(_) | Value::Varchar(_) => Ok(Self {
                items: vec![ExprItem::Const(value.clone())],
            }),
            other => Err(NexusError::not_supported(format!(
                "expression literal {other}"
            ))),
        }
    }

    /// `(column OR 0) > 0`.
    #[must_use]
    pub fn gt_zero(table_id: TableId, column_id: ColumnId) -> Self {
        Self::new()
            .push(ExprItem::Column {
                table_id,
                column_id,
            })
            .push(ExprItem::Const(Value::Int(0)))
            .push(ExprItem::Op {
                op: ExprOp::Or,
                arity: 2,
            })
            .push(ExprItem::Const(Value::Int(0)))
            .push(ExprItem::Op {
                op: ExprOp::Gt,
                arity: 2,
            })
    }

    /// Appends an item.
    #[must_use]
    pub fn push(mut self, item: ExprItem) -> Self {
        self.items.push(item);
        self
    }

    /// Returns the items.
    #[must_use]
    pub fn items(&self) -> &[ExprItem] {
        &self.items
    }

    /// Checks that every operator finds enough operands and exactly one
    /// result remains.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let mut depth: usize = 0;
        for item in &self.items {
            match item {
                ExprItem::Column { .. } | ExprItem::Const(_) => depth += 1,
                ExprItem::Op { arity, .. } => {
                    let arity = usize::from(*arity);
                    if arity == 0 || depth < arity {
                        return false;
                    }
                    depth = depth - arity + 1;
                }
            }
        }
        depth == 1
    }
}

impl fmt::Display for PostfixExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Rows of literal expressions, one expression per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExprValues {
    rows: Vec<Vec<PostfixExpr>>,
}

impl ExprValues {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row.
    pub fn push_row(&mut self, row: Vec<PostfixExpr>) {
        self.rows.push(row);
    }

    /// Returns the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<PostfixExpr>] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gt_zero() {
        let expr = PostfixExpr::gt_zero(TableId::new(1001), ColumnId::new(17));
        assert_eq!(expr.to_string(), "col(1001,17) 0 OR/2 0 GT/2");
        assert!(expr.is_well_formed());
    }

    #[test]
    fn test_malformed() {
        let expr = PostfixExpr::new().push(ExprItem::Op {
            op: ExprOp::Or,
            arity: 2,
        });
        assert!(!expr.is_well_formed());
        assert!(!PostfixExpr::new().is_well_formed());
    }

    #[test]
    fn test_literal_types() {
        assert!(PostfixExpr::literal(&Value::Int(1)).is_ok());
        let err = PostfixExpr::literal(&Value::Double(1.0)).unwrap_err();
        assert_eq!(err.code(), nexus_common::ErrorCode::NotSupported);
    }
}
