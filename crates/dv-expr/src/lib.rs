#![forbid(unsafe_code)]

use std::fmt::Write as _;

use dv_types::Scalar;
use serde::{Deserialize, Serialize};

/// Reference to a source entity (table), optionally through a query
/// variable alias. Two references to the same entity through different
/// variables must compare equal once normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

impl EntityRef {
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            schema: None,
            entity: entity.into(),
            variable: None,
        }
    }

    #[must_use]
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    /// Drop the query-variable indirection. Applied identically to filter
    /// targets and encountered column references before any comparison.
    #[must_use]
    pub fn strip_variable(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            entity: self.entity.clone(),
            variable: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub source: EntityRef,
    pub name: String,
}

impl ColumnRef {
    #[must_use]
    pub fn new(source: EntityRef, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareKind {
    Equal,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

/// Immutable boolean/comparison/constant expression tree describing a
/// row-selection predicate. Constructed by the query layer, consumed
/// read-only by analysis visitors; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SemanticExpr {
    Literal {
        value: Scalar,
    },
    Column {
        column: ColumnRef,
    },
    Compare {
        op: CompareKind,
        left: Box<SemanticExpr>,
        right: Box<SemanticExpr>,
    },
    And {
        left: Box<SemanticExpr>,
        right: Box<SemanticExpr>,
    },
    Or {
        left: Box<SemanticExpr>,
        right: Box<SemanticExpr>,
    },
    Not {
        expr: Box<SemanticExpr>,
    },
}

impl SemanticExpr {
    #[must_use]
    pub fn literal(value: impl Into<Scalar>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    #[must_use]
    pub fn null_literal() -> Self {
        Self::Literal {
            value: Scalar::Null(dv_types::NullKind::Null),
        }
    }

    #[must_use]
    pub fn column(source: EntityRef, name: impl Into<String>) -> Self {
        Self::Column {
            column: ColumnRef::new(source, name),
        }
    }

    #[must_use]
    pub fn compare(op: CompareKind, left: Self, right: Self) -> Self {
        Self::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn equal(left: Self, right: Self) -> Self {
        Self::compare(CompareKind::Equal, left, right)
    }

    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn not(expr: Self) -> Self {
        Self::Not {
            expr: Box::new(expr),
        }
    }

    /// Double dispatch into `visitor`, invoking the method matching this
    /// node's kind. Pure and reentrant-safe.
    pub fn accept<V: ExprVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Self::Literal { value } => visitor.visit_literal(self, value),
            Self::Column { column } => visitor.visit_column(self, column),
            Self::Compare { op, left, right } => visitor.visit_compare(self, *op, left, right),
            Self::And { left, right } => visitor.visit_and(self, left, right),
            Self::Or { left, right } => visitor.visit_or(self, left, right),
            Self::Not { expr } => visitor.visit_not(self, expr),
        }
    }

    /// Copy of this tree with every entity-variable indirection stripped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self {
            Self::Literal { value } => Self::Literal {
                value: value.clone(),
            },
            Self::Column { column } => Self::Column {
                column: ColumnRef {
                    source: column.source.strip_variable(),
                    name: column.name.clone(),
                },
            },
            Self::Compare { op, left, right } => Self::Compare {
                op: *op,
                left: Box::new(left.normalized()),
                right: Box::new(right.normalized()),
            },
            Self::And { left, right } => {
                Self::and(left.normalized(), right.normalized())
            }
            Self::Or { left, right } => Self::or(left.normalized(), right.normalized()),
            Self::Not { expr } => Self::not(expr.normalized()),
        }
    }

    /// Structural equality after normalization. Literals compare with
    /// `semantic_eq` so NaN constants do not break identity matching.
    #[must_use]
    pub fn structural_eq(&self, other: &Self) -> bool {
        fn eq(left: &SemanticExpr, right: &SemanticExpr) -> bool {
            match (left, right) {
                (SemanticExpr::Literal { value: a }, SemanticExpr::Literal { value: b }) => {
                    a.semantic_eq(b)
                }
                (SemanticExpr::Column { column: a }, SemanticExpr::Column { column: b }) => {
                    a.source.strip_variable() == b.source.strip_variable() && a.name == b.name
                }
                (
                    SemanticExpr::Compare {
                        op: op_a,
                        left: l_a,
                        right: r_a,
                    },
                    SemanticExpr::Compare {
                        op: op_b,
                        left: l_b,
                        right: r_b,
                    },
                ) => op_a == op_b && eq(l_a, l_b) && eq(r_a, r_b),
                (
                    SemanticExpr::And {
                        left: l_a,
                        right: r_a,
                    },
                    SemanticExpr::And {
                        left: l_b,
                        right: r_b,
                    },
                )
                | (
                    SemanticExpr::Or {
                        left: l_a,
                        right: r_a,
                    },
                    SemanticExpr::Or {
                        left: l_b,
                        right: r_b,
                    },
                ) => eq(l_a, l_b) && eq(r_a, r_b),
                (SemanticExpr::Not { expr: a }, SemanticExpr::Not { expr: b }) => eq(a, b),
                _ => false,
            }
        }

        eq(self, other)
    }

    /// Stable canonical key of the normalized tree, usable as a hash input.
    #[must_use]
    pub fn key(&self) -> String {
        fn write_key(expr: &SemanticExpr, out: &mut String) {
            match expr {
                SemanticExpr::Literal { value } => {
                    let _ = write!(out, "lit({})", value.key_fragment());
                }
                SemanticExpr::Column { column } => {
                    let source = column.source.strip_variable();
                    let _ = write!(
                        out,
                        "col({}.{}.{})",
                        source.schema.as_deref().unwrap_or(""),
                        source.entity,
                        column.name
                    );
                }
                SemanticExpr::Compare { op, left, right } => {
                    let _ = write!(out, "cmp({op:?},");
                    write_key(left, out);
                    out.push(',');
                    write_key(right, out);
                    out.push(')');
                }
                SemanticExpr::And { left, right } => {
                    out.push_str("and(");
                    write_key(left, out);
                    out.push(',');
                    write_key(right, out);
                    out.push(')');
                }
                SemanticExpr::Or { left, right } => {
                    out.push_str("or(");
                    write_key(left, out);
                    out.push(',');
                    write_key(right, out);
                    out.push(')');
                }
                SemanticExpr::Not { expr } => {
                    out.push_str("not(");
                    write_key(expr, out);
                    out.push(')');
                }
            }
        }

        let mut out = String::new();
        write_key(self, &mut out);
        out
    }
}

/// Visitor over [`SemanticExpr`] nodes. Every method defaults to
/// `visit_default`, so a concrete visitor only implements the node kinds
/// relevant to its analysis.
pub trait ExprVisitor {
    type Output;

    fn visit_default(&mut self, expr: &SemanticExpr) -> Self::Output;

    fn visit_literal(&mut self, expr: &SemanticExpr, _value: &Scalar) -> Self::Output {
        self.visit_default(expr)
    }

    fn visit_column(&mut self, expr: &SemanticExpr, _column: &ColumnRef) -> Self::Output {
        self.visit_default(expr)
    }

    fn visit_compare(
        &mut self,
        expr: &SemanticExpr,
        _op: CompareKind,
        _left: &SemanticExpr,
        _right: &SemanticExpr,
    ) -> Self::Output {
        self.visit_default(expr)
    }

    fn visit_and(
        &mut self,
        expr: &SemanticExpr,
        _left: &SemanticExpr,
        _right: &SemanticExpr,
    ) -> Self::Output {
        self.visit_default(expr)
    }

    fn visit_or(
        &mut self,
        expr: &SemanticExpr,
        _left: &SemanticExpr,
        _right: &SemanticExpr,
    ) -> Self::Output {
        self.visit_default(expr)
    }

    fn visit_not(&mut self, expr: &SemanticExpr, _inner: &SemanticExpr) -> Self::Output {
        self.visit_default(expr)
    }
}
