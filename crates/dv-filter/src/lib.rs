#![forbid(unsafe_code)]

use dv_expr::{ColumnRef, CompareKind, ExprVisitor, SemanticExpr};
use dv_scope::ScopeIdentity;
use dv_types::Scalar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A semantic filter as handed over by the query layer: a list of
/// top-level conditions, each a boolean predicate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticFilter {
    conditions: Vec<SemanticExpr>,
}

impl SemanticFilter {
    #[must_use]
    pub fn new(condition: SemanticExpr) -> Self {
        Self {
            conditions: vec![condition],
        }
    }

    #[must_use]
    pub fn from_conditions(conditions: Vec<SemanticExpr>) -> Self {
        Self { conditions }
    }

    #[must_use]
    pub fn conditions(&self) -> &[SemanticExpr] {
        &self.conditions
    }
}

/// Flattened semantics of a filter recognized as a flat disjunction of
/// equality constants over one field, optionally negated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterScopeIds {
    pub is_not: bool,
    pub scope_ids: Vec<ScopeIdentity>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter must carry exactly one top-level condition; found {0}")]
    ConditionCount(usize),
    #[error("scope-id analysis requires exactly one target field expression; found {0}")]
    FieldCount(usize),
    #[error("negation may appear only once, at the root of the condition tree")]
    MultipleNegations,
}

/// Determine whether `filter`'s condition tree has the shape
/// `(field = c1) OR (field = c2) OR ...`, optionally wrapped in a single
/// leading NOT, and flatten it into scope identities plus the negation
/// flag.
///
/// `Ok(None)` means the filter is not expressible as a flat equality set;
/// callers fall back to other selection-state logic. A filter with more
/// (or fewer) than one condition, or a field list that is not a single
/// expression, is caller misuse and yields an error.
pub fn as_scope_ids_container(
    filter: &SemanticFilter,
    fields: &[SemanticExpr],
) -> Result<Option<FilterScopeIds>, FilterError> {
    let [condition] = filter.conditions() else {
        return Err(FilterError::ConditionCount(filter.conditions().len()));
    };
    let [field] = fields else {
        return Err(FilterError::FieldCount(fields.len()));
    };

    let mut collector = ScopeIdsCollector::new(field);
    let recognized = condition.accept(&mut collector);
    if let Some(error) = collector.error {
        return Err(error);
    }
    if !recognized {
        return Ok(None);
    }

    let field = collector.field;
    let scope_ids = collector
        .values
        .into_iter()
        .map(|value| ScopeIdentity::equality(field.clone(), value))
        .collect();

    Ok(Some(FilterScopeIds {
        is_not: collector.is_not,
        scope_ids,
    }))
}

/// Recursive-descent recognizer for the flat equality-set shape.
///
/// `is_root` stays true only until the first OR or comparison is
/// consumed; it gates where NOT may appear and rejects a bare null
/// literal as the whole condition.
struct ScopeIdsCollector {
    field: SemanticExpr,
    is_root: bool,
    is_not: bool,
    values: Vec<Scalar>,
    error: Option<FilterError>,
}

impl ScopeIdsCollector {
    fn new(field: &SemanticExpr) -> Self {
        Self {
            field: field.normalized(),
            is_root: true,
            is_not: false,
            values: Vec::new(),
            error: None,
        }
    }
}

impl ExprVisitor for ScopeIdsCollector {
    type Output = bool;

    fn visit_default(&mut self, _expr: &SemanticExpr) -> bool {
        false
    }

    fn visit_or(&mut self, _expr: &SemanticExpr, left: &SemanticExpr, right: &SemanticExpr) -> bool {
        self.is_root = false;
        left.accept(self) && right.accept(self)
    }

    fn visit_not(&mut self, _expr: &SemanticExpr, inner: &SemanticExpr) -> bool {
        if !self.is_root {
            return false;
        }
        if self.is_not {
            self.error = Some(FilterError::MultipleNegations);
            return false;
        }
        self.is_not = true;
        inner.accept(self)
    }

    fn visit_compare(
        &mut self,
        _expr: &SemanticExpr,
        op: CompareKind,
        left: &SemanticExpr,
        right: &SemanticExpr,
    ) -> bool {
        self.is_root = false;
        if op != CompareKind::Equal {
            return false;
        }
        left.accept(self) && right.accept(self)
    }

    fn visit_literal(&mut self, _expr: &SemanticExpr, value: &Scalar) -> bool {
        if self.is_root && value.is_null() {
            return false;
        }
        self.values.push(value.clone());
        true
    }

    fn visit_column(&mut self, expr: &SemanticExpr, _column: &ColumnRef) -> bool {
        expr.structural_eq(&self.field)
    }
}
