#![forbid(unsafe_code)]

use std::hash::{Hash, Hasher};

use dv_expr::{CompareKind, ExprVisitor, SemanticExpr};
use dv_types::Scalar;
use serde::{Deserialize, Serialize};

/// Opaque row/group identity derived from a predicate expression,
/// typically an equality binding a field to a literal.
///
/// Two identities are equal iff their underlying expressions are
/// structurally equal after entity-variable stripping. The normalized
/// canonical key is computed once at construction, so equality and
/// hashing are cheap string operations afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SemanticExpr", into = "SemanticExpr")]
pub struct ScopeIdentity {
    expr: SemanticExpr,
    key: String,
}

impl ScopeIdentity {
    #[must_use]
    pub fn from_expr(expr: SemanticExpr) -> Self {
        let expr = expr.normalized();
        let key = expr.key();
        Self { expr, key }
    }

    /// Identity for `field = value`, the shape produced when a filter is
    /// flattened into per-value selection keys.
    #[must_use]
    pub fn equality(field: SemanticExpr, value: impl Into<Scalar>) -> Self {
        Self::from_expr(SemanticExpr::equal(field, SemanticExpr::literal(value)))
    }

    #[must_use]
    pub fn expr(&self) -> &SemanticExpr {
        &self.expr
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl From<SemanticExpr> for ScopeIdentity {
    fn from(expr: SemanticExpr) -> Self {
        Self::from_expr(expr)
    }
}

impl From<ScopeIdentity> for SemanticExpr {
    fn from(identity: ScopeIdentity) -> Self {
        identity.expr
    }
}

impl PartialEq for ScopeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ScopeIdentity {}

impl Hash for ScopeIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Extract the literal bound inside an identity's equality expression,
/// walking an AND-tree and preferring the first equality comparison with
/// a literal on either side.
#[must_use]
pub fn first_comparand_value(identity: &ScopeIdentity) -> Option<Scalar> {
    let mut finder = FindComparand;
    identity.expr().accept(&mut finder)
}

struct FindComparand;

impl ExprVisitor for FindComparand {
    type Output = Option<Scalar>;

    fn visit_default(&mut self, _expr: &SemanticExpr) -> Option<Scalar> {
        None
    }

    fn visit_and(
        &mut self,
        _expr: &SemanticExpr,
        left: &SemanticExpr,
        right: &SemanticExpr,
    ) -> Option<Scalar> {
        left.accept(self).or_else(|| right.accept(self))
    }

    fn visit_compare(
        &mut self,
        _expr: &SemanticExpr,
        op: CompareKind,
        left: &SemanticExpr,
        right: &SemanticExpr,
    ) -> Option<Scalar> {
        if op != CompareKind::Equal {
            return None;
        }
        match (left, right) {
            (SemanticExpr::Literal { value }, _) | (_, SemanticExpr::Literal { value }) => {
                Some(value.clone())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use dv_expr::{CompareKind, EntityRef, SemanticExpr};
    use dv_types::Scalar;

    use super::{ScopeIdentity, first_comparand_value};

    fn region() -> SemanticExpr {
        SemanticExpr::column(EntityRef::new("Sales"), "Region")
    }

    #[test]
    fn identities_over_same_field_and_value_are_equal() {
        let direct = ScopeIdentity::equality(region(), "East");
        let aliased = ScopeIdentity::equality(
            SemanticExpr::column(EntityRef::new("Sales").with_variable("s"), "Region"),
            "East",
        );

        assert_eq!(direct, aliased);

        let mut set = HashSet::new();
        set.insert(direct);
        assert!(set.contains(&aliased));
    }

    #[test]
    fn identities_differ_by_field_or_value() {
        let east = ScopeIdentity::equality(region(), "East");
        let west = ScopeIdentity::equality(region(), "West");
        let city = ScopeIdentity::equality(
            SemanticExpr::column(EntityRef::new("Sales"), "City"),
            "East",
        );

        assert_ne!(east, west);
        assert_ne!(east, city);
    }

    #[test]
    fn first_comparand_prefers_leftmost_equality_in_and_tree() {
        let compound = ScopeIdentity::from_expr(SemanticExpr::and(
            SemanticExpr::equal(region(), SemanticExpr::literal("East")),
            SemanticExpr::equal(
                SemanticExpr::column(EntityRef::new("Sales"), "Year"),
                SemanticExpr::literal(2024_i64),
            ),
        ));

        assert_eq!(
            first_comparand_value(&compound),
            Some(Scalar::from("East"))
        );
    }

    #[test]
    fn first_comparand_accepts_literal_on_either_side() {
        let flipped = ScopeIdentity::from_expr(SemanticExpr::equal(
            SemanticExpr::literal(42_i64),
            region(),
        ));
        assert_eq!(first_comparand_value(&flipped), Some(Scalar::Int64(42)));
    }

    #[test]
    fn non_equality_comparisons_yield_no_comparand() {
        let ranged = ScopeIdentity::from_expr(SemanticExpr::compare(
            CompareKind::GreaterThan,
            region(),
            SemanticExpr::literal(10_i64),
        ));
        assert_eq!(first_comparand_value(&ranged), None);
    }
}
