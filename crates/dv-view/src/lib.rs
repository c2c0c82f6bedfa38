#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use dv_scope::ScopeIdentity;
use dv_types::{DType, Scalar};
use serde::{Deserialize, Serialize};

/// Descriptor for one projected column, shared verbatim between the
/// accumulated view and every segment of the same logical query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_name: Option<String>,
    pub dtype: DType,
    #[serde(default)]
    pub is_measure: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub roles: BTreeMap<String, bool>,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(display_name: impl Into<String>, dtype: DType) -> Self {
        Self {
            display_name: display_name.into(),
            query_name: None,
            dtype,
            is_measure: false,
            roles: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn measure(display_name: impl Into<String>, dtype: DType) -> Self {
        Self {
            is_measure: true,
            ..Self::new(display_name, dtype)
        }
    }
}

/// Marks a DataView as one increment of a paginated result. Absence of
/// the marker means the logical view is complete. Once cleared by a
/// merge it is never reinstated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMarker {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewMetadata {
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<SegmentMarker>,
}

impl DataViewMetadata {
    #[must_use]
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            segment: None,
        }
    }

    #[must_use]
    pub fn segmented(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            segment: Some(SegmentMarker {}),
        }
    }

    #[must_use]
    pub fn is_segmented(&self) -> bool {
        self.segment.is_some()
    }
}

/// Column-descriptor equivalence between an accumulated view and an
/// incoming segment, ignoring the segment marker itself.
#[must_use]
pub fn is_metadata_equivalent(left: &DataViewMetadata, right: &DataViewMetadata) -> bool {
    left.columns == right.columns
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Table,
    Categorical,
    Tree,
    Matrix,
}

/// One of the four physical projections. Exactly one shape is populated
/// per view, and every segment of a logical view carries the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    Table(DataViewTable),
    Categorical(DataViewCategorical),
    Tree(DataViewTree),
    Matrix(DataViewMatrix),
}

impl Projection {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Table(_) => ShapeKind::Table,
            Self::Categorical(_) => ShapeKind::Categorical,
            Self::Tree(_) => ShapeKind::Tree,
            Self::Matrix(_) => ShapeKind::Matrix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataView {
    pub metadata: DataViewMetadata,
    pub projection: Projection,
}

impl DataView {
    #[must_use]
    pub fn new(metadata: DataViewMetadata, projection: Projection) -> Self {
        Self {
            metadata,
            projection,
        }
    }

    /// Whether further "load more" is possible for this logical view.
    #[must_use]
    pub fn is_segmented(&self) -> bool {
        self.metadata.is_segmented()
    }
}

/// Row-of-cells projection. On a segment, `last_merge_index` is the
/// highest index within `rows` that duplicates data already present in
/// the accumulated source; the overlap is contiguous at the front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewTable {
    pub rows: Vec<Vec<Scalar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Vec<ScopeIdentity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_merge_index: Option<usize>,
}

impl DataViewTable {
    #[must_use]
    pub fn new(rows: Vec<Vec<Scalar>>) -> Self {
        Self {
            rows,
            identity: None,
            last_merge_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewCategoryColumn {
    pub source: ColumnDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Scalar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Vec<ScopeIdentity>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewValueColumn {
    pub source: ColumnDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Scalar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<Scalar>>,
}

/// Parallel category/value column arrays. Column correspondence between
/// a source and a segment is positional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewCategorical {
    pub categories: Vec<DataViewCategoryColumn>,
    pub values: Vec<DataViewValueColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_merge_index: Option<usize>,
}

/// Hierarchical aggregation node. On segments, `is_merge` flags a child
/// as a duplicate of one already merged from a previous segment; all
/// `is_merge` children are contiguous and precede novel children.
///
/// `children: None` (a closed leaf) is distinct from `Some(vec![])` (an
/// open node that currently has no children).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewTreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ScopeIdentity>,
    #[serde(default)]
    pub is_merge: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DataViewTreeNode>>,
}

impl DataViewTreeNode {
    #[must_use]
    pub fn leaf(value: impl Into<Scalar>) -> Self {
        Self {
            value: Some(value.into()),
            identity: None,
            is_merge: false,
            children: None,
        }
    }

    #[must_use]
    pub fn branch(value: impl Into<Scalar>, children: Vec<DataViewTreeNode>) -> Self {
        Self {
            value: Some(value.into()),
            identity: None,
            is_merge: false,
            children: Some(children),
        }
    }

    #[must_use]
    pub fn root(children: Vec<DataViewTreeNode>) -> Self {
        Self {
            value: None,
            identity: None,
            is_merge: false,
            children: Some(children),
        }
    }

    #[must_use]
    pub fn merged(mut self) -> Self {
        self.is_merge = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewTree {
    pub root: DataViewTreeNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewHierarchy {
    pub root: DataViewTreeNode,
}

/// 2D hierarchical projection. Segments extend the row hierarchy only;
/// the column hierarchy is fixed after the first segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewMatrix {
    pub rows: DataViewHierarchy,
    pub columns: DataViewHierarchy,
}

#[cfg(test)]
mod tests {
    use dv_expr::{EntityRef, SemanticExpr};
    use dv_scope::ScopeIdentity;
    use dv_types::{DType, Scalar};

    use super::{
        ColumnDescriptor, DataView, DataViewCategorical, DataViewCategoryColumn,
        DataViewMetadata, DataViewValueColumn, Projection, ShapeKind, is_metadata_equivalent,
    };

    fn category_descriptor() -> ColumnDescriptor {
        ColumnDescriptor::new("Region", DType::Utf8)
    }

    fn segmented_categorical() -> DataView {
        let identity = ScopeIdentity::equality(
            SemanticExpr::column(EntityRef::new("Sales"), "Region"),
            "East",
        );
        DataView::new(
            DataViewMetadata::segmented(vec![
                category_descriptor(),
                ColumnDescriptor::measure("Amount", DType::Float64),
            ]),
            Projection::Categorical(DataViewCategorical {
                categories: vec![DataViewCategoryColumn {
                    source: category_descriptor(),
                    values: Some(vec![Scalar::from("East")]),
                    identity: Some(vec![identity]),
                }],
                values: vec![DataViewValueColumn {
                    source: ColumnDescriptor::measure("Amount", DType::Float64),
                    values: Some(vec![Scalar::Float64(12.5)]),
                    highlights: None,
                }],
                last_merge_index: None,
            }),
        )
    }

    #[test]
    fn segment_marker_drives_is_segmented() {
        let view = segmented_categorical();
        assert!(view.is_segmented());

        let complete = DataViewMetadata::new(vec![category_descriptor()]);
        assert!(!complete.is_segmented());
    }

    #[test]
    fn metadata_equivalence_ignores_segment_marker() {
        let segmented = DataViewMetadata::segmented(vec![category_descriptor()]);
        let complete = DataViewMetadata::new(vec![category_descriptor()]);
        assert!(is_metadata_equivalent(&segmented, &complete));

        let other = DataViewMetadata::new(vec![ColumnDescriptor::new("City", DType::Utf8)]);
        assert!(!is_metadata_equivalent(&segmented, &other));
    }

    #[test]
    fn projection_reports_its_shape() {
        let view = segmented_categorical();
        assert_eq!(view.projection.kind(), ShapeKind::Categorical);
    }

    #[test]
    fn serde_round_trips_a_segmented_view() {
        let view = segmented_categorical();
        let json = serde_json::to_string(&view).expect("serialize");
        let back: DataView = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(view, back);
        assert!(back.is_segmented());
    }
}
