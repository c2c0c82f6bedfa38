#![forbid(unsafe_code)]

use dv_view::{
    DataView, DataViewCategorical, DataViewTable, DataViewTreeNode, Projection, ShapeKind,
    is_metadata_equivalent,
};
// Not derived via `thiserror`: several variants carry a field named
// `source` that is plain data, and the derive would treat it as the
// error source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    MetadataMismatch,
    ShapeMismatch {
        source: ShapeKind,
        segment: ShapeKind,
    },
    CategoryCountMismatch { source: usize, segment: usize },
    ValueCountMismatch { source: usize, segment: usize },
    ColumnMismatch { index: usize },
    OverlapIntoAbsentColumn { index: usize },
    StructureDivergence,
}

impl std::fmt::Display for MergeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeError::MetadataMismatch => {
                write!(f, "source and segment column metadata are not equivalent")
            }
            MergeError::ShapeMismatch { source, segment } => {
                write!(f, "source populates {source:?} but segment populates {segment:?}")
            }
            MergeError::CategoryCountMismatch { source, segment } => {
                write!(f, "category column count mismatch: source={source}, segment={segment}")
            }
            MergeError::ValueCountMismatch { source, segment } => {
                write!(f, "value column count mismatch: source={source}, segment={segment}")
            }
            MergeError::ColumnMismatch { index } => {
                write!(f, "column descriptor mismatch at position {index}")
            }
            MergeError::OverlapIntoAbsentColumn { index } => write!(
                f,
                "segment claims an overlap prefix into a column the source has not populated (position {index})"
            ),
            MergeError::StructureDivergence => {
                write!(f, "segment node structure diverges from the accumulated hierarchy")
            }
        }
    }
}

impl std::error::Error for MergeError {}

/// Fold `segment` into the accumulated `source` view.
///
/// Both must share equivalent column metadata and populate the same
/// physical shape. The segment is consumed; its backing storage moves
/// into the source. When the segment no longer carries a segment marker
/// the source is irreversibly marked complete.
///
/// Every contract check for a shape runs before that shape's first
/// mutation, so an `Err` leaves the source exactly as it was.
pub fn merge(source: &mut DataView, segment: DataView) -> Result<(), MergeError> {
    if !is_metadata_equivalent(&source.metadata, &segment.metadata) {
        return Err(MergeError::MetadataMismatch);
    }

    let segment_complete = !segment.metadata.is_segmented();

    match (&mut source.projection, segment.projection) {
        (Projection::Table(source_table), Projection::Table(segment_table)) => {
            merge_tables(source_table, segment_table);
        }
        (Projection::Categorical(source_cat), Projection::Categorical(segment_cat)) => {
            merge_categorical(source_cat, segment_cat)?;
        }
        (Projection::Tree(source_tree), Projection::Tree(segment_tree)) => {
            validate_tree_merge(&source_tree.root, &segment_tree.root, true)?;
            apply_tree_merge(&mut source_tree.root, segment_tree.root, true);
        }
        (Projection::Matrix(source_matrix), Projection::Matrix(segment_matrix)) => {
            // Matrix structure across segments must already agree; only the
            // row hierarchy grows.
            validate_tree_merge(&source_matrix.rows.root, &segment_matrix.rows.root, false)?;
            apply_tree_merge(&mut source_matrix.rows.root, segment_matrix.rows.root, false);
        }
        (source_projection, segment_projection) => {
            return Err(MergeError::ShapeMismatch {
                source: source_projection.kind(),
                segment: segment_projection.kind(),
            });
        }
    }

    if segment_complete {
        source.metadata.segment = None;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        shape = ?source.projection.kind(),
        complete = segment_complete,
        "merged segment into accumulated view"
    );

    Ok(())
}

/// Generic splice-merge primitive.
///
/// Removes the first `overlap` elements from `segment`, appends the rest
/// onto `source`, and returns the removed prefix. If `overlap` is at or
/// past the end of the segment, nothing is appended and the untouched
/// segment comes back whole; callers detect "nothing was consumed" from
/// that return value, so this is not an error.
pub fn splice_merge<T>(source: &mut Vec<T>, mut segment: Vec<T>, overlap: usize) -> Vec<T> {
    if overlap >= segment.len() {
        return segment;
    }
    let appended = segment.split_off(overlap);
    source.extend(appended);
    segment
}

/// Overlap prefix length: the index of the first non-merge child.
/// `is_merge` children are contiguous at the front by contract.
fn merge_prefix_len(children: &[DataViewTreeNode]) -> usize {
    children.iter().take_while(|child| child.is_merge).count()
}

fn overlap_len(last_merge_index: Option<usize>) -> usize {
    last_merge_index.map_or(0, |index| index + 1)
}

fn merge_tables(source: &mut DataViewTable, segment: DataViewTable) {
    if segment.rows.is_empty() {
        return;
    }
    let overlap = overlap_len(segment.last_merge_index);
    if let (Some(source_identity), Some(segment_identity)) =
        (source.identity.as_mut(), segment.identity)
    {
        splice_merge(source_identity, segment_identity, overlap);
    }
    splice_merge(&mut source.rows, segment.rows, overlap);
}

fn merge_categorical(
    source: &mut DataViewCategorical,
    segment: DataViewCategorical,
) -> Result<(), MergeError> {
    if source.categories.len() != segment.categories.len() {
        return Err(MergeError::CategoryCountMismatch {
            source: source.categories.len(),
            segment: segment.categories.len(),
        });
    }
    if source.values.len() != segment.values.len() {
        return Err(MergeError::ValueCountMismatch {
            source: source.values.len(),
            segment: segment.values.len(),
        });
    }

    let overlap = overlap_len(segment.last_merge_index);

    for (index, (source_column, segment_column)) in
        source.categories.iter().zip(&segment.categories).enumerate()
    {
        if source_column.source != segment_column.source {
            return Err(MergeError::ColumnMismatch { index });
        }
        let lazy_init = (source_column.values.is_none() && segment_column.values.is_some())
            || (source_column.identity.is_none() && segment_column.identity.is_some());
        if lazy_init && overlap > 0 {
            return Err(MergeError::OverlapIntoAbsentColumn { index });
        }
    }
    for (index, (source_column, segment_column)) in
        source.values.iter().zip(&segment.values).enumerate()
    {
        if source_column.source != segment_column.source {
            return Err(MergeError::ColumnMismatch { index });
        }
        let lazy_init = (source_column.values.is_none() && segment_column.values.is_some())
            || (source_column.highlights.is_none() && segment_column.highlights.is_some());
        if lazy_init && overlap > 0 {
            return Err(MergeError::OverlapIntoAbsentColumn { index });
        }
    }

    for (source_column, segment_column) in
        source.categories.iter_mut().zip(segment.categories)
    {
        if let Some(values) = segment_column.values {
            splice_merge(source_column.values.get_or_insert_with(Vec::new), values, overlap);
        }
        if let Some(identity) = segment_column.identity {
            splice_merge(
                source_column.identity.get_or_insert_with(Vec::new),
                identity,
                overlap,
            );
        }
    }
    for (source_column, segment_column) in source.values.iter_mut().zip(segment.values) {
        if let Some(values) = segment_column.values {
            splice_merge(source_column.values.get_or_insert_with(Vec::new), values, overlap);
        }
        if let Some(highlights) = segment_column.highlights {
            splice_merge(
                source_column.highlights.get_or_insert_with(Vec::new),
                highlights,
                overlap,
            );
        }
    }

    Ok(())
}

/// Non-mutating pre-flight over the single merge path (always the last
/// child), so the mutating pass below cannot fail halfway down.
fn validate_tree_merge(
    source: &DataViewTreeNode,
    segment: &DataViewTreeNode,
    allow_different_structure: bool,
) -> Result<(), MergeError> {
    let Some(segment_children) = segment.children.as_ref() else {
        return Ok(());
    };
    if segment_children.is_empty() {
        return Ok(());
    }
    if allow_different_structure && source.children.as_ref().is_none_or(Vec::is_empty) {
        // Adoption: the segment introduces a branch absent from prior
        // segments. Legal for tree views only.
        return Ok(());
    }

    let overlap = merge_prefix_len(segment_children);
    let Some(last_source_child) = source.children.as_ref().and_then(|children| children.last())
    else {
        // A childless source node can only accept a segment that marks
        // nothing as overlap, and only if it has an (empty) children list.
        if source.children.is_some() && overlap == 0 {
            return Ok(());
        }
        return Err(MergeError::StructureDivergence);
    };

    if overlap == 0 {
        return Ok(());
    }
    let last_consumed = &segment_children[overlap.min(segment_children.len()) - 1];
    validate_tree_merge(last_source_child, last_consumed, allow_different_structure)
}

/// Recursive structural merge of segment children into source children.
///
/// Only the most recently opened node in the hierarchy can straddle a
/// segment boundary, so recursion always follows the rightmost child:
/// the source's previous last child is merged against the last element
/// of the consumed overlap prefix.
fn apply_tree_merge(
    source: &mut DataViewTreeNode,
    segment: DataViewTreeNode,
    allow_different_structure: bool,
) {
    let Some(segment_children) = segment.children else {
        return;
    };
    if segment_children.is_empty() {
        return;
    }
    if allow_different_structure && source.children.as_ref().is_none_or(Vec::is_empty) {
        source.children = Some(segment_children);
        return;
    }
    let Some(source_children) = source.children.as_mut() else {
        return;
    };

    let overlap = merge_prefix_len(&segment_children);
    let last_source_index = source_children.len().checked_sub(1);
    let mut consumed = splice_merge(source_children, segment_children, overlap);

    if let (Some(index), Some(last_consumed)) = (last_source_index, consumed.pop()) {
        apply_tree_merge(&mut source_children[index], last_consumed, allow_different_structure);
    }
}
