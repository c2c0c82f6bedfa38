#![forbid(unsafe_code)]

//! Umbrella crate re-exporting the DataView workspace: the data model,
//! the segment-merge engine, and the semantic-expression analysis layer.
//!
//! A hosting analytics application drives paging by merging each newly
//! fetched segment into its accumulated view until the segment marker
//! disappears:
//!
//! ```
//! use dataview::merge::merge;
//! use dataview::types::{DType, Scalar};
//! use dataview::view::{
//!     ColumnDescriptor, DataView, DataViewMetadata, DataViewTable, Projection,
//! };
//!
//! let columns = vec![ColumnDescriptor::new("Region", DType::Utf8)];
//! let mut accumulated = DataView::new(
//!     DataViewMetadata::segmented(columns.clone()),
//!     Projection::Table(DataViewTable::new(vec![vec![Scalar::from("East")]])),
//! );
//!
//! let segment = DataView::new(
//!     DataViewMetadata::new(columns),
//!     Projection::Table(DataViewTable::new(vec![vec![Scalar::from("West")]])),
//! );
//!
//! merge(&mut accumulated, segment).expect("segment merges");
//! assert!(!accumulated.is_segmented());
//! ```

pub use dv_expr as expr;
pub use dv_filter as filter;
pub use dv_merge as merge;
pub use dv_scope as scope;
pub use dv_types as types;
pub use dv_view as view;
