#![no_main]

use dv_expr::{EntityRef, SemanticExpr};
use dv_filter::{SemanticFilter, as_scope_ids_container};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(filter) = serde_json::from_slice::<SemanticFilter>(data) else {
        return;
    };
    let field = SemanticExpr::column(EntityRef::new("Sales"), "Region");
    let _ = as_scope_ids_container(&filter, &[field]);
});
