#![no_main]

use dv_view::DataView;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok((mut source, segment)) = serde_json::from_slice::<(DataView, DataView)>(data) else {
        return;
    };
    let _ = dv_merge::merge(&mut source, segment);
});
