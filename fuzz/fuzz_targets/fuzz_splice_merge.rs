#![no_main]

use dv_merge::splice_merge;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&overlap, rest)) = data.split_first() else {
        return;
    };
    let overlap = overlap as usize;
    let split = rest.len() / 2;
    let mut source = rest[..split].to_vec();
    let segment = rest[split..].to_vec();

    let source_len = source.len();
    let segment_len = segment.len();

    let consumed = splice_merge(&mut source, segment.clone(), overlap);

    if overlap >= segment_len {
        // Nothing consumed: the whole segment comes back untouched.
        assert_eq!(consumed, segment);
        assert_eq!(source.len(), source_len);
    } else {
        assert_eq!(consumed, segment[..overlap].to_vec());
        assert_eq!(source.len(), source_len + segment_len - overlap);
        assert_eq!(source[source_len..].to_vec(), segment[overlap..].to_vec());
        assert_eq!(source[..source_len].to_vec(), rest[..split].to_vec());
    }
});
