//! Fuzz target for DN splitting.
//!
//! Any input either fails to split or yields an RDN and parent that join
//! back to the input, with the parent exactly one level shallower.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_split_dn -- -max_total_time=600

#![no_main]

use immom::dn::{depth, is_descendant, join_dn, split_dn};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(dn) = std::str::from_utf8(data) else {
        return;
    };
    if dn.len() > 4096 {
        return;
    }

    if let Ok((rdn, parent)) = split_dn(dn) {
        assert!(!rdn.is_empty());
        assert_eq!(join_dn(rdn, parent), dn);

        if let (Ok(outer), Ok(inner)) = (depth(dn), depth(parent)) {
            assert_eq!(outer, inner + 1);
        }
        if !parent.is_empty() {
            assert!(is_descendant(dn, parent));
        }
    }
});
