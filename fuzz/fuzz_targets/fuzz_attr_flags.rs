//! Fuzz target for attribute flag translation.
//!
//! Masks translate to symbols and back without gaining bits, and symbol
//! parsing never panics on arbitrary names.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_attr_flags -- -max_total_time=600

#![no_main]

use arbitrary::Arbitrary;
use immom::flags::{AttrFlags, FlagMask};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FlagsInput {
    mask: FlagMask,
    symbols: Vec<String>,
}

fuzz_target!(|input: FlagsInput| {
    let flags = AttrFlags::from_mask(input.mask);
    let mask = flags.to_mask();
    assert_eq!(mask & !input.mask, 0);

    let reparsed = AttrFlags::from_symbols(flags.symbols()).unwrap();
    assert_eq!(reparsed, flags);

    if input.symbols.len() <= 64 {
        let _ = AttrFlags::from_symbols(&input.symbols);
    }
});
