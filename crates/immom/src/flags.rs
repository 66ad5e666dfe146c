//! Attribute flags
//!
//! The service stores attribute flags as an OR of bit values
//! (`SaImmAttrFlagsT`). Clients work with [`AttrFlags`], a set of symbolic
//! [`AttrFlag`]s, translated through a fixed table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ImmError, ImmResult};

/// Native flag mask as stored by the service.
pub type FlagMask = u64;

/// A single attribute flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttrFlag {
    MultiValue,
    Rdn,
    Config,
    Writable,
    Initialized,
    Runtime,
    Persistent,
    Cached,
}

/// Symbol table: flag, symbolic name, native bit.
const FLAG_TABLE: [(AttrFlag, &str, FlagMask); 8] = [
    (AttrFlag::MultiValue, "MULTI_VALUE", 0x0000_0001),
    (AttrFlag::Rdn, "RDN", 0x0000_0002),
    (AttrFlag::Config, "CONFIG", 0x0000_0100),
    (AttrFlag::Writable, "WRITABLE", 0x0000_0200),
    (AttrFlag::Initialized, "INITIALIZED", 0x0000_0400),
    (AttrFlag::Runtime, "RUNTIME", 0x0001_0000),
    (AttrFlag::Persistent, "PERSISTENT", 0x0002_0000),
    (AttrFlag::Cached, "CACHED", 0x0004_0000),
];

impl AttrFlag {
    /// Every known flag, in table order.
    pub const ALL: [AttrFlag; 8] = [
        AttrFlag::MultiValue,
        AttrFlag::Rdn,
        AttrFlag::Config,
        AttrFlag::Writable,
        AttrFlag::Initialized,
        AttrFlag::Runtime,
        AttrFlag::Persistent,
        AttrFlag::Cached,
    ];

    fn entry(self) -> &'static (AttrFlag, &'static str, FlagMask) {
        // The table holds one entry per variant in declaration order.
        &FLAG_TABLE[self as usize]
    }

    /// Native bit value.
    #[must_use]
    pub fn bit(self) -> FlagMask {
        self.entry().2
    }

    /// Symbolic name, e.g. `"MULTI_VALUE"`.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        self.entry().1
    }

    /// Look up a flag by its symbolic name.
    ///
    /// # Errors
    ///
    /// [`ImmError::UnknownFlag`] when `symbol` is not in the table.
    pub fn from_symbol(symbol: &str) -> ImmResult<Self> {
        FLAG_TABLE
            .iter()
            .find(|(_, name, _)| *name == symbol)
            .map(|(flag, _, _)| *flag)
            .ok_or_else(|| ImmError::UnknownFlag {
                symbol: symbol.to_string(),
            })
    }
}

impl fmt::Display for AttrFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for AttrFlag {
    type Err = ImmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s)
    }
}

/// A set of attribute flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrFlags(BTreeSet<AttrFlag>);

impl AttrFlags {
    /// Create an empty flag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate a native mask; bits outside the table are ignored.
    #[must_use]
    pub fn from_mask(mask: FlagMask) -> Self {
        Self(
            AttrFlag::ALL
                .iter()
                .copied()
                .filter(|flag| mask & flag.bit() != 0)
                .collect(),
        )
    }

    /// Parse symbolic names.
    ///
    /// # Errors
    ///
    /// [`ImmError::UnknownFlag`] on the first unrecognised name.
    pub fn from_symbols<I, S>(symbols: I) -> ImmResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        symbols
            .into_iter()
            .map(|s| AttrFlag::from_symbol(s.as_ref()))
            .collect::<ImmResult<BTreeSet<_>>>()
            .map(Self)
    }

    /// Native mask for this set.
    #[must_use]
    pub fn to_mask(&self) -> FlagMask {
        self.0.iter().fold(0, |mask, flag| mask | flag.bit())
    }

    /// Symbolic names, in table order.
    #[must_use]
    pub fn symbols(&self) -> Vec<&'static str> {
        self.0.iter().map(|flag| flag.symbol()).collect()
    }

    /// Add a flag.
    pub fn insert(&mut self, flag: AttrFlag) {
        self.0.insert(flag);
    }

    /// Add a flag using builder pattern.
    #[must_use]
    pub fn with(mut self, flag: AttrFlag) -> Self {
        self.insert(flag);
        self
    }

    /// Remove a flag.
    pub fn remove(&mut self, flag: AttrFlag) -> bool {
        self.0.remove(&flag)
    }

    /// Check whether a flag is set.
    #[must_use]
    pub fn contains(&self, flag: AttrFlag) -> bool {
        self.0.contains(&flag)
    }

    /// Check whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the flags in table order.
    pub fn iter(&self) -> impl Iterator<Item = AttrFlag> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<AttrFlag> for AttrFlags {
    fn from_iter<I: IntoIterator<Item = AttrFlag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[AttrFlag; N]> for AttrFlags {
    fn from(flags: [AttrFlag; N]) -> Self {
        flags.into_iter().collect()
    }
}

/// Symbolic names of every known flag set in `mask`.
#[must_use]
pub fn to_symbols(mask: FlagMask) -> Vec<&'static str> {
    AttrFlags::from_mask(mask).symbols()
}

/// OR together the bits of the named flags.
///
/// # Errors
///
/// [`ImmError::UnknownFlag`] on the first unrecognised name.
pub fn to_mask<I, S>(symbols: I) -> ImmResult<FlagMask>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    AttrFlags::from_symbols(symbols).map(|flags| flags.to_mask())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_matches_declaration_order() {
        for (index, flag) in AttrFlag::ALL.iter().enumerate() {
            assert_eq!(FLAG_TABLE[index].0, *flag);
        }
    }

    #[test]
    fn test_native_bits() {
        assert_eq!(AttrFlag::MultiValue.bit(), 0x1);
        assert_eq!(AttrFlag::Rdn.bit(), 0x2);
        assert_eq!(AttrFlag::Config.bit(), 0x100);
        assert_eq!(AttrFlag::Persistent.bit(), 0x20000);
        assert_eq!(to_mask(["CONFIG", "RDN"]).unwrap(), 0x102);
    }

    #[test]
    fn test_every_subset_round_trips() {
        for subset in 0u32..(1 << AttrFlag::ALL.len()) {
            let symbols: Vec<&str> = AttrFlag::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| subset & (1 << i) != 0)
                .map(|(_, flag)| flag.symbol())
                .collect();

            let mask = to_mask(&symbols).unwrap();
            let back: HashSet<&str> = to_symbols(mask).into_iter().collect();
            let expected: HashSet<&str> = symbols.into_iter().collect();
            assert_eq!(back, expected, "subset {subset:#010b}");
        }
    }

    #[test]
    fn test_unknown_bits_ignored() {
        // SA_IMM_ATTR_NO_DUPLICATES and SA_IMM_ATTR_NOTIFY are not in the table.
        let flags = AttrFlags::from_mask(0x0100_0000 | 0x0200_0000 | 0x100);
        assert_eq!(flags.symbols(), vec!["CONFIG"]);
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        let err = to_mask(["CONFIG", "NOTIFY"]).unwrap_err();
        match err {
            ImmError::UnknownFlag { symbol } => assert_eq!(symbol, "NOTIFY"),
            other => panic!("expected UnknownFlag, got {other:?}"),
        }
        assert!("config".parse::<AttrFlag>().is_err());
    }

    #[test]
    fn test_serde_uses_symbols() {
        let flags = AttrFlags::from([AttrFlag::Config, AttrFlag::MultiValue]);
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, r#"["MULTI_VALUE","CONFIG"]"#);
        let back: AttrFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
