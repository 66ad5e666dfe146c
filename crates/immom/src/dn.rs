//! Distinguished name handling
//!
//! IMM names objects with comma-separated RDN components read parent-last,
//! e.g. `"TestClassId=20,TestClassId=2,TestClassId=1"`. A component may
//! contain a literal comma escaped with a backslash, which is how reference
//! RDNs such as `"ref=one=1\,two=2,top=1"` are written.

use crate::error::{AisErrorKind, ImmError, ImmResult};

/// Component separator.
pub const SEPARATOR: char = ',';

/// Escape marker; a segment ending with it continues into the next segment.
pub const ESCAPE: char = '\\';

/// The root of the object tree.
pub const ROOT: &str = "";

/// Split a DN into its RDN and parent DN.
///
/// Segments are absorbed into the RDN while they end with [`ESCAPE`]; the
/// first segment that does not terminates the RDN and everything after the
/// following separator is the parent. A DN without an unescaped separator
/// has an empty parent.
///
/// ```
/// use immom::dn::split_dn;
///
/// let (rdn, parent) = split_dn("ref=one=1\\,two=2\\,three=3,top=1").unwrap();
/// assert_eq!(rdn, "ref=one=1\\,two=2\\,three=3");
/// assert_eq!(parent, "top=1");
/// ```
///
/// # Errors
///
/// [`ImmError::InvalidFormat`] for the root (empty string), for an empty
/// component, for a trailing separator, and when every segment ends with an
/// escape marker.
pub fn split_dn(dn: &str) -> ImmResult<(&str, &str)> {
    let invalid = || ImmError::InvalidFormat { dn: dn.to_string() };

    let mut seg_start = 0;
    loop {
        let seg_end = dn[seg_start..].find(SEPARATOR).map(|i| seg_start + i);
        let segment = &dn[seg_start..seg_end.unwrap_or(dn.len())];

        if segment.is_empty() {
            return Err(invalid());
        }

        if !segment.ends_with(ESCAPE) {
            return match seg_end {
                None => Ok((dn, ROOT)),
                Some(end) if end + 1 == dn.len() => Err(invalid()),
                Some(end) => Ok((&dn[..end], &dn[end + 1..])),
            };
        }

        match seg_end {
            Some(end) => seg_start = end + 1,
            None => return Err(invalid()),
        }
    }
}

/// Join an RDN and a parent DN; an empty parent yields the RDN itself.
#[must_use]
pub fn join_dn(rdn: &str, parent: &str) -> String {
    if parent.is_empty() {
        rdn.to_string()
    } else {
        format!("{rdn}{SEPARATOR}{parent}")
    }
}

/// The parent DN of `dn` (empty for top-level objects).
///
/// # Errors
///
/// See [`split_dn`].
pub fn parent_dn(dn: &str) -> ImmResult<&str> {
    split_dn(dn).map(|(_, parent)| parent)
}

/// Check whether `dn` lies strictly below `ancestor`.
///
/// Every non-root DN is below the root. Malformed names are never below
/// anything.
#[must_use]
pub fn is_descendant(dn: &str, ancestor: &str) -> bool {
    if dn.is_empty() {
        return false;
    }
    if ancestor.is_empty() {
        return true;
    }

    let mut current = dn;
    while let Ok((_, parent)) = split_dn(current) {
        if parent == ancestor {
            return true;
        }
        if parent.is_empty() {
            break;
        }
        current = parent;
    }
    false
}

/// Number of RDN components in `dn` (0 for the root).
///
/// # Errors
///
/// See [`split_dn`].
pub fn depth(dn: &str) -> ImmResult<usize> {
    let mut depth = 0;
    let mut current = dn;
    while !current.is_empty() {
        current = parent_dn(current)?;
        depth += 1;
    }
    Ok(depth)
}

/// Reject names longer than the service accepts (`SA_MAX_NAME_LENGTH`).
///
/// # Errors
///
/// `SA_AIS_ERR_NAME_TOO_LONG` when `name` exceeds `max_len` bytes.
pub fn check_name_length(name: &str, max_len: usize) -> ImmResult<()> {
    if name.len() > max_len {
        return Err(ImmError::ais(
            AisErrorKind::NameTooLong,
            format!("'{name}' is {} bytes, limit is {max_len}", name.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        assert_eq!(split_dn("TestClassId=1").unwrap(), ("TestClassId=1", ""));
        assert_eq!(
            split_dn("TestClassId=2,TestClassId=1").unwrap(),
            ("TestClassId=2", "TestClassId=1")
        );
        assert_eq!(
            split_dn("TestClassId=20,TestClassId=2,TestClassId=1").unwrap(),
            ("TestClassId=20", "TestClassId=2,TestClassId=1")
        );
    }

    #[test]
    fn test_split_escaped_commas() {
        let (rdn, parent) = split_dn("ref=one=1\\,two=2\\,three=3,top=1").unwrap();
        assert_eq!(rdn, "ref=one=1\\,two=2\\,three=3");
        assert_eq!(parent, "top=1");

        let (rdn, parent) = split_dn("ref=a\\,b").unwrap();
        assert_eq!(rdn, "ref=a\\,b");
        assert_eq!(parent, "");

        // Only the RDN is scanned for escapes; the parent is kept verbatim.
        let (rdn, parent) = split_dn("x=1,ref=a\\,b,top=1").unwrap();
        assert_eq!(rdn, "x=1");
        assert_eq!(parent, "ref=a\\,b,top=1");
    }

    #[test]
    fn test_split_malformed() {
        for dn in ["", "a=1\\", "a=1\\,b=2\\", ",a=1", "a=1,", "a=1\\,,b=2", "\\"] {
            let err = split_dn(dn).unwrap_err();
            assert!(
                matches!(err, ImmError::InvalidFormat { .. }),
                "expected InvalidFormat for {dn:?}, got {err:?}"
            );
            assert!(err.is_local_validation());
        }
    }

    #[test]
    fn test_split_rejoin_round_trip() {
        let components = [
            "a=1",
            "ref=x\\,y",
            "safSu=SU1\\,safSg=SG\\,safApp=App",
            "name=with space",
            "k=\u{e5}\u{e4}\u{f6}",
        ];
        // Every ordered pair and triple of components.
        for a in components {
            for b in components {
                for c in components {
                    for dn in [a.to_string(), join_dn(a, b), join_dn(a, &join_dn(b, c))] {
                        let (rdn, parent) = split_dn(&dn).unwrap();
                        assert_eq!(join_dn(rdn, parent), dn);
                        assert_eq!(rdn, a);
                    }
                }
            }
        }
    }

    #[test]
    fn test_is_descendant() {
        let dn = "TestClassId=20,TestClassId=2,TestClassId=1";
        assert!(is_descendant(dn, "TestClassId=2,TestClassId=1"));
        assert!(is_descendant(dn, "TestClassId=1"));
        assert!(is_descendant(dn, ROOT));
        assert!(!is_descendant(dn, dn));
        assert!(!is_descendant("TestClassId=1", "TestClassId=1"));
        assert!(!is_descendant("TestClassId=10", "TestClassId=1"));
        // An escaped comma is not a hierarchy boundary.
        assert!(!is_descendant("ref=x\\,a=2", "a=2"));
        assert!(!is_descendant(ROOT, ROOT));
    }

    #[test]
    fn test_depth() {
        assert_eq!(depth(ROOT).unwrap(), 0);
        assert_eq!(depth("a=1").unwrap(), 1);
        assert_eq!(depth("ref=x\\,y,a=1").unwrap(), 2);
        assert!(depth("a=1\\").is_err());
    }

    #[test]
    fn test_name_length() {
        assert!(check_name_length("a=1", 256).is_ok());
        let long = "a".repeat(257);
        let err = check_name_length(&long, 256).unwrap_err();
        assert!(err.is(AisErrorKind::NameTooLong));
    }
}
