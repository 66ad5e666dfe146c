//! IMM service boundary
//!
//! [`ImmService`] is the native Object Management call surface the client is
//! layered on. Implementations forward to a real IMM instance; tests inject
//! an in-memory one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AisErrorKind, ImmError, ImmResult};
use crate::schema::{ClassCategory, RawAttrDefinition, RawClassDescription};
use crate::value::{AttrValues, ImmValue};

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw handle value.
            #[must_use]
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw handle value.
            #[must_use]
            pub fn as_raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

handle_type!(
    /// Object Management session handle (`SaImmHandleT`).
    OmHandle
);
handle_type!(
    /// Admin owner handle (`SaImmAdminOwnerHandleT`).
    AdminOwnerHandle
);
handle_type!(
    /// CCB handle (`SaImmCcbHandleT`).
    CcbHandle
);

/// Interface version requested at session initialization (`SaVersionT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmVersion {
    pub release_code: char,
    pub major: u8,
    pub minor: u8,
}

impl Default for ImmVersion {
    fn default() -> Self {
        Self {
            release_code: 'A',
            major: 2,
            minor: 0,
        }
    }
}

impl fmt::Display for ImmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}.{:02}", self.release_code, self.major, self.minor)
    }
}

/// Scope of admin-ownership operations (`SaImmScopeT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// The named objects only.
    #[serde(rename = "SA_IMM_ONE")]
    One,
    /// The named objects and their direct children.
    #[serde(rename = "SA_IMM_SUBLEVEL")]
    Sublevel,
    /// The named objects and all their descendants.
    #[serde(rename = "SA_IMM_SUBTREE")]
    Subtree,
}

impl Scope {
    /// Symbolic name, e.g. `"SA_IMM_ONE"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::One => "SA_IMM_ONE",
            Scope::Sublevel => "SA_IMM_SUBLEVEL",
            Scope::Subtree => "SA_IMM_SUBTREE",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ImmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SA_IMM_ONE" => Ok(Scope::One),
            "SA_IMM_SUBLEVEL" => Ok(Scope::Sublevel),
            "SA_IMM_SUBTREE" => Ok(Scope::Subtree),
            other => Err(ImmError::InvalidArgument {
                message: format!("unknown scope '{other}'"),
            }),
        }
    }
}

/// CCB initialization flags (`SaImmCcbFlagsT`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CcbFlags {
    /// Proceed even when no object implementer is registered.
    #[default]
    BestEffort,
    /// Fail operations on objects without a registered implementer
    /// (`SA_IMM_CCB_REGISTERED_OI`).
    RegisteredOi,
}

impl CcbFlags {
    /// Native flag value.
    #[must_use]
    pub fn bits(self) -> u64 {
        match self {
            CcbFlags::BestEffort => 0,
            CcbFlags::RegisteredOi => 0x1,
        }
    }
}

/// Kind of attribute modification (`SaImmAttrModificationTypeT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrModType {
    /// Append values.
    Add,
    /// Remove matching values.
    Delete,
    /// Replace all values; an empty list clears the attribute.
    Replace,
}

/// A single attribute modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrModification {
    pub mod_type: AttrModType,
    pub attr: AttrValues,
}

impl AttrModification {
    /// Replace the attribute's values.
    #[must_use]
    pub fn replace(attr: AttrValues) -> Self {
        Self {
            mod_type: AttrModType::Replace,
            attr,
        }
    }

    /// Append values to the attribute.
    #[must_use]
    pub fn add(attr: AttrValues) -> Self {
        Self {
            mod_type: AttrModType::Add,
            attr,
        }
    }

    /// Remove values from the attribute.
    #[must_use]
    pub fn delete(attr: AttrValues) -> Self {
        Self {
            mod_type: AttrModType::Delete,
            attr,
        }
    }
}

/// A parameter of an administrative operation (`SaImmAdminOperationParamsT_2`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminOperationParam {
    pub name: String,
    pub value: ImmValue,
}

/// Return code reported by the implementer of an administrative operation.
pub type OperationStatus = Result<(), AisErrorKind>;

/// The native IMM Object Management call surface.
///
/// Every method is a blocking round trip to the service; failures carry the
/// service's status kind in [`ImmError::Ais`].
#[async_trait]
pub trait ImmService: Send + Sync {
    /// Open an Object Management session.
    async fn initialize(&self, version: ImmVersion) -> ImmResult<OmHandle>;

    /// Close an Object Management session and every handle derived from it.
    async fn finalize(&self, om: OmHandle) -> ImmResult<()>;

    /// Fetch a class description.
    async fn class_description_get(
        &self,
        om: OmHandle,
        class_name: &str,
    ) -> ImmResult<RawClassDescription>;

    /// Register a class.
    async fn class_create(
        &self,
        om: OmHandle,
        class_name: &str,
        category: ClassCategory,
        attributes: Vec<RawAttrDefinition>,
    ) -> ImmResult<()>;

    /// Remove a class; fails while instances exist.
    async fn class_delete(&self, om: OmHandle, class_name: &str) -> ImmResult<()>;

    /// Read every attribute of a committed object.
    async fn accessor_get(&self, om: OmHandle, dn: &str) -> ImmResult<Vec<AttrValues>>;

    /// Names of the objects one level below `root`, including `root` itself
    /// when it is not the tree root.
    async fn search_sublevel(&self, om: OmHandle, root: &str) -> ImmResult<Vec<String>>;

    /// Names of the instances of `class_name` in the subtree at `root`.
    async fn search_instance_of(
        &self,
        om: OmHandle,
        root: &str,
        class_name: &str,
    ) -> ImmResult<Vec<String>>;

    /// Create an admin owner.
    async fn admin_owner_initialize(
        &self,
        om: OmHandle,
        name: &str,
        release_ownership_on_finalize: bool,
    ) -> ImmResult<AdminOwnerHandle>;

    /// Take admin ownership of objects.
    async fn admin_owner_set(
        &self,
        owner: AdminOwnerHandle,
        scope: Scope,
        dns: &[String],
    ) -> ImmResult<()>;

    /// Give up admin ownership held by this owner.
    async fn admin_owner_release(
        &self,
        owner: AdminOwnerHandle,
        scope: Scope,
        dns: &[String],
    ) -> ImmResult<()>;

    /// Clear admin ownership regardless of holder.
    async fn admin_owner_clear(&self, om: OmHandle, scope: Scope, dns: &[String])
        -> ImmResult<()>;

    /// Destroy an admin owner, aborting its CCBs.
    async fn admin_owner_finalize(&self, owner: AdminOwnerHandle) -> ImmResult<()>;

    /// Open a CCB under an admin owner.
    async fn ccb_initialize(&self, owner: AdminOwnerHandle, flags: CcbFlags)
        -> ImmResult<CcbHandle>;

    /// Queue an object creation below `parent`.
    async fn ccb_object_create(
        &self,
        ccb: CcbHandle,
        class_name: &str,
        parent: &str,
        attributes: Vec<AttrValues>,
    ) -> ImmResult<()>;

    /// Queue attribute modifications.
    async fn ccb_object_modify(
        &self,
        ccb: CcbHandle,
        dn: &str,
        modifications: Vec<AttrModification>,
    ) -> ImmResult<()>;

    /// Queue deletion of an object and its subtree.
    async fn ccb_object_delete(&self, ccb: CcbHandle, dn: &str) -> ImmResult<()>;

    /// Commit every queued operation atomically.
    async fn ccb_apply(&self, ccb: CcbHandle) -> ImmResult<()>;

    /// Close a CCB, discarding unapplied operations.
    async fn ccb_finalize(&self, ccb: CcbHandle) -> ImmResult<()>;

    /// Run an administrative operation and wait for the implementer's answer.
    async fn admin_operation_invoke(
        &self,
        owner: AdminOwnerHandle,
        dn: &str,
        operation_id: u64,
        params: Vec<AdminOperationParam>,
        timeout: Duration,
    ) -> ImmResult<OperationStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_names() {
        for scope in [Scope::One, Scope::Sublevel, Scope::Subtree] {
            assert_eq!(scope.as_str().parse::<Scope>().unwrap(), scope);
        }
        let err = "SA_IMM_ALL".parse::<Scope>().unwrap_err();
        assert!(err.is_local_validation());
    }

    #[test]
    fn test_version_display() {
        assert_eq!(ImmVersion::default().to_string(), "A.02.00");
    }

    #[test]
    fn test_ccb_flag_bits() {
        assert_eq!(CcbFlags::default(), CcbFlags::BestEffort);
        assert_eq!(CcbFlags::BestEffort.bits(), 0);
        assert_eq!(CcbFlags::RegisteredOi.bits(), 1);
    }

    #[test]
    fn test_handles() {
        let handle = CcbHandle::from_raw(0x2a);
        assert_eq!(handle.as_raw(), 42);
        assert_eq!(handle.to_string(), "0x2a");
    }
}
