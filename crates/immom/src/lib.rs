//! # IMM Object Management client
//!
//! A client layer over the Information Model Management (IMM) Object
//! Management API: class schema introspection, object reads, and object
//! mutation inside Configuration Change Bundles (CCBs) under an admin owner.
//!
//! ## Architecture
//!
//! Every call is forwarded to an [`ImmService`](service::ImmService), the
//! native call surface, injected as a trait object. A [`Session`] holds the
//! service handle plus at most one admin owner and one CCB, and layers the
//! mutation protocol on top:
//!
//! - take admin ownership of the objects touched
//! - queue create/modify/delete operations in the open CCB
//! - apply the CCB atomically, or finalize it to discard the operations
//!
//! ## Example
//!
//! ```ignore
//! use immom::prelude::*;
//!
//! let mut session = Session::open(service, SessionConfig::default()).await?;
//! session.admin_owner_initialize("TestAdmin").await?;
//! session.ccb_initialize(CcbFlags::BestEffort).await?;
//!
//! session
//!     .create_object("TestClassId=1", "TestClass", vec![AttrValues::string("userLabel", "x")])
//!     .await?;
//! session.ccb_apply().await?;
//! session.ccb_finalize().await?;
//!
//! let attrs = session.get_attributes("TestClassId=1").await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`dn`] - Distinguished name splitting and joining
//! - [`flags`] - Attribute flag bitmask translation
//! - [`value`] - Value types and attribute value lists
//! - [`schema`] - Class and attribute definitions
//! - [`error`] - Error types with AIS status kinds
//! - [`service`] - The service trait and its handle/parameter types
//! - [`config`] - Session configuration
//! - [`session`] - Admin owner and CCB protocol
//! - [`objects`] - Object reads
//! - [`dump`] - IMM XML export

pub mod classes;
pub mod config;
pub mod dn;
pub mod dump;
pub mod error;
pub mod flags;
pub mod inspect;
pub mod objects;
pub mod schema;
pub mod service;
pub mod session;
pub mod value;

pub use session::Session;

/// Prelude module for convenient imports.
///
/// ```
/// use immom::prelude::*;
/// ```
pub mod prelude {
    // Session
    pub use crate::config::SessionConfig;
    pub use crate::session::{CcbState, Session, SessionId};

    // Error handling
    pub use crate::error::{AisErrorKind, ImmError, ImmResult};

    // Names
    pub use crate::dn::{join_dn, split_dn};

    // Schema
    pub use crate::flags::{AttrFlag, AttrFlags, FlagMask};
    pub use crate::schema::{AttributeDefinition, ClassCategory, ClassDefinition};

    // Values and objects
    pub use crate::objects::ImmObject;
    pub use crate::value::{AttrValues, ImmValue, ValueType};

    // Service boundary
    pub use crate::service::{
        AttrModType, AttrModification, CcbFlags, ImmService, ImmVersion, Scope,
    };

    // Export
    pub use crate::dump::DumpOptions;
}

// Re-export async_trait for service implementors
pub use async_trait::async_trait;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _id = SessionId::new();
        let _config = SessionConfig::default();
        let _flags = AttrFlags::from([AttrFlag::Config, AttrFlag::Rdn]);
        let _attr = AttrValues::string("userLabel", "x");
        let _scope = Scope::Subtree;
        assert_eq!(split_dn("a=1,b=2").unwrap(), ("a=1", "b=2"));
        assert_eq!(join_dn("a=1", "b=2"), "a=1,b=2");
    }
}
