//! Integration test helpers for immom.
//!
//! Sessions run against an in-memory IMM service preloaded with the test
//! classes.
//!
//! # Usage
//!
//! ```ignore
//! use crate::common::TestContext;
//!
//! #[tokio::test]
//! async fn my_integration_test() {
//!     let ctx = TestContext::new().await;
//!     // ... test code using ctx.session ...
//! }
//! ```

#![allow(dead_code)]

use std::sync::{Arc, Once};

use immom::prelude::*;
use immom_memory::InMemoryImm;

static INIT: Once = Once::new();

pub const TEST_ADMIN: &str = "TestAdmin";
pub const TOP_OBJECT: &str = "TestClassId=1";

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub fn attr(name: &str, value_type: ValueType, flags: &[AttrFlag]) -> AttributeDefinition {
    AttributeDefinition::new(name, value_type, AttrFlags::from_iter(flags.iter().copied()))
}

/// `TestClass`: a CONFIG class with nothing but its RDN.
pub fn test_class() -> Vec<AttributeDefinition> {
    vec![attr(
        "TestClassId",
        ValueType::Name,
        &[AttrFlag::Config, AttrFlag::Rdn],
    )]
}

/// `TestClassMod`: one writable attribute of each value type.
pub fn test_class_mod() -> Vec<AttributeDefinition> {
    let writable = [AttrFlag::Config, AttrFlag::Writable];
    vec![
        attr("TestClassModId", ValueType::Name, &[AttrFlag::Config, AttrFlag::Rdn]),
        attr("saint32t", ValueType::Int32, &writable).with_default(ImmValue::Int32(-11)),
        attr("sauint32t", ValueType::Uint32, &writable).with_default(ImmValue::Uint32(22)),
        attr("saint64t", ValueType::Int64, &writable).with_default(ImmValue::Int64(-33)),
        attr("sauint64t", ValueType::Uint64, &writable).with_default(ImmValue::Uint64(44)),
        attr("satimet", ValueType::Time, &writable),
        attr("sanamet", ValueType::Name, &writable),
        attr("safloatt", ValueType::Float, &writable),
        attr("sadoublet", ValueType::Double, &writable),
        attr(
            "sastringt",
            ValueType::String,
            &[AttrFlag::Config, AttrFlag::Writable, AttrFlag::MultiValue],
        ),
        attr("saanyt", ValueType::Any, &writable),
    ]
}

/// A session with `TestClass` registered.
pub struct TestContext {
    pub imm: Arc<InMemoryImm>,
    pub session: Session,
}

impl TestContext {
    /// Session without admin owner.
    pub async fn new() -> Self {
        Self::with_config(SessionConfig::default()).await
    }

    pub async fn with_config(config: SessionConfig) -> Self {
        init_test_logging();
        let imm = Arc::new(InMemoryImm::new());
        let session = Session::open(imm.clone(), config)
            .await
            .expect("session should open");
        session
            .create_class("TestClass", ClassCategory::Config, test_class())
            .await
            .expect("TestClass should be created");
        Self { imm, session }
    }

    /// Session holding the `TestAdmin` admin owner.
    pub async fn with_admin_owner() -> Self {
        let mut ctx = Self::new().await;
        ctx.session
            .admin_owner_initialize(TEST_ADMIN)
            .await
            .expect("admin owner should initialize");
        ctx
    }

    /// Create objects of `class_name` in one CCB and commit them.
    pub async fn create_all(&mut self, class_name: &str, dns: &[String]) {
        self.session
            .ccb_initialize(CcbFlags::BestEffort)
            .await
            .expect("CCB should open");
        for dn in dns {
            self.session
                .create_object(dn, class_name, Vec::new())
                .await
                .unwrap_or_else(|e| panic!("create {dn}: {e}"));
        }
        self.session.ccb_apply().await.expect("CCB should apply");
        self.session.ccb_finalize().await.expect("CCB should finalize");
    }

    /// Apply one CCB that replaces attribute values on `dn`.
    pub async fn modify(&mut self, dn: &str, attributes: Vec<AttrValues>) {
        self.session
            .ccb_initialize(CcbFlags::BestEffort)
            .await
            .expect("CCB should open");
        self.session
            .modify_object(dn, attributes)
            .await
            .unwrap_or_else(|e| panic!("modify {dn}: {e}"));
        self.session.ccb_apply().await.expect("CCB should apply");
        self.session.ccb_finalize().await.expect("CCB should finalize");
    }
}

/// `TestClassId=<n>,<parent>` for each `n`.
pub fn children_of(parent: &str, ids: impl IntoIterator<Item = u32>) -> Vec<String> {
    ids.into_iter()
        .map(|n| join_dn(&format!("TestClassId={n}"), parent))
        .collect()
}

/// Non-empty, non-system attributes as `(name, values)`, sorted by name.
pub fn user_attributes(object: &ImmObject) -> Vec<(String, Vec<ImmValue>)> {
    let mut attrs: Vec<(String, Vec<ImmValue>)> = object
        .attributes
        .iter()
        .filter(|a| !a.is_empty() && !a.name.starts_with("SaImm"))
        .map(|a| (a.name.clone(), a.values.clone()))
        .collect();
    attrs.sort_by(|a, b| a.0.cmp(&b.0));
    attrs
}
