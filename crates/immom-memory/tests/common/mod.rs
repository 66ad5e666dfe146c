//! Integration test helpers for immom-memory.

#![allow(dead_code)]

use std::sync::Once;

static INIT: Once = Once::new();

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

/// A small model: a CONFIG class with a writable label, two objects, and a
/// RUNTIME class with a registered implementer.
pub const MODEL_YAML: &str = r#"
classes:
  - name: TestClass
    category: CONFIG
    attributes:
      - name: TestClassId
        type: SA_NAME_T
        flags: [RDN, CONFIG]
      - name: userLabel
        type: SA_STRING_T
        flags: [CONFIG, WRITABLE, MULTI_VALUE]
  - name: TestRuntime
    category: RUNTIME
    attributes:
      - name: TestRuntimeId
        type: SA_STRING_T
        flags: [RDN, RUNTIME, CACHED]
implementers:
  TestRuntime: RuntimeImpl
objects:
  - dn: TestClassId=1
    class: TestClass
    admin_owner: TestAdmin
    attributes:
      - name: userLabel
        type: SA_STRING_T
        values:
          - string: top
          - string: level
  - dn: TestClassId=2,TestClassId=1
    class: TestClass
"#;
