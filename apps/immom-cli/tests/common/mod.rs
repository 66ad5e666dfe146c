//! Common test utilities for CLI integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use immom::async_trait;
use immom::error::{AisErrorKind, ImmError, ImmResult};
use immom::schema::{ClassCategory, RawAttrDefinition, RawClassDescription};
use immom::service::{
    AdminOperationParam, AdminOwnerHandle, AttrModification, CcbFlags, CcbHandle, ImmService,
    ImmVersion, OmHandle, OperationStatus, Scope,
};
use immom::value::AttrValues;
use immom_cli::config::GlobalArgs;
use immom_memory::InMemoryImm;
use tempfile::TempDir;

/// Two CONFIG objects owned by nobody and one owned by `Operator`.
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
      - name: level
        type: SA_UINT32_T
        flags: [CONFIG, WRITABLE]
objects:
  - dn: TestClassId=1
    class: TestClass
    attributes:
      - name: userLabel
        type: SA_STRING_T
        values:
          - string: top
  - dn: TestClassId=2,TestClassId=1
    class: TestClass
  - dn: TestClassId=3
    class: TestClass
    admin_owner: Operator
"#;

/// A temporary directory holding a model snapshot.
pub struct TestContext {
    pub dir: TempDir,
    pub snapshot: PathBuf,
}

impl TestContext {
    /// Write [`MODEL_YAML`] to `model.yaml` in a fresh directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("model.yaml");
        std::fs::write(&snapshot, MODEL_YAML).unwrap();
        Self { dir, snapshot }
    }

    /// Global options pointing at the snapshot.
    pub fn global(&self) -> GlobalArgs {
        GlobalArgs {
            snapshot: Some(self.snapshot.clone()),
            ..GlobalArgs::default()
        }
    }

    /// Write a change file and return its path.
    pub fn write_changes(&self, name: &str, yaml: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, yaml).unwrap();
        path
    }

    /// Current snapshot file content.
    pub fn snapshot_text(&self) -> String {
        std::fs::read_to_string(&self.snapshot).unwrap()
    }
}

/// Service that forwards to an [`InMemoryImm`] but rejects every CCB
/// finalize with `SA_AIS_ERR_TRY_AGAIN`.
pub struct StuckFinalize {
    pub inner: Arc<InMemoryImm>,
}

#[async_trait]
impl ImmService for StuckFinalize {
    async fn initialize(&self, version: ImmVersion) -> ImmResult<OmHandle> {
        self.inner.initialize(version).await
    }

    async fn finalize(&self, om: OmHandle) -> ImmResult<()> {
        self.inner.finalize(om).await
    }

    async fn class_description_get(
        &self,
        om: OmHandle,
        class_name: &str,
    ) -> ImmResult<RawClassDescription> {
        self.inner.class_description_get(om, class_name).await
    }

    async fn class_create(
        &self,
        om: OmHandle,
        class_name: &str,
        category: ClassCategory,
        attributes: Vec<RawAttrDefinition>,
    ) -> ImmResult<()> {
        self.inner
            .class_create(om, class_name, category, attributes)
            .await
    }

    async fn class_delete(&self, om: OmHandle, class_name: &str) -> ImmResult<()> {
        self.inner.class_delete(om, class_name).await
    }

    async fn accessor_get(&self, om: OmHandle, dn: &str) -> ImmResult<Vec<AttrValues>> {
        self.inner.accessor_get(om, dn).await
    }

    async fn search_sublevel(&self, om: OmHandle, root: &str) -> ImmResult<Vec<String>> {
        self.inner.search_sublevel(om, root).await
    }

    async fn search_instance_of(
        &self,
        om: OmHandle,
        root: &str,
        class_name: &str,
    ) -> ImmResult<Vec<String>> {
        self.inner.search_instance_of(om, root, class_name).await
    }

    async fn admin_owner_initialize(
        &self,
        om: OmHandle,
        name: &str,
        release_ownership_on_finalize: bool,
    ) -> ImmResult<AdminOwnerHandle> {
        self.inner
            .admin_owner_initialize(om, name, release_ownership_on_finalize)
            .await
    }

    async fn admin_owner_set(
        &self,
        owner: AdminOwnerHandle,
        scope: Scope,
        dns: &[String],
    ) -> ImmResult<()> {
        self.inner.admin_owner_set(owner, scope, dns).await
    }

    async fn admin_owner_release(
        &self,
        owner: AdminOwnerHandle,
        scope: Scope,
        dns: &[String],
    ) -> ImmResult<()> {
        self.inner.admin_owner_release(owner, scope, dns).await
    }

    async fn admin_owner_clear(
        &self,
        om: OmHandle,
        scope: Scope,
        dns: &[String],
    ) -> ImmResult<()> {
        self.inner.admin_owner_clear(om, scope, dns).await
    }

    async fn admin_owner_finalize(&self, owner: AdminOwnerHandle) -> ImmResult<()> {
        self.inner.admin_owner_finalize(owner).await
    }

    async fn ccb_initialize(
        &self,
        owner: AdminOwnerHandle,
        flags: CcbFlags,
    ) -> ImmResult<CcbHandle> {
        self.inner.ccb_initialize(owner, flags).await
    }

    async fn ccb_object_create(
        &self,
        ccb: CcbHandle,
        class_name: &str,
        parent: &str,
        attributes: Vec<AttrValues>,
    ) -> ImmResult<()> {
        self.inner
            .ccb_object_create(ccb, class_name, parent, attributes)
            .await
    }

    async fn ccb_object_modify(
        &self,
        ccb: CcbHandle,
        dn: &str,
        modifications: Vec<AttrModification>,
    ) -> ImmResult<()> {
        self.inner.ccb_object_modify(ccb, dn, modifications).await
    }

    async fn ccb_object_delete(&self, ccb: CcbHandle, dn: &str) -> ImmResult<()> {
        self.inner.ccb_object_delete(ccb, dn).await
    }

    async fn ccb_apply(&self, ccb: CcbHandle) -> ImmResult<()> {
        self.inner.ccb_apply(ccb).await
    }

    async fn ccb_finalize(&self, ccb: CcbHandle) -> ImmResult<()> {
        Err(ImmError::ais(
            AisErrorKind::TryAgain,
            format!("CCB {ccb} finalize refused"),
        ))
    }

    async fn admin_operation_invoke(
        &self,
        owner: AdminOwnerHandle,
        dn: &str,
        operation_id: u64,
        params: Vec<AdminOperationParam>,
        timeout: Duration,
    ) -> ImmResult<OperationStatus> {
        self.inner
            .admin_operation_invoke(owner, dn, operation_id, params, timeout)
            .await
    }
}
