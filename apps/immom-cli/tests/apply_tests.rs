//! Integration tests for change files and the apply command
//!
//! Tests cover:
//! - Committing a change file and writing the snapshot back
//! - Dry-run and no-write modes leave the snapshot untouched
//! - Failed changes commit nothing
//! - Exit codes for service and validation errors

mod common;

use std::sync::Arc;

use common::{StuckFinalize, TestContext};
use immom::prelude::*;
use immom_cli::changes::{self, ChangeFile};
use immom_cli::commands::apply::{self, ApplyArgs};
use immom_cli::config::Model;
use immom_cli::error::CliError;
use immom_memory::{InMemoryImm, Snapshot};

const CHANGES: &str = r#"
ccb_flags: best_effort
changes:
  - create:
      dn: TestClassId=4,TestClassId=1
      class: TestClass
      attributes:
        userLabel: [new, child]
        level: ["7"]
  - modify:
      dn: TestClassId=1
      attributes:
        userLabel: []
        level: ["2"]
  - delete:
      dn: TestClassId=2,TestClassId=1
"#;

fn apply_args(file: std::path::PathBuf) -> ApplyArgs {
    ApplyArgs {
        file,
        write: false,
        dry_run: false,
    }
}

#[tokio::test]
async fn test_apply_and_write_snapshot() {
    let ctx = TestContext::new();
    let file = ctx.write_changes("changes.yaml", CHANGES);

    let mut args = apply_args(file);
    args.write = true;
    apply::execute(args, &ctx.global()).await.unwrap();

    let model = Model::open(&ctx.global()).await.unwrap();
    assert_eq!(
        model.session.get_child_objects("TestClassId=1").await.unwrap(),
        vec!["TestClassId=4,TestClassId=1"]
    );

    let child = model
        .session
        .get_object("TestClassId=4,TestClassId=1")
        .await
        .unwrap();
    assert_eq!(
        child.values("userLabel"),
        &[
            ImmValue::String("new".to_string()),
            ImmValue::String("child".to_string())
        ]
    );
    assert_eq!(child.values("level"), &[ImmValue::Uint32(7)]);
    assert_eq!(child.admin_owner(), None);

    let top = model.session.get_object("TestClassId=1").await.unwrap();
    assert!(top.values("userLabel").is_empty());
    assert_eq!(top.values("level"), &[ImmValue::Uint32(2)]);
    model.close().await.unwrap();
}

#[tokio::test]
async fn test_apply_without_write_keeps_snapshot() {
    let ctx = TestContext::new();
    let before = ctx.snapshot_text();
    let file = ctx.write_changes("changes.yaml", CHANGES);

    apply::execute(apply_args(file.clone()), &ctx.global())
        .await
        .unwrap();
    assert_eq!(ctx.snapshot_text(), before);

    let mut args = apply_args(file);
    args.dry_run = true;
    apply::execute(args, &ctx.global()).await.unwrap();
    assert_eq!(ctx.snapshot_text(), before);
}

#[tokio::test]
async fn test_dry_run_discards_changes() {
    let ctx = TestContext::new();
    let file = ChangeFile::from_yaml(CHANGES).unwrap();

    let mut model = Model::open(&ctx.global()).await.unwrap();
    model.session.admin_owner_initialize("Checker").await.unwrap();
    changes::run(&mut model.session, &file, false).await.unwrap();

    assert_eq!(model.session.ccb_state(), CcbState::Closed);
    assert_eq!(
        model.session.get_child_objects("TestClassId=1").await.unwrap(),
        vec!["TestClassId=2,TestClassId=1"]
    );
    assert_eq!(model.imm.open_ccb_count().await, 0);
}

#[tokio::test]
async fn test_owned_object_rejected() {
    let ctx = TestContext::new();
    let before = ctx.snapshot_text();
    let file = ctx.write_changes(
        "changes.yaml",
        r#"
changes:
  - create:
      dn: TestClassId=5
      class: TestClass
  - modify:
      dn: TestClassId=3
      attributes:
        level: ["1"]
"#,
    );

    let mut args = apply_args(file);
    args.write = true;
    let err = apply::execute(args, &ctx.global()).await.unwrap_err();
    match &err {
        CliError::Imm(e) => assert!(e.is(AisErrorKind::Exist)),
        other => panic!("expected service error, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);
    assert_eq!(ctx.snapshot_text(), before);
}

#[tokio::test]
async fn test_failed_change_commits_nothing() {
    let ctx = TestContext::new();
    let file = ChangeFile::from_yaml(
        r#"
changes:
  - create:
      dn: TestClassId=6
      class: TestClass
  - create:
      dn: TestClassId=7
      class: TestClass
      attributes:
        level: [high]
"#,
    )
    .unwrap();

    let mut model = Model::open(&ctx.global()).await.unwrap();
    model.session.admin_owner_initialize("Editor").await.unwrap();
    let err = changes::run(&mut model.session, &file, true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CliError::Imm(ImmError::TypeMismatch { .. })
    ));
    assert_eq!(err.exit_code(), 4);

    assert_eq!(model.session.ccb_state(), CcbState::Closed);
    let err = model.session.get_object("TestClassId=6").await.unwrap_err();
    assert!(err.is(AisErrorKind::NotExist));
}

#[tokio::test]
async fn test_unknown_attribute_rejected() {
    let ctx = TestContext::new();
    let file = ChangeFile::from_yaml(
        r#"
changes:
  - modify:
      dn: TestClassId=1
      attributes:
        colour: [blue]
"#,
    )
    .unwrap();

    let mut model = Model::open(&ctx.global()).await.unwrap();
    model.session.admin_owner_initialize("Editor").await.unwrap();
    let err = changes::run(&mut model.session, &file, true)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Validation(_)));
    assert_eq!(model.session.ccb_state(), CcbState::Closed);
}

#[tokio::test]
async fn test_written_snapshot_reloads() {
    let ctx = TestContext::new();
    let file = ctx.write_changes(
        "changes.yaml",
        "changes:\n  - delete_subtree:\n      dn: TestClassId=1\n",
    );

    let mut args = apply_args(file);
    args.write = true;
    apply::execute(args, &ctx.global()).await.unwrap();

    let snapshot = Snapshot::load(&ctx.snapshot).unwrap();
    let dns: Vec<&str> = snapshot.objects.iter().map(|o| o.dn.as_str()).collect();
    assert_eq!(dns, vec!["TestClassId=3"]);
    assert_eq!(snapshot.classes.len(), 1);
}

#[tokio::test]
async fn test_rejected_change_error_kept_when_finalize_fails() {
    let snapshot = Snapshot::from_yaml(common::MODEL_YAML).unwrap();
    let imm = Arc::new(InMemoryImm::from_snapshot(&snapshot).unwrap());
    let service = Arc::new(StuckFinalize { inner: imm });
    let mut session = Session::open(service, SessionConfig::default())
        .await
        .unwrap();
    session.admin_owner_initialize("Editor").await.unwrap();

    let file = ChangeFile::from_yaml(
        "changes:\n  - modify:\n      dn: TestClassId=1\n      attributes:\n        colour: [blue]\n",
    )
    .unwrap();
    let err = changes::run(&mut session, &file, true).await.unwrap_err();
    assert!(matches!(err, CliError::Validation(_)));

    // The CCB the service refused to finalize is still held
    assert_eq!(session.ccb_state(), CcbState::Open);
}
