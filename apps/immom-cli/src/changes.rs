//! Change files
//!
//! A change file lists object operations run as one CCB:
//!
//! ```yaml
//! ccb_flags: best_effort
//! changes:
//!   - create:
//!       dn: TestClassId=1
//!       class: TestClass
//!       attributes:
//!         userLabel: [top]
//!   - modify:
//!       dn: TestClassId=1
//!       attributes:
//!         userLabel: []
//!   - delete:
//!       dn: TestClassId=2
//!   - delete_subtree:
//!       dn: TestClassId=3
//! ```
//!
//! Attribute values are written as text and parsed by the attribute's type
//! in the target class. An empty list clears the attribute on modify.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use immom::service::CcbFlags;
use immom::value::{AttrValues, ImmValue};
use immom::Session;

use crate::error::{CliError, CliResult};

/// Attribute name to values in text form.
pub type TextAttributes = BTreeMap<String, Vec<String>>;

/// One object operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Create {
        dn: String,
        #[serde(rename = "class")]
        class_name: String,
        #[serde(default)]
        attributes: TextAttributes,
    },
    Modify {
        dn: String,
        attributes: TextAttributes,
    },
    Delete {
        dn: String,
    },
    DeleteSubtree {
        dn: String,
    },
}

impl Change {
    /// The object the change targets.
    pub fn dn(&self) -> &str {
        match self {
            Change::Create { dn, .. }
            | Change::Modify { dn, .. }
            | Change::Delete { dn }
            | Change::DeleteSubtree { dn } => dn,
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Change::Create { .. } => "create",
            Change::Modify { .. } => "modify",
            Change::Delete { .. } => "delete",
            Change::DeleteSubtree { .. } => "delete subtree",
        }
    }
}

/// A parsed change file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeFile {
    #[serde(default)]
    pub ccb_flags: Option<CcbFlags>,

    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub changes: Vec<Change>,
}

impl ChangeFile {
    /// Parse a YAML change file.
    pub fn from_yaml(text: &str) -> CliResult<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| CliError::Validation(format!("invalid change file: {e}")))
    }

    /// Read a YAML change file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::Io(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&text)
    }
}

/// Typed attribute values for an instance of `class_name`.
async fn typed_attributes(
    session: &Session,
    class_name: &str,
    attributes: &TextAttributes,
) -> CliResult<Vec<AttrValues>> {
    let class = session.get_class(class_name).await?;
    let mut typed = Vec::with_capacity(attributes.len());
    for (name, texts) in attributes {
        let def = class.attribute(name).ok_or_else(|| {
            CliError::Validation(format!("class '{class_name}' has no attribute '{name}'"))
        })?;
        let values = texts
            .iter()
            .map(|text| ImmValue::parse(def.value_type, text, name))
            .collect::<Result<Vec<_>, _>>()?;
        typed.push(AttrValues::new(name.clone(), def.value_type, values));
    }
    Ok(typed)
}

/// Queue one change in the session's open CCB.
pub async fn queue(session: &Session, change: &Change) -> CliResult<()> {
    debug!(dn = %change.dn(), change = change.verb(), "Queueing change");
    match change {
        Change::Create {
            dn,
            class_name,
            attributes,
        } => {
            let attributes = typed_attributes(session, class_name, attributes).await?;
            session.create_object(dn, class_name, attributes).await?;
        }
        Change::Modify { dn, attributes } => {
            let class_name = session.class_of(dn).await?;
            let attributes = typed_attributes(session, &class_name, attributes).await?;
            session.modify_object(dn, attributes).await?;
        }
        Change::Delete { dn } => session.delete_objects(&[dn.clone()]).await?,
        Change::DeleteSubtree { dn } => session.delete_subtree(dn).await?,
    }
    Ok(())
}

/// Finalize the CCB after `error`, keeping `error` as the result.
async fn discard(session: &mut Session, error: CliError) -> CliError {
    if let Err(finalize_error) = session.ccb_finalize().await {
        warn!(error = %finalize_error, "CCB finalize failed after rejected change");
    }
    error
}

/// Run every change as one CCB under the session's admin owner.
///
/// With `commit` false the changes are validated and discarded.
pub async fn run(session: &mut Session, file: &ChangeFile, commit: bool) -> CliResult<()> {
    let flags = file.ccb_flags.unwrap_or(session.config().ccb_flags);
    session.ccb_initialize(flags).await?;

    for change in &file.changes {
        if let Err(e) = queue(session, change).await {
            return Err(discard(session, e).await);
        }
    }

    if commit {
        if let Err(e) = session.ccb_apply().await {
            return Err(discard(session, e.into()).await);
        }
        info!(changes = file.changes.len(), "Changes committed");
    }
    session.ccb_finalize().await?;
    Ok(())
}
