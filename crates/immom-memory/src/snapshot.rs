//! Repository snapshots
//!
//! A snapshot holds class definitions, implementer registrations and objects
//! in creation order. System attributes are never stored; they are derived
//! again when the snapshot is loaded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use immom::error::{AisErrorKind, ImmError};
use immom::schema::{is_system_name, AttributeDefinition, ClassDefinition};
use immom::value::AttrValues;

use crate::error::{SnapshotError, SnapshotResult};
use crate::store::Store;

/// Serialization format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// Format for `path`: `.json`, or `.yaml`/`.yml`.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> SnapshotResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(SnapshotFormat::Json),
            Some("yaml" | "yml") => Ok(SnapshotFormat::Yaml),
            _ => Err(SnapshotError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// One object of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub dn: String,

    #[serde(rename = "class")]
    pub class_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_owner: Option<String>,

    #[serde(default)]
    pub attributes: Vec<AttrValues>,
}

/// Serializable repository content.
///
/// Typed values are written as single-key maps (`string: top`) in both
/// formats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,

    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub classes: Vec<ClassDefinition>,

    /// Class name to implementer name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub implementers: BTreeMap<String, String>,

    /// Parents must precede their children.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub objects: Vec<ObjectRecord>,
}

impl Snapshot {
    /// Parse a JSON snapshot.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Json`] on malformed input.
    pub fn from_json(text: &str) -> SnapshotResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a YAML snapshot.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Yaml`] on malformed input.
    pub fn from_yaml(text: &str) -> SnapshotResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Render as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Json`] if serialization fails.
    pub fn to_json(&self) -> SnapshotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render as YAML.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Yaml`] if serialization fails.
    pub fn to_yaml(&self) -> SnapshotResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Read a snapshot file, picking the format from its extension.
    ///
    /// # Errors
    ///
    /// File access, format or parse errors.
    pub fn load(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let path = path.as_ref();
        let format = SnapshotFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match format {
            SnapshotFormat::Json => Self::from_json(&text),
            SnapshotFormat::Yaml => Self::from_yaml(&text),
        }
    }

    /// Write a snapshot file, picking the format from its extension.
    ///
    /// # Errors
    ///
    /// File access, format or serialization errors.
    pub fn save(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let path = path.as_ref();
        let text = match SnapshotFormat::from_path(path)? {
            SnapshotFormat::Json => self.to_json()?,
            SnapshotFormat::Yaml => self.to_yaml()?,
        };
        std::fs::write(path, text).map_err(|source| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Build a repository from a snapshot.
pub(crate) fn restore(snapshot: &Snapshot) -> SnapshotResult<(Store, HashMap<String, String>)> {
    let mut store = Store::default();

    for class in &snapshot.classes {
        let raw = class
            .attributes
            .iter()
            .filter(|a| !is_system_name(&a.name))
            .map(AttributeDefinition::to_raw)
            .collect();
        store.create_class(&class.name, class.category, raw)?;
    }

    let mut implementers = HashMap::new();
    for (class_name, implementer) in &snapshot.implementers {
        if !store.has_class(class_name) {
            return Err(ImmError::ais(
                AisErrorKind::NotExist,
                format!("implementer '{implementer}' names unknown class '{class_name}'"),
            )
            .into());
        }
        implementers.insert(class_name.clone(), implementer.clone());
    }

    for record in &snapshot.objects {
        let attributes = record
            .attributes
            .iter()
            .filter(|a| !is_system_name(&a.name))
            .cloned()
            .collect();
        store.restore_object(
            &record.dn,
            &record.class_name,
            record.admin_owner.clone(),
            attributes,
        )?;
    }

    Ok((store, implementers))
}

/// Capture a repository as a snapshot.
pub(crate) fn capture(store: &Store, implementers: &HashMap<String, String>) -> Snapshot {
    let classes: Vec<ClassDefinition> = store
        .classes()
        .map(|class| {
            ClassDefinition::new(
                class.name.clone(),
                class.category,
                class
                    .attributes
                    .iter()
                    .filter(|a| !is_system_name(&a.name))
                    .cloned()
                    .collect(),
            )
        })
        .collect();

    let objects = store
        .all_objects()
        .into_iter()
        .map(|(dn, object)| {
            let attributes = classes
                .iter()
                .find(|c| c.name == object.class_name)
                .map(|class| {
                    class
                        .attributes
                        .iter()
                        .filter_map(|def| {
                            object.values.get(&def.name).map(|values| {
                                AttrValues::new(def.name.clone(), def.value_type, values.clone())
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            ObjectRecord {
                dn,
                class_name: object.class_name.clone(),
                admin_owner: object.admin_owner.clone(),
                attributes,
            }
        })
        .collect();

    Snapshot {
        exported_at: Some(Utc::now()),
        classes,
        implementers: implementers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        objects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const YAML: &str = r#"
classes:
  - name: TestClass
    category: CONFIG
    attributes:
      - name: TestClassId
        type: SA_NAME_T
        flags: [RDN, CONFIG]
      - name: userLabel
        type: SA_STRING_T
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
"#;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            SnapshotFormat::from_path(&PathBuf::from("a.json")).unwrap(),
            SnapshotFormat::Json
        );
        assert_eq!(
            SnapshotFormat::from_path(&PathBuf::from("a.yml")).unwrap(),
            SnapshotFormat::Yaml
        );
        assert!(matches!(
            SnapshotFormat::from_path(&PathBuf::from("a.xml")),
            Err(SnapshotError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_restore_and_capture() {
        let snapshot = Snapshot::from_yaml(YAML).unwrap();
        let (store, implementers) = restore(&snapshot).unwrap();
        assert!(implementers.is_empty());
        assert_eq!(
            store.sublevel("TestClassId=1").unwrap(),
            vec!["TestClassId=1", "TestClassId=2,TestClassId=1"]
        );

        let captured = capture(&store, &implementers);
        assert!(captured.exported_at.is_some());
        assert_eq!(captured.classes[0].attributes.len(), 2);
        assert_eq!(captured.objects.len(), 2);
        let top = &captured.objects[0];
        assert_eq!(top.dn, "TestClassId=1");
        assert!(top.attributes.iter().any(|a| a.name == "userLabel"));
        assert!(top.attributes.iter().all(|a| !is_system_name(&a.name)));
    }

    #[test]
    fn test_restore_rejects_orphan() {
        let mut snapshot = Snapshot::from_yaml(YAML).unwrap();
        snapshot.objects.remove(0);
        let err = restore(&snapshot).unwrap_err();
        match err {
            SnapshotError::Rejected(e) => assert!(e.is(AisErrorKind::NotExist)),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_restore_rejects_unknown_implementer_class() {
        let mut snapshot = Snapshot::from_yaml(YAML).unwrap();
        snapshot
            .implementers
            .insert("Missing".to_string(), "impl".to_string());
        assert!(matches!(
            restore(&snapshot),
            Err(SnapshotError::Rejected(_))
        ));
    }
}
