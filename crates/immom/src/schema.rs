//! Class schema types
//!
//! Class definitions as returned by the service (raw flag masks) and as seen
//! by clients (symbolic flag sets), plus the names of system attributes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ImmError, ImmResult};
use crate::flags::{AttrFlag, AttrFlags, FlagMask};
use crate::value::{ImmValue, ValueType};

/// Prefix of class and attribute names reserved for the service.
pub const SYSTEM_PREFIX: &str = "SaImm";

/// System attribute holding an object's class name.
pub const CLASS_NAME_ATTR: &str = "SaImmAttrClassName";

/// System attribute holding the name of an object's admin owner.
pub const ADMIN_OWNER_NAME_ATTR: &str = "SaImmAttrAdminOwnerName";

/// System attribute holding the name of an object's implementer.
pub const IMPLEMENTER_NAME_ATTR: &str = "SaImmAttrImplementerName";

/// Check whether a class or attribute name is in the reserved namespace.
#[must_use]
pub fn is_system_name(name: &str) -> bool {
    name.starts_with(SYSTEM_PREFIX)
}

/// Class category (`SaImmClassCategoryT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassCategory {
    Config,
    Runtime,
}

impl ClassCategory {
    /// Symbolic name, `"CONFIG"` or `"RUNTIME"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ClassCategory::Config => "CONFIG",
            ClassCategory::Runtime => "RUNTIME",
        }
    }
}

impl fmt::Display for ClassCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassCategory {
    type Err = ImmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIG" => Ok(ClassCategory::Config),
            "RUNTIME" => Ok(ClassCategory::Runtime),
            other => Err(ImmError::InvalidArgument {
                message: format!("unknown class category '{other}'"),
            }),
        }
    }
}

/// Attribute definition as exchanged with the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAttrDefinition {
    pub name: String,
    pub value_type: ValueType,
    pub flags: FlagMask,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ImmValue>,
}

/// Class description as exchanged with the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawClassDescription {
    pub category: ClassCategory,
    pub attributes: Vec<RawAttrDefinition>,
}

/// Attribute definition with symbolic flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub value_type: ValueType,

    #[serde(default)]
    pub flags: AttrFlags,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ImmValue>,
}

impl AttributeDefinition {
    /// Create an attribute definition without a default value.
    pub fn new(name: impl Into<String>, value_type: ValueType, flags: impl Into<AttrFlags>) -> Self {
        Self {
            name: name.into(),
            value_type,
            flags: flags.into(),
            default_value: None,
        }
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, value: ImmValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Check whether a flag is set.
    #[must_use]
    pub fn has_flag(&self, flag: AttrFlag) -> bool {
        self.flags.contains(flag)
    }

    /// Check whether this is the naming attribute.
    #[must_use]
    pub fn is_rdn(&self) -> bool {
        self.has_flag(AttrFlag::Rdn)
    }

    /// Translate from the service representation.
    #[must_use]
    pub fn from_raw(raw: RawAttrDefinition) -> Self {
        Self {
            name: raw.name,
            value_type: raw.value_type,
            flags: AttrFlags::from_mask(raw.flags),
            default_value: raw.default_value,
        }
    }

    /// Translate to the service representation.
    #[must_use]
    pub fn to_raw(&self) -> RawAttrDefinition {
        RawAttrDefinition {
            name: self.name.clone(),
            value_type: self.value_type,
            flags: self.flags.to_mask(),
            default_value: self.default_value.clone(),
        }
    }
}

/// A class definition with symbolic attribute flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: String,
    pub category: ClassCategory,
    pub attributes: Vec<AttributeDefinition>,
}

impl ClassDefinition {
    /// Create a class definition.
    pub fn new(
        name: impl Into<String>,
        category: ClassCategory,
        attributes: Vec<AttributeDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            attributes,
        }
    }

    /// Translate a service class description.
    pub fn from_raw(name: impl Into<String>, raw: RawClassDescription) -> Self {
        Self {
            name: name.into(),
            category: raw.category,
            attributes: raw
                .attributes
                .into_iter()
                .map(AttributeDefinition::from_raw)
                .collect(),
        }
    }

    /// Find an attribute definition by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The attribute flagged RDN.
    ///
    /// # Errors
    ///
    /// [`ImmError::NoRdnAttribute`] when the schema has none.
    pub fn rdn_attribute(&self) -> ImmResult<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|a| a.is_rdn())
            .ok_or_else(|| ImmError::NoRdnAttribute {
                class_name: self.name.clone(),
            })
    }

    /// Check whether the class is a configuration class.
    #[must_use]
    pub fn is_config(&self) -> bool {
        self.category == ClassCategory::Config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common_class() -> ClassDefinition {
        ClassDefinition::from_raw(
            "Common",
            RawClassDescription {
                category: ClassCategory::Config,
                attributes: vec![
                    RawAttrDefinition {
                        name: "userLabel".to_string(),
                        value_type: ValueType::String,
                        flags: 0x300,
                        default_value: None,
                    },
                    RawAttrDefinition {
                        name: "CommonId".to_string(),
                        value_type: ValueType::Name,
                        flags: 0x502,
                        default_value: None,
                    },
                ],
            },
        )
    }

    #[test]
    fn test_from_raw_translates_flags() {
        let class = common_class();
        let label = class.attribute("userLabel").unwrap();
        assert_eq!(label.flags.symbols(), vec!["CONFIG", "WRITABLE"]);

        let rdn = class.rdn_attribute().unwrap();
        assert_eq!(rdn.name, "CommonId");
        assert_eq!(rdn.value_type, ValueType::Name);
        assert_eq!(rdn.flags.symbols(), vec!["RDN", "CONFIG", "INITIALIZED"]);
        assert_eq!(rdn.to_raw().flags, 0x502);
    }

    #[test]
    fn test_missing_rdn() {
        let class = ClassDefinition::new(
            "Broken",
            ClassCategory::Config,
            vec![AttributeDefinition::new(
                "x",
                ValueType::Int32,
                [AttrFlag::Config],
            )],
        );
        let err = class.rdn_attribute().unwrap_err();
        assert!(matches!(err, ImmError::NoRdnAttribute { ref class_name } if class_name == "Broken"));
    }

    #[test]
    fn test_system_names() {
        assert!(is_system_name(CLASS_NAME_ATTR));
        assert!(is_system_name("SaImmMngt"));
        assert!(!is_system_name("saImmLike"));
        assert!(!is_system_name("SaAmfApplication"));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("CONFIG".parse::<ClassCategory>().unwrap(), ClassCategory::Config);
        assert_eq!("RUNTIME".parse::<ClassCategory>().unwrap(), ClassCategory::Runtime);
        assert!("config".parse::<ClassCategory>().is_err());
    }
}
