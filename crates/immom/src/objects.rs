//! Object read path
//!
//! Reads only ever see committed state; operations queued in an open CCB are
//! invisible until it is applied.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, instrument};

use crate::dn::ROOT;
use crate::error::{ImmError, ImmResult};
use crate::schema::{ADMIN_OWNER_NAME_ATTR, CLASS_NAME_ATTR, IMPLEMENTER_NAME_ATTR};
use crate::session::Session;
use crate::value::{AttrValues, ImmValue};

type SubtreeFuture<'a> = Pin<Box<dyn Future<Output = ImmResult<Vec<String>>> + Send + 'a>>;

/// A committed object and all of its attributes, in service order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmObject {
    pub dn: String,
    pub attributes: Vec<AttrValues>,
}

impl ImmObject {
    /// Find an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttrValues> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Values of an attribute; empty when absent or unset.
    #[must_use]
    pub fn values(&self, name: &str) -> &[ImmValue] {
        self.attribute(name).map_or(&[], |a| a.values.as_slice())
    }

    /// First value of a name or string attribute.
    #[must_use]
    pub fn first_str(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .and_then(AttrValues::first)
            .and_then(ImmValue::as_str)
    }

    /// The object's class name.
    ///
    /// # Errors
    ///
    /// [`ImmError::MissingAttribute`] when the service did not report one.
    pub fn class_name(&self) -> ImmResult<&str> {
        self.first_str(CLASS_NAME_ATTR)
            .ok_or_else(|| ImmError::MissingAttribute {
                dn: self.dn.clone(),
                attribute: CLASS_NAME_ATTR.to_string(),
            })
    }

    /// Name of the admin owner holding the object, if any.
    #[must_use]
    pub fn admin_owner(&self) -> Option<&str> {
        self.first_str(ADMIN_OWNER_NAME_ATTR)
    }

    /// Name of the object's implementer, if any.
    #[must_use]
    pub fn implementer(&self) -> Option<&str> {
        self.first_str(IMPLEMENTER_NAME_ATTR)
    }

    /// Reshape into an attribute name to values map.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, Vec<ImmValue>> {
        self.attributes
            .into_iter()
            .map(|a| (a.name, a.values))
            .collect()
    }
}

impl Session {
    /// Read a committed object.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_NOT_EXIST` when the object is unknown or not yet committed.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn get_object(&self, dn: &str) -> ImmResult<ImmObject> {
        self.check_name(dn)?;
        let attributes = self.service().accessor_get(self.om(), dn).await?;
        debug!(count = attributes.len(), "Object read");
        Ok(ImmObject {
            dn: dn.to_string(),
            attributes,
        })
    }

    /// Read a committed object as an attribute name to values map.
    ///
    /// # Errors
    ///
    /// As for [`Session::get_object`].
    pub async fn get_attributes(&self, dn: &str) -> ImmResult<HashMap<String, Vec<ImmValue>>> {
        Ok(self.get_object(dn).await?.into_map())
    }

    /// Class name of a committed object.
    ///
    /// # Errors
    ///
    /// As for [`Session::get_object`].
    pub async fn class_of(&self, dn: &str) -> ImmResult<String> {
        let object = self.get_object(dn).await?;
        object.class_name().map(str::to_string)
    }

    /// Names of the objects directly below `dn` (the root when empty).
    ///
    /// # Errors
    ///
    /// The service's status, e.g. `SA_AIS_ERR_NOT_EXIST` for an unknown `dn`.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn get_child_objects(&self, dn: &str) -> ImmResult<Vec<String>> {
        if dn != ROOT {
            self.check_name(dn)?;
        }
        let found = self.service().search_sublevel(self.om(), dn).await?;
        Ok(found.into_iter().filter(|name| name != dn).collect())
    }

    /// Names of every object below `dn`.
    ///
    /// The children of `dn` come first, in service order, followed by the
    /// subtree of each child in turn. Parents always precede descendants.
    ///
    /// # Errors
    ///
    /// As for [`Session::get_child_objects`].
    pub fn get_subtree<'a>(&'a self, dn: &'a str) -> SubtreeFuture<'a> {
        Box::pin(async move {
            let children = self.get_child_objects(dn).await?;
            let mut result = children.clone();
            for child in &children {
                result.extend(self.get_subtree(child).await?);
            }
            Ok(result)
        })
    }

    /// Names of the instances of `class_name` at or below `dn`, unordered.
    ///
    /// # Errors
    ///
    /// The service's status.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn get_instance_of(&self, dn: &str, class_name: &str) -> ImmResult<Vec<String>> {
        if dn != ROOT {
            self.check_name(dn)?;
        }
        self.service()
            .search_instance_of(self.om(), dn, class_name)
            .await
    }
}
