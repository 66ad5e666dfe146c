//! Inspection helpers built on the read path

use std::collections::BTreeSet;

use crate::dn::ROOT;
use crate::error::ImmResult;
use crate::flags::AttrFlag;
use crate::schema::ClassCategory;
use crate::session::Session;

impl Session {
    /// Implementer name of a committed object, if one is attached.
    ///
    /// # Errors
    ///
    /// As for [`Session::get_object`].
    pub async fn implementer_of(&self, dn: &str) -> ImmResult<Option<String>> {
        let object = self.get_object(dn).await?;
        Ok(object.implementer().map(str::to_string))
    }

    /// Admin owner name of a committed object, if one holds it.
    ///
    /// # Errors
    ///
    /// As for [`Session::get_object`].
    pub async fn admin_owner_of(&self, dn: &str) -> ImmResult<Option<String>> {
        let object = self.get_object(dn).await?;
        Ok(object.admin_owner().map(str::to_string))
    }

    /// Distinct implementer names over the whole tree, in tree order.
    ///
    /// # Errors
    ///
    /// The service's status.
    pub async fn implementers(&self) -> ImmResult<Vec<String>> {
        let mut implementers: Vec<String> = Vec::new();
        for dn in self.get_subtree(ROOT).await? {
            if let Some(name) = self.implementer_of(&dn).await? {
                if !implementers.contains(&name) {
                    implementers.push(name);
                }
            }
        }
        Ok(implementers)
    }

    /// Names of every RUNTIME class.
    ///
    /// # Errors
    ///
    /// The service's status.
    pub async fn runtime_classes(&self) -> ImmResult<BTreeSet<String>> {
        self.classes_in(ClassCategory::Runtime).await
    }

    /// Names of every CONFIG class.
    ///
    /// # Errors
    ///
    /// The service's status.
    pub async fn config_classes(&self) -> ImmResult<BTreeSet<String>> {
        self.classes_in(ClassCategory::Config).await
    }

    /// Names of the CONFIG classes that also carry RUNTIME attributes.
    ///
    /// # Errors
    ///
    /// The service's status.
    pub async fn config_classes_with_runtime_attributes(&self) -> ImmResult<BTreeSet<String>> {
        let mut result = BTreeSet::new();
        for name in self.config_classes().await? {
            let class = self.get_class(&name).await?;
            if class.attributes.iter().any(|a| a.has_flag(AttrFlag::Runtime)) {
                result.insert(name);
            }
        }
        Ok(result)
    }

    async fn classes_in(&self, category: ClassCategory) -> ImmResult<BTreeSet<String>> {
        let mut result = BTreeSet::new();
        for name in self.get_class_names().await? {
            if self.get_class(&name).await?.category == category {
                result.insert(name);
            }
        }
        Ok(result)
    }
}
