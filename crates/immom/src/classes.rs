//! Class schema operations

use tracing::{debug, info, instrument};

use crate::error::{AisErrorKind, ImmError, ImmResult};
use crate::schema::{is_system_name, AttributeDefinition, ClassCategory, ClassDefinition};
use crate::session::Session;
use crate::value::{ImmValue, ValueType};

impl Session {
    /// Fetch a class definition with symbolic attribute flags.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_NOT_EXIST` for an unknown class.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn get_class(&self, class_name: &str) -> ImmResult<ClassDefinition> {
        let raw = self
            .service()
            .class_description_get(self.om(), class_name)
            .await?;
        Ok(ClassDefinition::from_raw(class_name, raw))
    }

    /// Name and type of the class's RDN attribute.
    ///
    /// # Errors
    ///
    /// As for [`Session::get_class`], or [`ImmError::NoRdnAttribute`].
    pub async fn find_rdn_attribute(&self, class_name: &str) -> ImmResult<(String, ValueType)> {
        let class = self.get_class(class_name).await?;
        let rdn = class.rdn_attribute()?;
        Ok((rdn.name.clone(), rdn.value_type))
    }

    /// Names of every registered class.
    ///
    /// Read from the class name list kept on the IMM service object.
    ///
    /// # Errors
    ///
    /// The service's status, or [`ImmError::MissingAttribute`] when the
    /// service object carries no class list.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn get_class_names(&self) -> ImmResult<Vec<String>> {
        let config = self.config();
        let object = self.get_object(&config.class_names_dn).await?;
        let attr = object
            .attribute(&config.class_names_attribute)
            .ok_or_else(|| ImmError::MissingAttribute {
                dn: object.dn.clone(),
                attribute: config.class_names_attribute.clone(),
            })?;

        let names: Vec<String> = attr
            .values
            .iter()
            .filter_map(ImmValue::as_str)
            .map(str::to_string)
            .collect();
        debug!(count = names.len(), "Class names read");
        Ok(names)
    }

    /// Register a class.
    ///
    /// `SaImm*` attributes are dropped; the service adds its own.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_INVALID_PARAM` for an empty name, otherwise the service's
    /// status (e.g. `SA_AIS_ERR_EXIST` for a duplicate).
    #[instrument(skip(self, attributes), fields(session = %self.id()))]
    pub async fn create_class(
        &self,
        class_name: &str,
        category: ClassCategory,
        attributes: Vec<AttributeDefinition>,
    ) -> ImmResult<()> {
        if class_name.is_empty() {
            return Err(ImmError::ais(AisErrorKind::InvalidParam, "class name is empty"));
        }
        self.check_name(class_name)?;

        let raw = attributes
            .iter()
            .filter(|a| !is_system_name(&a.name))
            .map(AttributeDefinition::to_raw)
            .collect();

        self.service()
            .class_create(self.om(), class_name, category, raw)
            .await?;
        info!(class = %class_name, category = %category, "Class created");
        Ok(())
    }

    /// Remove a class.
    ///
    /// # Errors
    ///
    /// The service's status; a class with instances cannot be deleted.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn delete_class(&self, class_name: &str) -> ImmResult<()> {
        self.service().class_delete(self.om(), class_name).await?;
        info!(class = %class_name, "Class deleted");
        Ok(())
    }
}
