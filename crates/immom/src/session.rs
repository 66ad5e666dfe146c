//! Object Management session
//!
//! A [`Session`] owns one service handle, at most one admin owner and at most
//! one CCB. Mutations are only accepted while a CCB is open; they are queued
//! by the service and become visible when the CCB is applied.
//!
//! ```text
//! admin owner:  Uninitialized --initialize--> Active --finalize--> Uninitialized
//! ccb:          Closed --initialize--> Open --apply--> Applied
//!               Open | Applied --finalize--> Closed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::dn::{check_name_length, split_dn};
use crate::error::{AisErrorKind, ImmError, ImmResult};
use crate::schema::{is_system_name, CLASS_NAME_ATTR};
use crate::service::{
    AdminOperationParam, AdminOwnerHandle, AttrModification, CcbFlags, CcbHandle, ImmService,
    OmHandle, Scope,
};
use crate::value::{AttrValues, ImmValue, ValueType};

/// Identifier correlating the log output of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random SessionId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable CCB state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CcbState {
    /// No CCB.
    Closed,
    /// Accepting operations.
    Open,
    /// Committed; only finalize is accepted.
    Applied,
}

impl fmt::Display for CcbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CcbState::Closed => write!(f, "closed"),
            CcbState::Open => write!(f, "open"),
            CcbState::Applied => write!(f, "applied"),
        }
    }
}

#[derive(Debug)]
struct ActiveAdminOwner {
    handle: AdminOwnerHandle,
    name: String,
}

#[derive(Debug)]
struct ActiveCcb {
    handle: CcbHandle,
    flags: CcbFlags,
    applied: bool,
}

/// A client session against an IMM service.
pub struct Session {
    id: SessionId,
    service: Arc<dyn ImmService>,
    config: SessionConfig,
    om: OmHandle,
    admin_owner: Option<ActiveAdminOwner>,
    ccb: Option<ActiveCcb>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("om", &self.om)
            .field("admin_owner", &self.admin_owner)
            .field("ccb", &self.ccb)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session against `service`.
    ///
    /// # Errors
    ///
    /// Invalid configuration, or the service's status when initialization
    /// fails (e.g. `SA_AIS_ERR_VERSION`).
    pub async fn open(service: Arc<dyn ImmService>, config: SessionConfig) -> ImmResult<Self> {
        config.validate()?;

        let id = SessionId::new();
        let om = service.initialize(config.version).await?;
        info!(session = %id, om = %om, version = %config.version, "IMM session opened");

        Ok(Self {
            id,
            service,
            config,
            om,
            admin_owner: None,
            ccb: None,
        })
    }

    /// Close the session, finalizing the admin owner (and any CCB) first.
    ///
    /// # Errors
    ///
    /// The service's status if a finalize call fails.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn close(mut self) -> ImmResult<()> {
        if self.admin_owner.is_some() {
            self.admin_owner_finalize().await?;
        }
        self.service.finalize(self.om).await?;
        info!("IMM session closed");
        Ok(())
    }

    /// Session identifier used in log output.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Name of the active admin owner, if any.
    #[must_use]
    pub fn admin_owner_name(&self) -> Option<&str> {
        self.admin_owner.as_ref().map(|o| o.name.as_str())
    }

    /// Current CCB state.
    #[must_use]
    pub fn ccb_state(&self) -> CcbState {
        match &self.ccb {
            None => CcbState::Closed,
            Some(ccb) if ccb.applied => CcbState::Applied,
            Some(_) => CcbState::Open,
        }
    }

    /// Flags of the current CCB, if any.
    #[must_use]
    pub fn ccb_flags(&self) -> Option<CcbFlags> {
        self.ccb.as_ref().map(|c| c.flags)
    }

    pub(crate) fn service(&self) -> &dyn ImmService {
        self.service.as_ref()
    }

    pub(crate) fn om(&self) -> OmHandle {
        self.om
    }

    pub(crate) fn check_name(&self, name: &str) -> ImmResult<()> {
        check_name_length(name, self.config.max_name_length)
    }

    fn check_names(&self, dns: &[String]) -> ImmResult<()> {
        if dns.is_empty() {
            return Err(ImmError::ais(
                AisErrorKind::InvalidParam,
                "object name list is empty",
            ));
        }
        dns.iter().try_for_each(|dn| self.check_name(dn))
    }

    fn active_owner(&self) -> ImmResult<AdminOwnerHandle> {
        self.admin_owner
            .as_ref()
            .map(|o| o.handle)
            .ok_or_else(|| ImmError::ais(AisErrorKind::Init, "no admin owner initialized"))
    }

    fn open_ccb(&self) -> ImmResult<CcbHandle> {
        match &self.ccb {
            Some(ccb) if !ccb.applied => Ok(ccb.handle),
            Some(_) => Err(ImmError::ais(
                AisErrorKind::BadOperation,
                "CCB already applied",
            )),
            None => Err(ImmError::ais(AisErrorKind::BadOperation, "no CCB open")),
        }
    }

    // Admin owner

    /// Create the session's admin owner.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_EXIST` if an admin owner is already active or the name is
    /// held elsewhere, `SA_AIS_ERR_INVALID_PARAM` for an empty name,
    /// `SA_AIS_ERR_NAME_TOO_LONG` above the configured limit.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn admin_owner_initialize(&mut self, name: &str) -> ImmResult<()> {
        if let Some(owner) = &self.admin_owner {
            return Err(ImmError::ais(
                AisErrorKind::Exist,
                format!("admin owner '{}' already active", owner.name),
            ));
        }
        if name.is_empty() {
            return Err(ImmError::ais(
                AisErrorKind::InvalidParam,
                "admin owner name is empty",
            ));
        }
        self.check_name(name)?;

        let handle = self
            .service
            .admin_owner_initialize(self.om, name, self.config.release_ownership_on_finalize)
            .await?;

        info!(admin_owner = %name, "Admin owner initialized");
        self.admin_owner = Some(ActiveAdminOwner {
            handle,
            name: name.to_string(),
        });
        Ok(())
    }

    /// Finalize the admin owner, aborting an open CCB first.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_NOT_EXIST` if no admin owner is active.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn admin_owner_finalize(&mut self) -> ImmResult<()> {
        let Some(owner) = &self.admin_owner else {
            return Err(ImmError::ais(
                AisErrorKind::NotExist,
                "no admin owner to finalize",
            ));
        };
        let handle = owner.handle;

        if let Some(ccb) = &self.ccb {
            if !ccb.applied {
                warn!(ccb = %ccb.handle, "Aborting open CCB before admin owner finalize");
            }
            self.service.ccb_finalize(ccb.handle).await?;
            self.ccb = None;
        }

        self.service.admin_owner_finalize(handle).await?;
        if let Some(owner) = self.admin_owner.take() {
            info!(admin_owner = %owner.name, "Admin owner finalized");
        }
        Ok(())
    }

    /// Take admin ownership of objects.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_INIT` without an admin owner, `SA_AIS_ERR_INVALID_PARAM`
    /// for an empty list, or the service's status.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn admin_owner_set(&self, scope: Scope, dns: &[String]) -> ImmResult<()> {
        let owner = self.active_owner()?;
        self.check_names(dns)?;
        debug!("Setting admin owner");
        self.service.admin_owner_set(owner, scope, dns).await
    }

    /// Release admin ownership held by this session's admin owner.
    ///
    /// # Errors
    ///
    /// As for [`Session::admin_owner_set`].
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn admin_owner_release(&self, scope: Scope, dns: &[String]) -> ImmResult<()> {
        let owner = self.active_owner()?;
        self.check_names(dns)?;
        debug!("Releasing admin owner");
        self.service.admin_owner_release(owner, scope, dns).await
    }

    /// Clear admin ownership of objects, whoever holds it.
    ///
    /// Does not require an admin owner.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_INVALID_PARAM` for an empty list, or the service's status.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn admin_owner_clear(&self, scope: Scope, dns: &[String]) -> ImmResult<()> {
        self.check_names(dns)?;
        debug!("Clearing admin owner");
        self.service.admin_owner_clear(self.om, scope, dns).await
    }

    // CCB

    /// Open a CCB under the active admin owner.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_INIT` without an admin owner, `SA_AIS_ERR_EXIST` if a CCB
    /// is already open or applied.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn ccb_initialize(&mut self, flags: CcbFlags) -> ImmResult<()> {
        let owner = self.active_owner()?;
        if let Some(ccb) = &self.ccb {
            return Err(ImmError::ais(
                AisErrorKind::Exist,
                format!("CCB {} not finalized", ccb.handle),
            ));
        }

        let handle = self.service.ccb_initialize(owner, flags).await?;
        info!(ccb = %handle, "CCB opened");
        self.ccb = Some(ActiveCcb {
            handle,
            flags,
            applied: false,
        });
        Ok(())
    }

    /// Open a CCB with the configured default flags.
    ///
    /// # Errors
    ///
    /// As for [`Session::ccb_initialize`].
    pub async fn ccb_initialize_default(&mut self) -> ImmResult<()> {
        self.ccb_initialize(self.config.ccb_flags).await
    }

    /// Commit every operation queued in the open CCB.
    ///
    /// On failure nothing is committed and the CCB stays open; the service
    /// rejects further operations on it, so finalize it.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_NOT_EXIST` without a CCB, `SA_AIS_ERR_BAD_OPERATION` if
    /// already applied, or the service's status.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn ccb_apply(&mut self) -> ImmResult<()> {
        let Some(ccb) = self.ccb.as_mut() else {
            return Err(ImmError::ais(AisErrorKind::NotExist, "no CCB to apply"));
        };
        if ccb.applied {
            return Err(ImmError::ais(
                AisErrorKind::BadOperation,
                "CCB already applied",
            ));
        }

        self.service.ccb_apply(ccb.handle).await?;
        ccb.applied = true;
        info!(ccb = %ccb.handle, "CCB applied");
        Ok(())
    }

    /// Close the CCB. Unapplied operations are discarded.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_NOT_EXIST` without a CCB, or the service's status.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn ccb_finalize(&mut self) -> ImmResult<()> {
        let Some(ccb) = &self.ccb else {
            return Err(ImmError::ais(AisErrorKind::NotExist, "no CCB to finalize"));
        };

        self.service.ccb_finalize(ccb.handle).await?;
        if ccb.applied {
            info!(ccb = %ccb.handle, "CCB finalized");
        } else {
            warn!(ccb = %ccb.handle, "CCB finalized without apply, operations discarded");
        }
        self.ccb = None;
        Ok(())
    }

    // Mutations

    /// Queue creation of the object `dn`.
    ///
    /// The RDN attribute is synthesized from the first component of `dn` and
    /// must not be in `attributes`, nor may any `SaImm*` attribute. Admin
    /// ownership of the parent is taken before the create is queued.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_BAD_OPERATION` without an open CCB; local validation
    /// errors for a malformed DN, reserved attributes, mistyped values or a
    /// class without RDN attribute; otherwise the service's status.
    #[instrument(skip(self, attributes), fields(session = %self.id))]
    pub async fn create_object(
        &self,
        dn: &str,
        class_name: &str,
        attributes: Vec<AttrValues>,
    ) -> ImmResult<()> {
        let ccb = self.open_ccb()?;
        self.check_name(dn)?;
        let (rdn, parent) = split_dn(dn)?;

        let (rdn_name, rdn_type) = self.find_rdn_attribute(class_name).await?;

        let mut attributes = attributes;
        for attr in &attributes {
            if is_system_name(&attr.name) || attr.name == rdn_name {
                return Err(ImmError::ReservedAttribute {
                    attribute: attr.name.clone(),
                });
            }
            attr.check_types()?;
        }

        let rdn_value = match rdn_type {
            ValueType::String => ImmValue::String(rdn.to_string()),
            _ => ImmValue::Name(rdn.to_string()),
        };
        attributes.push(AttrValues::new(rdn_name, rdn_type, vec![rdn_value]));

        if !parent.is_empty() {
            let owner = self.active_owner()?;
            self.service
                .admin_owner_set(owner, Scope::One, &[parent.to_string()])
                .await?;
        }

        debug!(parent = %parent, "Queueing object create");
        self.service
            .ccb_object_create(ccb, class_name, parent, attributes)
            .await
    }

    /// Queue replacement of attribute values on `dn`.
    ///
    /// `SaImm*` attributes are dropped. An attribute with an empty value list
    /// is cleared.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_BAD_OPERATION` without an open CCB, type mismatches, or
    /// the service's status.
    #[instrument(skip(self, attributes), fields(session = %self.id))]
    pub async fn modify_object(&self, dn: &str, attributes: Vec<AttrValues>) -> ImmResult<()> {
        let ccb = self.open_ccb()?;
        self.check_name(dn)?;

        let mut modifications = Vec::with_capacity(attributes.len());
        for attr in attributes {
            if is_system_name(&attr.name) {
                debug!(attribute = %attr.name, "Ignoring system attribute");
                continue;
            }
            attr.check_types()?;
            modifications.push(AttrModification::replace(attr));
        }

        debug!(count = modifications.len(), "Queueing object modify");
        self.service.ccb_object_modify(ccb, dn, modifications).await
    }

    /// Queue explicit add/delete/replace modifications on `dn`.
    ///
    /// # Errors
    ///
    /// As for [`Session::modify_object`], and
    /// [`ImmError::ReservedAttribute`] for any `SaImm*` attribute.
    #[instrument(skip(self, modifications), fields(session = %self.id))]
    pub async fn modify_object_with(
        &self,
        dn: &str,
        modifications: Vec<AttrModification>,
    ) -> ImmResult<()> {
        let ccb = self.open_ccb()?;
        self.check_name(dn)?;

        for m in &modifications {
            if is_system_name(&m.attr.name) {
                return Err(ImmError::ReservedAttribute {
                    attribute: m.attr.name.clone(),
                });
            }
            m.attr.check_types()?;
        }

        self.service.ccb_object_modify(ccb, dn, modifications).await
    }

    /// Queue deletion of the given objects.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_BAD_OPERATION` without an open CCB, or the service's
    /// status (e.g. when ownership cannot be taken).
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn delete_objects(&self, dns: &[String]) -> ImmResult<()> {
        let ccb = self.open_ccb()?;
        let owner = self.active_owner()?;
        self.check_names(dns)?;

        self.service.admin_owner_set(owner, Scope::One, dns).await?;
        for dn in dns {
            debug!(dn = %dn, "Queueing object delete");
            self.service.ccb_object_delete(ccb, dn).await?;
        }
        Ok(())
    }

    /// Queue deletion of `dn` and everything below it.
    ///
    /// There is no confirmation step; once applied the subtree is gone.
    ///
    /// # Errors
    ///
    /// As for [`Session::delete_objects`].
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn delete_subtree(&self, dn: &str) -> ImmResult<()> {
        let ccb = self.open_ccb()?;
        let owner = self.active_owner()?;
        self.check_name(dn)?;

        let dns = [dn.to_string()];
        self.service
            .admin_owner_set(owner, Scope::Subtree, &dns)
            .await?;
        debug!("Queueing subtree delete");
        self.service.ccb_object_delete(ccb, dn).await
    }

    /// Queue creation of `dst_dn` as a copy of `src_dn`.
    ///
    /// System, RDN and empty attributes of the source are not copied.
    ///
    /// # Errors
    ///
    /// As for [`Session::get_object`] and [`Session::create_object`].
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn copy_object(&self, src_dn: &str, dst_dn: &str) -> ImmResult<()> {
        self.open_ccb()?;
        let source = self.get_object(src_dn).await?;
        let class_name = source.class_name()?.to_string();
        let (rdn_name, _) = self.find_rdn_attribute(&class_name).await?;

        let attributes = source
            .attributes
            .into_iter()
            .filter(|a| !is_system_name(&a.name) && a.name != rdn_name && !a.is_empty())
            .collect();

        self.create_object(dst_dn, &class_name, attributes).await
    }

    // Administrative operations

    /// Invoke an administrative operation on `dn` and wait for the result.
    ///
    /// Runs immediately, independent of any open CCB. Each parameter must
    /// carry exactly one value.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_INIT` without an admin owner, `SA_AIS_ERR_INVALID_PARAM`
    /// for a parameter without exactly one value, the service's status, or
    /// the non-OK code returned by the implementer.
    #[instrument(skip(self, params), fields(session = %self.id))]
    pub async fn admin_operation_invoke(
        &self,
        dn: &str,
        operation_id: u64,
        params: Vec<AttrValues>,
    ) -> ImmResult<()> {
        let owner = self.active_owner()?;
        self.check_name(dn)?;

        let mut op_params = Vec::with_capacity(params.len());
        for attr in params {
            attr.check_types()?;
            let AttrValues { name, values, .. } = attr;
            let [value]: [ImmValue; 1] = values.try_into().map_err(|_| {
                ImmError::ais(
                    AisErrorKind::InvalidParam,
                    format!("parameter '{name}' must have exactly one value"),
                )
            })?;
            op_params.push(AdminOperationParam { name, value });
        }

        self.service
            .admin_owner_set(owner, Scope::One, &[dn.to_string()])
            .await?;

        debug!("Invoking administrative operation");
        let status = self
            .service
            .admin_operation_invoke(
                owner,
                dn,
                operation_id,
                op_params,
                self.config.admin_operation_timeout(),
            )
            .await?;

        status.map_err(|kind| {
            ImmError::ais(
                kind,
                format!("administrative operation {operation_id} on '{dn}'"),
            )
        })
    }

    /// Name of the class attribute every object carries.
    #[must_use]
    pub fn class_name_attribute() -> &'static str {
        CLASS_NAME_ATTR
    }
}
