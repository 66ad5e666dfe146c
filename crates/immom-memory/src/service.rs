//! In-memory IMM service

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use immom::error::{AisErrorKind, ImmError, ImmResult};
use immom::schema::{ClassCategory, RawAttrDefinition, RawClassDescription, CLASS_NAME_ATTR};
use immom::service::{
    AdminOperationParam, AdminOwnerHandle, AttrModification, CcbFlags, CcbHandle, ImmService,
    ImmVersion, OmHandle, OperationStatus, Scope,
};
use immom::value::{AttrValues, ImmValue, ValueType};

use crate::error::SnapshotResult;
use crate::snapshot::{self, Snapshot};
use crate::store::{CcbOp, OpContext, Store};

/// DN of the object describing the service itself.
pub const SERVICE_OBJECT_DN: &str = "opensafImm=opensafImm,safApp=safImmService";

/// Attribute of [`SERVICE_OBJECT_DN`] listing every class name.
pub const CLASS_NAMES_ATTR: &str = "opensafImmClassNames";

/// Class reported for [`SERVICE_OBJECT_DN`].
pub const SERVICE_CLASS_NAME: &str = "OpensafImm";

/// Handles an administrative operation: `(dn, operation_id, params)`.
pub type AdminOperationHandler =
    Arc<dyn Fn(&str, u64, &[AdminOperationParam]) -> OperationStatus + Send + Sync>;

fn bad_handle(what: &str, raw: u64) -> ImmError {
    ImmError::ais(AisErrorKind::BadHandle, format!("unknown {what} handle {raw:#x}"))
}

#[derive(Debug)]
struct AdminOwnerEntry {
    om: OmHandle,
    name: String,
    release_on_finalize: bool,
}

#[derive(Debug)]
struct QueuedOp {
    op: CcbOp,
    target: String,
}

#[derive(Debug)]
struct CcbEntry {
    owner: AdminOwnerHandle,
    flags: CcbFlags,
    ops: Vec<QueuedOp>,
    aborted: bool,
}

#[derive(Default)]
struct State {
    store: Store,
    next_handle: u64,
    sessions: HashSet<OmHandle>,
    admin_owners: HashMap<AdminOwnerHandle, AdminOwnerEntry>,
    ccbs: HashMap<CcbHandle, CcbEntry>,
    implementers: HashMap<String, String>,
    handlers: HashMap<String, AdminOperationHandler>,
}

impl State {
    fn next_raw_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_om(&self, om: OmHandle) -> ImmResult<()> {
        if self.sessions.contains(&om) {
            Ok(())
        } else {
            Err(bad_handle("OM", om.as_raw()))
        }
    }

    fn owner(&self, owner: AdminOwnerHandle) -> ImmResult<&AdminOwnerEntry> {
        self.admin_owners
            .get(&owner)
            .ok_or_else(|| bad_handle("admin owner", owner.as_raw()))
    }

    fn ccb(&self, ccb: CcbHandle) -> ImmResult<&CcbEntry> {
        let entry = self
            .ccbs
            .get(&ccb)
            .ok_or_else(|| bad_handle("CCB", ccb.as_raw()))?;
        if entry.aborted {
            return Err(ImmError::ais(
                AisErrorKind::FailedOperation,
                format!("CCB {ccb} was aborted"),
            ));
        }
        Ok(entry)
    }

    /// Replay the CCB's operations, plus `extra`, on a copy of committed
    /// state. Returns the copy and the DN targeted by `extra`.
    fn replay(&self, ccb: &CcbEntry, extra: Option<&CcbOp>) -> ImmResult<(Store, Option<String>)> {
        let owner = self.owner(ccb.owner)?;
        let ctx = OpContext {
            owner: &owner.name,
            require_implementer: ccb.flags == CcbFlags::RegisteredOi,
            implementers: &self.implementers,
        };

        let mut working = self.store.clone();
        for queued in &ccb.ops {
            working.apply(&queued.op, &ctx)?;
        }
        let target = extra.map(|op| working.apply(op, &ctx)).transpose()?;
        Ok((working, target))
    }

    /// Validate `op` against the CCB and queue it. A rejected operation
    /// aborts the CCB.
    fn queue(&mut self, handle: CcbHandle, op: CcbOp) -> ImmResult<()> {
        let result = {
            let entry = self.ccb(handle)?;
            self.replay(entry, Some(&op))
        };

        match (result, self.ccbs.get_mut(&handle)) {
            (Ok((_, Some(target))), Some(entry)) => {
                debug!(ccb = %handle, target = %target, "Operation queued");
                entry.ops.push(QueuedOp { op, target });
                Ok(())
            }
            (Err(e), Some(entry)) => {
                warn!(ccb = %handle, error = %e, "Operation rejected, CCB aborted");
                entry.aborted = true;
                Err(e)
            }
            _ => Err(bad_handle("CCB", handle.as_raw())),
        }
    }

    /// Check whether `dn` is created by an open CCB of `owner`.
    fn pending_create(&self, owner: AdminOwnerHandle, dn: &str) -> bool {
        self.ccbs.values().any(|ccb| {
            ccb.owner == owner
                && !ccb.aborted
                && ccb
                    .ops
                    .iter()
                    .any(|q| matches!(q.op, CcbOp::Create { .. }) && q.target == dn)
        })
    }

    fn finalize_admin_owner(&mut self, handle: AdminOwnerHandle) -> ImmResult<()> {
        let entry = self
            .admin_owners
            .remove(&handle)
            .ok_or_else(|| bad_handle("admin owner", handle.as_raw()))?;

        let before = self.ccbs.len();
        self.ccbs.retain(|_, ccb| ccb.owner != handle);
        let aborted = before - self.ccbs.len();
        if aborted > 0 {
            warn!(admin_owner = %entry.name, aborted, "CCBs aborted by admin owner finalize");
        }

        if entry.release_on_finalize {
            let released = self.store.release_all(&entry.name);
            debug!(admin_owner = %entry.name, released, "Ownership released");
        }
        Ok(())
    }

    fn implementer_of(&self, dn: &str) -> Option<&str> {
        self.store
            .object(dn)
            .ok()
            .and_then(|o| self.implementers.get(&o.class_name))
            .map(String::as_str)
    }

    fn service_object(&self) -> Vec<AttrValues> {
        vec![
            AttrValues::new(
                "opensafImm",
                ValueType::String,
                vec![ImmValue::String("opensafImm=opensafImm".to_string())],
            ),
            AttrValues::string(CLASS_NAME_ATTR, SERVICE_CLASS_NAME),
            AttrValues::new(
                CLASS_NAMES_ATTR,
                ValueType::String,
                self.store
                    .class_names()
                    .into_iter()
                    .map(ImmValue::String)
                    .collect(),
            ),
        ]
    }
}

/// An IMM service kept entirely in memory.
///
/// Follows the service's rules for handles, admin ownership and CCBs
/// closely enough to exercise a client end to end. Object implementers are
/// simulated by [`register_implementer`](Self::register_implementer) and
/// [`register_admin_operation_handler`](Self::register_admin_operation_handler).
///
/// The service object ([`SERVICE_OBJECT_DN`]) is synthesized on read and
/// lists the registered classes; it does not appear in searches.
#[derive(Default)]
pub struct InMemoryImm {
    state: RwLock<State>,
}

impl fmt::Debug for InMemoryImm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryImm").finish_non_exhaustive()
    }
}

impl InMemoryImm {
    /// Create an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service holding the content of `snapshot`.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Rejected`](crate::SnapshotError::Rejected) when the
    /// content violates the repository rules.
    pub fn from_snapshot(snapshot: &Snapshot) -> SnapshotResult<Self> {
        let (store, implementers) = snapshot::restore(snapshot)?;
        info!(
            classes = snapshot.classes.len(),
            objects = snapshot.objects.len(),
            "Snapshot loaded"
        );
        Ok(Self {
            state: RwLock::new(State {
                store,
                implementers,
                ..State::default()
            }),
        })
    }

    /// Capture committed state.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.read().await;
        snapshot::capture(&state.store, &state.implementers)
    }

    /// Attach an implementer to classes.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_NOT_EXIST` for an unknown class, `SA_AIS_ERR_EXIST` if a
    /// different implementer already holds one.
    pub async fn register_implementer(
        &self,
        implementer: &str,
        class_names: &[&str],
    ) -> ImmResult<()> {
        let mut state = self.state.write().await;
        for class_name in class_names {
            state.store.class(class_name)?;
            if let Some(other) = state.implementers.get(*class_name) {
                if other != implementer {
                    return Err(ImmError::ais(
                        AisErrorKind::Exist,
                        format!("class '{class_name}' is implemented by '{other}'"),
                    ));
                }
            }
        }
        for class_name in class_names {
            state
                .implementers
                .insert((*class_name).to_string(), implementer.to_string());
        }
        info!(implementer = %implementer, classes = class_names.len(), "Implementer registered");
        Ok(())
    }

    /// Detach the implementer of a class, returning its name.
    pub async fn unregister_implementer(&self, class_name: &str) -> Option<String> {
        let mut state = self.state.write().await;
        state.handlers.remove(class_name);
        state.implementers.remove(class_name)
    }

    /// Install the handler for administrative operations on instances of
    /// `class_name`.
    pub async fn register_admin_operation_handler<F>(&self, class_name: &str, handler: F)
    where
        F: Fn(&str, u64, &[AdminOperationParam]) -> OperationStatus + Send + Sync + 'static,
    {
        let mut state = self.state.write().await;
        state
            .handlers
            .insert(class_name.to_string(), Arc::new(handler));
    }

    /// Create an object of a RUNTIME class, as its implementer would.
    ///
    /// # Errors
    ///
    /// `SA_AIS_ERR_NOT_EXIST` when the class has no implementer, otherwise
    /// the repository's validation errors.
    pub async fn create_runtime_object(
        &self,
        class_name: &str,
        parent: &str,
        attributes: Vec<AttrValues>,
    ) -> ImmResult<String> {
        let mut state = self.state.write().await;
        if !state.implementers.contains_key(class_name) {
            return Err(ImmError::ais(
                AisErrorKind::NotExist,
                format!("no implementer for class '{class_name}'"),
            ));
        }
        let dn = state
            .store
            .create_runtime_object(class_name, parent, attributes)?;
        debug!(dn = %dn, "Runtime object created");
        Ok(dn)
    }

    /// Replace RUNTIME attribute values of an object.
    ///
    /// # Errors
    ///
    /// The repository's validation errors.
    pub async fn update_runtime_attributes(
        &self,
        dn: &str,
        attributes: Vec<AttrValues>,
    ) -> ImmResult<()> {
        let mut state = self.state.write().await;
        state.store.update_runtime(dn, attributes)
    }

    /// Number of open CCBs.
    pub async fn open_ccb_count(&self) -> usize {
        self.state.read().await.ccbs.len()
    }
}

#[async_trait]
impl ImmService for InMemoryImm {
    #[instrument(skip(self))]
    async fn initialize(&self, version: ImmVersion) -> ImmResult<OmHandle> {
        if version.release_code != 'A' || version.major != 2 {
            return Err(ImmError::ais(
                AisErrorKind::Version,
                format!("version {version} not supported"),
            ));
        }
        let mut state = self.state.write().await;
        let om = OmHandle::from_raw(state.next_raw_handle());
        state.sessions.insert(om);
        Ok(om)
    }

    #[instrument(skip(self))]
    async fn finalize(&self, om: OmHandle) -> ImmResult<()> {
        let mut state = self.state.write().await;
        if !state.sessions.remove(&om) {
            return Err(bad_handle("OM", om.as_raw()));
        }
        let owners: Vec<AdminOwnerHandle> = state
            .admin_owners
            .iter()
            .filter(|(_, o)| o.om == om)
            .map(|(h, _)| *h)
            .collect();
        for owner in owners {
            state.finalize_admin_owner(owner)?;
        }
        Ok(())
    }

    async fn class_description_get(
        &self,
        om: OmHandle,
        class_name: &str,
    ) -> ImmResult<RawClassDescription> {
        let state = self.state.read().await;
        state.check_om(om)?;
        let class = state.store.class(class_name)?;
        Ok(RawClassDescription {
            category: class.category,
            attributes: class.attributes.iter().map(|a| a.to_raw()).collect(),
        })
    }

    #[instrument(skip(self, attributes))]
    async fn class_create(
        &self,
        om: OmHandle,
        class_name: &str,
        category: ClassCategory,
        attributes: Vec<RawAttrDefinition>,
    ) -> ImmResult<()> {
        let mut state = self.state.write().await;
        state.check_om(om)?;
        state.store.create_class(class_name, category, attributes)
    }

    #[instrument(skip(self))]
    async fn class_delete(&self, om: OmHandle, class_name: &str) -> ImmResult<()> {
        let mut state = self.state.write().await;
        state.check_om(om)?;
        state.store.delete_class(class_name)?;
        state.implementers.remove(class_name);
        state.handlers.remove(class_name);
        Ok(())
    }

    async fn accessor_get(&self, om: OmHandle, dn: &str) -> ImmResult<Vec<AttrValues>> {
        let state = self.state.read().await;
        state.check_om(om)?;
        if dn == SERVICE_OBJECT_DN {
            return Ok(state.service_object());
        }
        state.store.read(dn, state.implementer_of(dn))
    }

    async fn search_sublevel(&self, om: OmHandle, root: &str) -> ImmResult<Vec<String>> {
        let state = self.state.read().await;
        state.check_om(om)?;
        state.store.sublevel(root)
    }

    async fn search_instance_of(
        &self,
        om: OmHandle,
        root: &str,
        class_name: &str,
    ) -> ImmResult<Vec<String>> {
        let state = self.state.read().await;
        state.check_om(om)?;
        state.store.instances_of(root, class_name)
    }

    #[instrument(skip(self))]
    async fn admin_owner_initialize(
        &self,
        om: OmHandle,
        name: &str,
        release_ownership_on_finalize: bool,
    ) -> ImmResult<AdminOwnerHandle> {
        let mut state = self.state.write().await;
        state.check_om(om)?;
        if name.is_empty() {
            return Err(ImmError::ais(
                AisErrorKind::InvalidParam,
                "admin owner name is empty",
            ));
        }
        if state.admin_owners.values().any(|o| o.name == name) {
            return Err(ImmError::ais(
                AisErrorKind::Exist,
                format!("admin owner '{name}' already exists"),
            ));
        }

        let handle = AdminOwnerHandle::from_raw(state.next_raw_handle());
        state.admin_owners.insert(
            handle,
            AdminOwnerEntry {
                om,
                name: name.to_string(),
                release_on_finalize: release_ownership_on_finalize,
            },
        );
        Ok(handle)
    }

    #[instrument(skip(self))]
    async fn admin_owner_set(
        &self,
        owner: AdminOwnerHandle,
        scope: Scope,
        dns: &[String],
    ) -> ImmResult<()> {
        let mut state = self.state.write().await;
        let name = state.owner(owner)?.name.clone();

        // Objects created by this owner's open CCB are already owned by it.
        let committed: Vec<String> = dns
            .iter()
            .filter(|dn| state.store.contains(dn) || !state.pending_create(owner, dn))
            .cloned()
            .collect();
        state.store.set_admin_owner(&committed, scope, &name)
    }

    #[instrument(skip(self))]
    async fn admin_owner_release(
        &self,
        owner: AdminOwnerHandle,
        scope: Scope,
        dns: &[String],
    ) -> ImmResult<()> {
        let mut state = self.state.write().await;
        let name = state.owner(owner)?.name.clone();
        state.store.release_admin_owner(dns, scope, &name)
    }

    #[instrument(skip(self))]
    async fn admin_owner_clear(&self, om: OmHandle, scope: Scope, dns: &[String]) -> ImmResult<()> {
        let mut state = self.state.write().await;
        state.check_om(om)?;
        state.store.clear_admin_owner(dns, scope)
    }

    #[instrument(skip(self))]
    async fn admin_owner_finalize(&self, owner: AdminOwnerHandle) -> ImmResult<()> {
        let mut state = self.state.write().await;
        state.finalize_admin_owner(owner)
    }

    #[instrument(skip(self))]
    async fn ccb_initialize(
        &self,
        owner: AdminOwnerHandle,
        flags: CcbFlags,
    ) -> ImmResult<CcbHandle> {
        let mut state = self.state.write().await;
        state.owner(owner)?;
        let handle = CcbHandle::from_raw(state.next_raw_handle());
        state.ccbs.insert(
            handle,
            CcbEntry {
                owner,
                flags,
                ops: Vec::new(),
                aborted: false,
            },
        );
        Ok(handle)
    }

    #[instrument(skip(self, attributes))]
    async fn ccb_object_create(
        &self,
        ccb: CcbHandle,
        class_name: &str,
        parent: &str,
        attributes: Vec<AttrValues>,
    ) -> ImmResult<()> {
        let mut state = self.state.write().await;
        state.queue(
            ccb,
            CcbOp::Create {
                class_name: class_name.to_string(),
                parent: parent.to_string(),
                attributes,
            },
        )
    }

    #[instrument(skip(self, modifications))]
    async fn ccb_object_modify(
        &self,
        ccb: CcbHandle,
        dn: &str,
        modifications: Vec<AttrModification>,
    ) -> ImmResult<()> {
        let mut state = self.state.write().await;
        state.queue(
            ccb,
            CcbOp::Modify {
                dn: dn.to_string(),
                modifications,
            },
        )
    }

    #[instrument(skip(self))]
    async fn ccb_object_delete(&self, ccb: CcbHandle, dn: &str) -> ImmResult<()> {
        let mut state = self.state.write().await;
        state.queue(ccb, CcbOp::Delete { dn: dn.to_string() })
    }

    #[instrument(skip(self))]
    async fn ccb_apply(&self, ccb: CcbHandle) -> ImmResult<()> {
        let mut state = self.state.write().await;
        let result = {
            let entry = state.ccb(ccb)?;
            state.replay(entry, None)
        };

        match result {
            Ok((working, _)) => {
                state.store = working;
                if let Some(entry) = state.ccbs.get_mut(&ccb) {
                    info!(ccb = %ccb, operations = entry.ops.len(), "CCB committed");
                    entry.ops.clear();
                }
                Ok(())
            }
            Err(e) => {
                if let Some(entry) = state.ccbs.get_mut(&ccb) {
                    entry.aborted = true;
                }
                warn!(ccb = %ccb, error = %e, "CCB apply failed, nothing committed");
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn ccb_finalize(&self, ccb: CcbHandle) -> ImmResult<()> {
        let mut state = self.state.write().await;
        let entry = state
            .ccbs
            .remove(&ccb)
            .ok_or_else(|| bad_handle("CCB", ccb.as_raw()))?;
        if !entry.ops.is_empty() {
            debug!(ccb = %ccb, discarded = entry.ops.len(), "Unapplied operations discarded");
        }
        Ok(())
    }

    #[instrument(skip(self, params))]
    async fn admin_operation_invoke(
        &self,
        owner: AdminOwnerHandle,
        dn: &str,
        operation_id: u64,
        params: Vec<AdminOperationParam>,
        timeout: Duration,
    ) -> ImmResult<OperationStatus> {
        let handler = {
            let state = self.state.read().await;
            let name = &state.owner(owner)?.name;
            let object = state.store.object(dn)?;
            if object.admin_owner.as_deref() != Some(name.as_str()) {
                return Err(ImmError::ais(
                    AisErrorKind::BadOperation,
                    format!("object '{dn}' is not owned by '{name}'"),
                ));
            }
            if !state.implementers.contains_key(&object.class_name) {
                return Err(ImmError::ais(
                    AisErrorKind::NotExist,
                    format!("object '{dn}' has no implementer"),
                ));
            }
            state
                .handlers
                .get(&object.class_name)
                .cloned()
                .ok_or_else(|| {
                    ImmError::ais(
                        AisErrorKind::NotSupported,
                        format!("class '{}' handles no administrative operations", object.class_name),
                    )
                })?
        };

        debug!(timeout_ms = timeout.as_millis() as u64, "Dispatching administrative operation");
        Ok(handler(dn, operation_id, &params))
    }
}
