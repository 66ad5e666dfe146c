//! Object and class repository
//!
//! Holds committed state. CCB operations are validated and applied against
//! clones of a [`Store`], which replace the committed one on apply.

use std::collections::{BTreeMap, HashMap};

use immom::dn::{is_descendant, join_dn, split_dn, ROOT};
use immom::error::{AisErrorKind, ImmError, ImmResult};
use immom::flags::{AttrFlag, AttrFlags};
use immom::schema::{
    is_system_name, AttributeDefinition, ClassCategory, ClassDefinition, RawAttrDefinition,
    ADMIN_OWNER_NAME_ATTR, CLASS_NAME_ATTR, IMPLEMENTER_NAME_ATTR,
};
use immom::service::{AttrModType, AttrModification, Scope};
use immom::value::{AttrValues, ImmValue, ValueType};

fn invalid(message: impl Into<String>) -> ImmError {
    ImmError::ais(AisErrorKind::InvalidParam, message)
}

fn not_exist(message: impl Into<String>) -> ImmError {
    ImmError::ais(AisErrorKind::NotExist, message)
}

fn bad_operation(message: impl Into<String>) -> ImmError {
    ImmError::ais(AisErrorKind::BadOperation, message)
}

/// A stored object. System attributes are derived on read.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredObject {
    pub class_name: String,
    pub parent: String,
    pub seq: u64,
    pub admin_owner: Option<String>,
    pub values: BTreeMap<String, Vec<ImmValue>>,
}

/// A queued CCB operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CcbOp {
    Create {
        class_name: String,
        parent: String,
        attributes: Vec<AttrValues>,
    },
    Modify {
        dn: String,
        modifications: Vec<AttrModification>,
    },
    Delete {
        dn: String,
    },
}

/// Who is applying an operation and under which rules.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpContext<'a> {
    pub owner: &'a str,
    pub require_implementer: bool,
    pub implementers: &'a HashMap<String, String>,
}

impl OpContext<'_> {
    fn check_implementer(&self, class_name: &str) -> ImmResult<()> {
        if self.require_implementer && !self.implementers.contains_key(class_name) {
            return Err(not_exist(format!(
                "no implementer registered for class '{class_name}'"
            )));
        }
        Ok(())
    }
}

fn system_attributes(class_name: &str, category: ClassCategory) -> Vec<AttributeDefinition> {
    let flags = match category {
        ClassCategory::Config => AttrFlags::from([AttrFlag::Config]),
        ClassCategory::Runtime => AttrFlags::from([AttrFlag::Runtime, AttrFlag::Cached]),
    };
    vec![
        AttributeDefinition::new(CLASS_NAME_ATTR, ValueType::String, flags.clone())
            .with_default(ImmValue::String(class_name.to_string())),
        AttributeDefinition::new(
            ADMIN_OWNER_NAME_ATTR,
            ValueType::String,
            flags.clone(),
        ),
        AttributeDefinition::new(IMPLEMENTER_NAME_ATTR, ValueType::String, flags),
    ]
}

fn check_values(def: &AttributeDefinition, values: &[ImmValue]) -> ImmResult<()> {
    if let Some(bad) = values.iter().find(|v| v.value_type() != def.value_type) {
        return Err(invalid(format!(
            "attribute '{}' is {}, got {}",
            def.name,
            def.value_type,
            bad.value_type()
        )));
    }
    if values.len() > 1 && !def.has_flag(AttrFlag::MultiValue) {
        return Err(invalid(format!(
            "attribute '{}' is single-valued",
            def.name
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Store {
    classes: BTreeMap<String, ClassDefinition>,
    objects: HashMap<String, StoredObject>,
    next_seq: u64,
}

impl Store {
    // Classes

    pub fn create_class(
        &mut self,
        name: &str,
        category: ClassCategory,
        attributes: Vec<RawAttrDefinition>,
    ) -> ImmResult<()> {
        if name.is_empty() || is_system_name(name) {
            return Err(invalid(format!("invalid class name '{name}'")));
        }
        if self.classes.contains_key(name) {
            return Err(ImmError::ais(
                AisErrorKind::Exist,
                format!("class '{name}' already exists"),
            ));
        }

        let mut defs: Vec<AttributeDefinition> = Vec::with_capacity(attributes.len() + 3);
        for raw in attributes {
            let def = AttributeDefinition::from_raw(raw);
            if def.name.is_empty() || is_system_name(&def.name) {
                return Err(invalid(format!("invalid attribute name '{}'", def.name)));
            }
            if defs.iter().any(|d| d.name == def.name) {
                return Err(invalid(format!("duplicate attribute '{}'", def.name)));
            }

            let config = def.has_flag(AttrFlag::Config);
            let runtime = def.has_flag(AttrFlag::Runtime);
            match category {
                ClassCategory::Config if config == runtime => {
                    return Err(invalid(format!(
                        "attribute '{}' must be either CONFIG or RUNTIME",
                        def.name
                    )));
                }
                ClassCategory::Runtime if config || !runtime => {
                    return Err(invalid(format!(
                        "attribute '{}' of a RUNTIME class must be RUNTIME",
                        def.name
                    )));
                }
                _ => {}
            }
            if def.is_rdn() && !def.value_type.is_naming() {
                return Err(invalid(format!(
                    "RDN attribute '{}' must be SA_NAME_T or SA_STRING_T",
                    def.name
                )));
            }
            if let Some(default) = &def.default_value {
                check_values(&def, std::slice::from_ref(default))?;
            }
            defs.push(def);
        }

        match defs.iter().filter(|d| d.is_rdn()).count() {
            1 => {}
            n => {
                return Err(invalid(format!(
                    "class '{name}' has {n} RDN attributes, expected one"
                )))
            }
        }

        defs.extend(system_attributes(name, category));
        self.classes
            .insert(name.to_string(), ClassDefinition::new(name, category, defs));
        Ok(())
    }

    pub fn delete_class(&mut self, name: &str) -> ImmResult<()> {
        if !self.classes.contains_key(name) {
            return Err(not_exist(format!("class '{name}' does not exist")));
        }
        let instances = self
            .objects
            .values()
            .filter(|o| o.class_name == name)
            .count();
        if instances > 0 {
            return Err(ImmError::ais(
                AisErrorKind::Busy,
                format!("class '{name}' has {instances} instances"),
            ));
        }
        self.classes.remove(name);
        Ok(())
    }

    pub fn class(&self, name: &str) -> ImmResult<&ClassDefinition> {
        self.classes
            .get(name)
            .ok_or_else(|| not_exist(format!("class '{name}' does not exist")))
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.classes.values()
    }

    // Objects

    pub fn object(&self, dn: &str) -> ImmResult<&StoredObject> {
        self.objects
            .get(dn)
            .ok_or_else(|| not_exist(format!("object '{dn}' does not exist")))
    }

    pub fn contains(&self, dn: &str) -> bool {
        self.objects.contains_key(dn)
    }

    /// All attributes of `dn` in class definition order.
    pub fn read(&self, dn: &str, implementer: Option<&str>) -> ImmResult<Vec<AttrValues>> {
        let object = self.object(dn)?;
        let class = self.class(&object.class_name)?;

        let text = |value: Option<&str>| {
            value
                .map(|v| vec![ImmValue::String(v.to_string())])
                .unwrap_or_default()
        };

        Ok(class
            .attributes
            .iter()
            .map(|def| {
                let values = match def.name.as_str() {
                    CLASS_NAME_ATTR => text(Some(object.class_name.as_str())),
                    ADMIN_OWNER_NAME_ATTR => text(object.admin_owner.as_deref()),
                    IMPLEMENTER_NAME_ATTR => text(implementer),
                    name => object.values.get(name).cloned().unwrap_or_default(),
                };
                AttrValues::new(def.name.clone(), def.value_type, values)
            })
            .collect())
    }

    /// Objects matching `filter`, in creation order.
    fn select(&self, filter: impl Fn(&str, &StoredObject) -> bool) -> Vec<String> {
        let mut found: Vec<(&String, u64)> = self
            .objects
            .iter()
            .filter(|(dn, o)| filter(dn, o))
            .map(|(dn, o)| (dn, o.seq))
            .collect();
        found.sort_by_key(|(_, seq)| *seq);
        found.into_iter().map(|(dn, _)| dn.clone()).collect()
    }

    pub fn children(&self, dn: &str) -> Vec<String> {
        self.select(|_, o| o.parent == dn)
    }

    pub fn descendants(&self, dn: &str) -> Vec<String> {
        self.select(|name, _| is_descendant(name, dn))
    }

    /// `root` itself (unless it is the tree root) followed by its children.
    pub fn sublevel(&self, root: &str) -> ImmResult<Vec<String>> {
        if root == ROOT {
            return Ok(self.children(ROOT));
        }
        self.object(root)?;
        let mut result = vec![root.to_string()];
        result.extend(self.children(root));
        Ok(result)
    }

    pub fn instances_of(&self, root: &str, class_name: &str) -> ImmResult<Vec<String>> {
        self.class(class_name)?;
        if root != ROOT {
            self.object(root)?;
        }
        Ok(self.select(|dn, o| {
            o.class_name == class_name && (dn == root || is_descendant(dn, root))
        }))
    }

    /// Every object in creation order.
    pub fn all_objects(&self) -> Vec<(String, &StoredObject)> {
        self.select(|_, _| true)
            .into_iter()
            .filter_map(|dn| self.objects.get(&dn).map(|o| (dn, o)))
            .collect()
    }

    // Admin ownership

    fn scope_targets(&self, dn: &str, scope: Scope) -> ImmResult<Vec<String>> {
        self.object(dn)?;
        let mut targets = vec![dn.to_string()];
        match scope {
            Scope::One => {}
            Scope::Sublevel => targets.extend(self.children(dn)),
            Scope::Subtree => targets.extend(self.descendants(dn)),
        }
        Ok(targets)
    }

    fn targets(&self, dns: &[String], scope: Scope) -> ImmResult<Vec<String>> {
        let mut all = Vec::new();
        for dn in dns {
            all.extend(self.scope_targets(dn, scope)?);
        }
        Ok(all)
    }

    fn set_owner_of(&mut self, targets: &[String], owner: Option<&str>) {
        for dn in targets {
            if let Some(object) = self.objects.get_mut(dn) {
                object.admin_owner = owner.map(str::to_string);
            }
        }
    }

    pub fn set_admin_owner(&mut self, dns: &[String], scope: Scope, owner: &str) -> ImmResult<()> {
        let targets = self.targets(dns, scope)?;
        for dn in &targets {
            if let Some(other) = self.object(dn)?.admin_owner.as_deref() {
                if other != owner {
                    return Err(ImmError::ais(
                        AisErrorKind::Exist,
                        format!("object '{dn}' is owned by '{other}'"),
                    ));
                }
            }
        }
        self.set_owner_of(&targets, Some(owner));
        Ok(())
    }

    pub fn release_admin_owner(
        &mut self,
        dns: &[String],
        scope: Scope,
        owner: &str,
    ) -> ImmResult<()> {
        let targets = self.targets(dns, scope)?;
        for dn in &targets {
            if self.object(dn)?.admin_owner.as_deref() != Some(owner) {
                return Err(not_exist(format!("object '{dn}' is not owned by '{owner}'")));
            }
        }
        self.set_owner_of(&targets, None);
        Ok(())
    }

    pub fn clear_admin_owner(&mut self, dns: &[String], scope: Scope) -> ImmResult<()> {
        let targets = self.targets(dns, scope)?;
        self.set_owner_of(&targets, None);
        Ok(())
    }

    pub fn release_all(&mut self, owner: &str) -> usize {
        let mut released = 0;
        for object in self.objects.values_mut() {
            if object.admin_owner.as_deref() == Some(owner) {
                object.admin_owner = None;
                released += 1;
            }
        }
        released
    }

    // Object creation and update

    /// Validate attributes for a new instance of `class` below `parent`.
    ///
    /// Only attributes carrying `settable` may be supplied (any non-system
    /// attribute when `None`). Class defaults fill unset attributes only when
    /// `apply_defaults` is set. Returns the new DN and stored values.
    fn build_object(
        &self,
        class: &ClassDefinition,
        parent: &str,
        attributes: Vec<AttrValues>,
        settable: Option<AttrFlag>,
        apply_defaults: bool,
    ) -> ImmResult<(String, BTreeMap<String, Vec<ImmValue>>)> {
        if parent != ROOT {
            self.object(parent)?;
        }
        let rdn_def = class.rdn_attribute()?;

        let mut values: BTreeMap<String, Vec<ImmValue>> = BTreeMap::new();
        for attr in attributes {
            if is_system_name(&attr.name) {
                return Err(invalid(format!("attribute '{}' is system managed", attr.name)));
            }
            let def = class.attribute(&attr.name).ok_or_else(|| {
                invalid(format!(
                    "class '{}' has no attribute '{}'",
                    class.name, attr.name
                ))
            })?;
            if let Some(flag) = settable {
                if !def.has_flag(flag) {
                    return Err(invalid(format!(
                        "attribute '{}' cannot be set here",
                        attr.name
                    )));
                }
            }
            if values.contains_key(&attr.name) {
                return Err(invalid(format!("attribute '{}' given twice", attr.name)));
            }
            check_values(def, &attr.values)?;
            values.insert(attr.name, attr.values);
        }

        let rdn = match values.get(&rdn_def.name).map(Vec::as_slice) {
            Some([value]) => value
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| invalid("RDN value is empty"))?,
            _ => return Err(invalid(format!("RDN attribute '{}' needs one value", rdn_def.name))),
        };

        let dn = join_dn(&rdn, parent);
        match split_dn(&dn) {
            Ok((r, p)) if r == rdn && p == parent => {}
            _ => return Err(invalid(format!("RDN '{rdn}' does not form a valid name"))),
        }
        if self.objects.contains_key(&dn) {
            return Err(ImmError::ais(
                AisErrorKind::Exist,
                format!("object '{dn}' already exists"),
            ));
        }

        let defaulted = class
            .attributes
            .iter()
            .filter(|d| apply_defaults && !is_system_name(&d.name));
        for def in defaulted {
            if let Some(default) = &def.default_value {
                values
                    .entry(def.name.clone())
                    .or_insert_with(|| vec![default.clone()]);
            }
        }
        values.retain(|_, v| !v.is_empty());

        if let Some(missing) = class
            .attributes
            .iter()
            .find(|d| d.has_flag(AttrFlag::Initialized) && !values.contains_key(&d.name))
        {
            return Err(invalid(format!(
                "attribute '{}' must be initialized",
                missing.name
            )));
        }

        Ok((dn, values))
    }

    fn insert(
        &mut self,
        dn: String,
        class_name: &str,
        parent: &str,
        admin_owner: Option<String>,
        values: BTreeMap<String, Vec<ImmValue>>,
    ) {
        self.next_seq += 1;
        self.objects.insert(
            dn,
            StoredObject {
                class_name: class_name.to_string(),
                parent: parent.to_string(),
                seq: self.next_seq,
                admin_owner,
                values,
            },
        );
    }

    /// Apply a CCB operation, returning the DN it targeted.
    pub fn apply(&mut self, op: &CcbOp, ctx: &OpContext<'_>) -> ImmResult<String> {
        match op {
            CcbOp::Create {
                class_name,
                parent,
                attributes,
            } => self.create_object(class_name, parent, attributes.clone(), ctx),
            CcbOp::Modify { dn, modifications } => {
                self.modify_object(dn, modifications, ctx)?;
                Ok(dn.clone())
            }
            CcbOp::Delete { dn } => {
                self.delete_object(dn, ctx)?;
                Ok(dn.clone())
            }
        }
    }

    fn create_object(
        &mut self,
        class_name: &str,
        parent: &str,
        attributes: Vec<AttrValues>,
        ctx: &OpContext<'_>,
    ) -> ImmResult<String> {
        let class = self.class(class_name)?.clone();
        if !class.is_config() {
            return Err(invalid(format!(
                "'{class_name}' is a RUNTIME class, its objects cannot be created in a CCB"
            )));
        }
        ctx.check_implementer(class_name)?;
        if parent != ROOT && self.object(parent)?.admin_owner.as_deref() != Some(ctx.owner) {
            return Err(bad_operation(format!(
                "parent '{parent}' is not owned by '{}'",
                ctx.owner
            )));
        }

        let (dn, values) =
            self.build_object(&class, parent, attributes, Some(AttrFlag::Config), true)?;
        self.insert(dn.clone(), class_name, parent, Some(ctx.owner.to_string()), values);
        Ok(dn)
    }

    fn modify_object(
        &mut self,
        dn: &str,
        modifications: &[AttrModification],
        ctx: &OpContext<'_>,
    ) -> ImmResult<()> {
        let object = self.object(dn)?;
        if object.admin_owner.as_deref() != Some(ctx.owner) {
            return Err(bad_operation(format!(
                "object '{dn}' is not owned by '{}'",
                ctx.owner
            )));
        }
        ctx.check_implementer(&object.class_name)?;
        let class = self.class(&object.class_name)?;
        let mut values = object.values.clone();

        for m in modifications {
            let name = &m.attr.name;
            let def = class
                .attribute(name)
                .filter(|d| !is_system_name(&d.name) && !d.is_rdn())
                .ok_or_else(|| invalid(format!("attribute '{name}' cannot be modified")))?;
            if !def.has_flag(AttrFlag::Config) || !def.has_flag(AttrFlag::Writable) {
                return Err(invalid(format!("attribute '{name}' is not writable")));
            }
            check_values(def, &m.attr.values)?;

            let current = values.entry(name.clone()).or_default();
            match m.mod_type {
                AttrModType::Replace => current.clone_from(&m.attr.values),
                AttrModType::Add => current.extend(m.attr.values.iter().cloned()),
                AttrModType::Delete => current.retain(|v| !m.attr.values.contains(v)),
            }
            check_values(def, current.as_slice())?;
            if current.is_empty() && def.has_flag(AttrFlag::Initialized) {
                return Err(invalid(format!("attribute '{name}' cannot be cleared")));
            }
        }
        values.retain(|_, v| !v.is_empty());

        if let Some(object) = self.objects.get_mut(dn) {
            object.values = values;
        }
        Ok(())
    }

    fn delete_object(&mut self, dn: &str, ctx: &OpContext<'_>) -> ImmResult<usize> {
        self.object(dn)?;
        let mut doomed = vec![dn.to_string()];
        doomed.extend(self.descendants(dn));

        for target in &doomed {
            let object = self.object(target)?;
            if object.admin_owner.as_deref() != Some(ctx.owner) {
                return Err(bad_operation(format!(
                    "object '{target}' is not owned by '{}'",
                    ctx.owner
                )));
            }
            if !self.class(&object.class_name)?.is_config() {
                return Err(bad_operation(format!(
                    "subtree contains runtime object '{target}'"
                )));
            }
            ctx.check_implementer(&object.class_name)?;
        }

        for target in &doomed {
            self.objects.remove(target);
        }
        Ok(doomed.len())
    }

    // Implementer side and snapshots

    /// Create an object of a RUNTIME class (the object implementer's path).
    pub fn create_runtime_object(
        &mut self,
        class_name: &str,
        parent: &str,
        attributes: Vec<AttrValues>,
    ) -> ImmResult<String> {
        let class = self.class(class_name)?.clone();
        if class.is_config() {
            return Err(invalid(format!("'{class_name}' is a CONFIG class")));
        }
        let (dn, values) =
            self.build_object(&class, parent, attributes, Some(AttrFlag::Runtime), true)?;
        self.insert(dn.clone(), class_name, parent, None, values);
        Ok(dn)
    }

    /// Replace RUNTIME attribute values of an object.
    pub fn update_runtime(&mut self, dn: &str, attributes: Vec<AttrValues>) -> ImmResult<()> {
        let object = self.object(dn)?;
        let class = self.class(&object.class_name)?;
        for attr in &attributes {
            let def = class
                .attribute(&attr.name)
                .filter(|d| d.has_flag(AttrFlag::Runtime) && !d.is_rdn() && !is_system_name(&d.name))
                .ok_or_else(|| invalid(format!("'{}' is not a runtime attribute", attr.name)))?;
            check_values(def, &attr.values)?;
        }

        if let Some(object) = self.objects.get_mut(dn) {
            for attr in attributes {
                if attr.values.is_empty() {
                    object.values.remove(&attr.name);
                } else {
                    object.values.insert(attr.name, attr.values);
                }
            }
        }
        Ok(())
    }

    /// Insert an object as-is, with its RDN taken from `dn`.
    ///
    /// Class defaults are not applied: an attribute missing from a captured
    /// object was cleared.
    pub fn restore_object(
        &mut self,
        dn: &str,
        class_name: &str,
        admin_owner: Option<String>,
        attributes: Vec<AttrValues>,
    ) -> ImmResult<()> {
        let (rdn, parent) = split_dn(dn)?;
        let class = self.class(class_name)?.clone();
        let rdn_def = class.rdn_attribute()?;

        let mut attributes: Vec<AttrValues> = attributes
            .into_iter()
            .filter(|a| a.name != rdn_def.name)
            .collect();
        let rdn_value = match rdn_def.value_type {
            ValueType::String => ImmValue::String(rdn.to_string()),
            _ => ImmValue::Name(rdn.to_string()),
        };
        attributes.push(AttrValues::new(
            rdn_def.name.clone(),
            rdn_def.value_type,
            vec![rdn_value],
        ));

        let (built, values) = self.build_object(&class, parent, attributes, None, false)?;
        self.insert(built, class_name, parent, admin_owner, values);
        Ok(())
    }
}
