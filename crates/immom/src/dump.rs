//! IMM XML export
//!
//! Writes classes and objects in the `imm:IMM-contents` vocabulary:
//!
//! ```xml
//! <imm:IMM-contents>
//!   <class name="TestClass">
//!     <category>SA_CONFIG</category>
//!     <rdn><name>TestClassId</name><type>SA_NAME_T</type>...</rdn>
//!     <attr><name>userLabel</name><type>SA_STRING_T</type>...</attr>
//!   </class>
//!   <object class="TestClass">
//!     <dn>TestClassId=1</dn>
//!     <attr><name>userLabel</name><value>x</value></attr>
//!   </object>
//! </imm:IMM-contents>
//! ```
//!
//! System classes and attributes are never written, nor are RUNTIME objects,
//! RDN or empty attributes, and RUNTIME attributes that are not PERSISTENT.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::io::Write;
use tracing::{debug, instrument, warn};

use crate::dn::ROOT;
use crate::error::{ImmError, ImmResult};
use crate::flags::AttrFlag;
use crate::objects::ImmObject;
use crate::schema::{is_system_name, AttributeDefinition, ClassCategory, ClassDefinition};
use crate::session::Session;

/// Root element of an IMM XML document.
pub const ROOT_ELEMENT: &str = "imm:IMM-contents";

/// Namespace bound to the `imm` prefix.
pub const IMM_NAMESPACE: &str = "http://www.saforum.org/IMMSchema";

/// Options for [`Session::dump_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Declare the `imm` namespace on the root element.
    pub declare_namespace: bool,
}

impl DumpOptions {
    /// Declare the `imm` namespace on the root element.
    #[must_use]
    pub fn with_namespace(mut self) -> Self {
        self.declare_namespace = true;
        self
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> ImmResult<()> {
    writer
        .write_event(event)
        .map_err(|e| ImmError::export_with_source("failed to write XML", e))
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> ImmResult<()> {
    emit(writer, Event::Start(BytesStart::new(name)))
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> ImmResult<()> {
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> ImmResult<()> {
    start(writer, name)?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    end(writer, name)
}

fn category_symbol(category: ClassCategory) -> &'static str {
    match category {
        ClassCategory::Config => "SA_CONFIG",
        ClassCategory::Runtime => "SA_RUNTIME",
    }
}

fn write_class_attribute<W: Write>(
    writer: &mut Writer<W>,
    attr: &AttributeDefinition,
) -> ImmResult<()> {
    let element = if attr.is_rdn() { "rdn" } else { "attr" };
    start(writer, element)?;
    text_element(writer, "name", &attr.name)?;
    text_element(writer, "type", attr.value_type.as_str())?;
    for flag in attr.flags.iter() {
        match flag {
            AttrFlag::Rdn => {}
            AttrFlag::Config => text_element(writer, "category", "SA_CONFIG")?,
            AttrFlag::Runtime => text_element(writer, "category", "SA_RUNTIME")?,
            other => text_element(writer, "flag", &format!("SA_{}", other.symbol()))?,
        }
    }
    end(writer, element)
}

/// Write one `<class>` element.
///
/// System classes produce no output.
///
/// # Errors
///
/// [`ImmError::Export`] when the writer fails.
pub fn write_class<W: Write>(writer: &mut Writer<W>, class: &ClassDefinition) -> ImmResult<()> {
    if is_system_name(&class.name) {
        debug!(class = %class.name, "Skipping system class");
        return Ok(());
    }

    let start_tag = BytesStart::new("class").with_attributes([("name", class.name.as_str())]);
    emit(writer, Event::Start(start_tag))?;
    text_element(writer, "category", category_symbol(class.category))?;
    for attr in class
        .attributes
        .iter()
        .filter(|a| !is_system_name(&a.name))
    {
        write_class_attribute(writer, attr)?;
    }
    end(writer, "class")
}

fn is_dumped_attribute(def: &AttributeDefinition) -> bool {
    if def.is_rdn() {
        return false;
    }
    !def.has_flag(AttrFlag::Runtime) || def.has_flag(AttrFlag::Persistent)
}

/// Write one `<object>` element for an instance of `class`.
///
/// Returns `false` without writing anything when the object is not a
/// configuration object.
///
/// # Errors
///
/// [`ImmError::Export`] when the writer fails.
pub fn write_object<W: Write>(
    writer: &mut Writer<W>,
    class: &ClassDefinition,
    object: &ImmObject,
) -> ImmResult<bool> {
    if !class.is_config() {
        return Ok(false);
    }

    let start_tag = BytesStart::new("object").with_attributes([("class", class.name.as_str())]);
    emit(writer, Event::Start(start_tag))?;
    text_element(writer, "dn", &object.dn)?;

    for attr in &object.attributes {
        if is_system_name(&attr.name) || attr.is_empty() {
            continue;
        }
        let Some(def) = class.attribute(&attr.name) else {
            warn!(dn = %object.dn, attribute = %attr.name, "Attribute not in class, skipped");
            continue;
        };
        if !is_dumped_attribute(def) {
            continue;
        }

        start(writer, "attr")?;
        text_element(writer, "name", &attr.name)?;
        for value in &attr.values {
            text_element(writer, "value", &value.to_string())?;
        }
        end(writer, "attr")?;
    }

    end(writer, "object")?;
    Ok(true)
}

impl Session {
    /// Write the definition of one class.
    ///
    /// # Errors
    ///
    /// As for [`Session::get_class`] and [`write_class`].
    pub async fn dump_class<W: Write + Send>(
        &self,
        writer: &mut Writer<W>,
        class_name: &str,
    ) -> ImmResult<()> {
        let class = self.get_class(class_name).await?;
        write_class(writer, &class)
    }

    /// Write one object if it is a configuration object.
    ///
    /// # Errors
    ///
    /// As for [`Session::get_object`] and [`write_object`].
    pub async fn dump_object<W: Write + Send>(
        &self,
        writer: &mut Writer<W>,
        dn: &str,
    ) -> ImmResult<bool> {
        let object = self.get_object(dn).await?;
        let class = self.get_class(object.class_name()?).await?;
        write_object(writer, &class, &object)
    }

    /// Write a complete IMM XML document: every class, then every object
    /// of the tree in [`Session::get_subtree`] order.
    ///
    /// # Errors
    ///
    /// The service's status, or [`ImmError::Export`] when `out` fails.
    #[instrument(skip(self, out), fields(session = %self.id()))]
    pub async fn dump_all<W: Write + Send>(&self, out: W, options: &DumpOptions) -> ImmResult<W> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", None, None)))?;

        let mut root = BytesStart::new(ROOT_ELEMENT);
        if options.declare_namespace {
            root.push_attribute(("xmlns:imm", IMM_NAMESPACE));
        }
        emit(&mut writer, Event::Start(root))?;

        let mut classes: HashMap<String, ClassDefinition> = HashMap::new();
        for name in self.get_class_names().await? {
            let class = self.get_class(&name).await?;
            write_class(&mut writer, &class)?;
            classes.insert(name, class);
        }

        let mut written = 0usize;
        for dn in self.get_subtree(ROOT).await? {
            let object = self.get_object(&dn).await?;
            let class_name = object.class_name()?.to_string();
            if !classes.contains_key(&class_name) {
                let class = self.get_class(&class_name).await?;
                classes.insert(class_name.clone(), class);
            }
            if write_object(&mut writer, &classes[&class_name], &object)? {
                written += 1;
            }
        }

        end(&mut writer, ROOT_ELEMENT)?;
        debug!(classes = classes.len(), objects = written, "Dump written");
        Ok(writer.into_inner())
    }
}
