//! XML export and inspection helpers over a small mixed model.

mod common;

use common::*;
use immom::dump::{IMM_NAMESPACE, ROOT_ELEMENT};
use immom::prelude::*;
use quick_xml::events::Event;
use quick_xml::Reader;

/// `TestDump` (CONFIG, with runtime attributes) and `TestRuntime` (RUNTIME)
/// next to `TestClass`, with one object of each.
async fn mixed_model() -> TestContext {
    let mut ctx = TestContext::with_admin_owner().await;
    let session = &ctx.session;

    session
        .create_class(
            "TestDump",
            ClassCategory::Config,
            vec![
                attr("TestDumpId", ValueType::String, &[AttrFlag::Config, AttrFlag::Rdn]),
                attr(
                    "userLabel",
                    ValueType::String,
                    &[AttrFlag::Config, AttrFlag::Writable, AttrFlag::MultiValue],
                ),
                attr("counter", ValueType::Uint32, &[AttrFlag::Runtime, AttrFlag::Cached]),
                attr(
                    "persisted",
                    ValueType::Uint64,
                    &[AttrFlag::Runtime, AttrFlag::Cached, AttrFlag::Persistent],
                ),
            ],
        )
        .await
        .unwrap();
    session
        .create_class(
            "TestRuntime",
            ClassCategory::Runtime,
            vec![attr(
                "TestRuntimeId",
                ValueType::Name,
                &[AttrFlag::Runtime, AttrFlag::Rdn, AttrFlag::Cached],
            )],
        )
        .await
        .unwrap();

    ctx.create_all("TestClass", &[TOP_OBJECT.to_string()]).await;
    ctx.create_all("TestDump", &[join_dn("TestDumpId=d1", TOP_OBJECT)])
        .await;
    ctx.modify(
        &join_dn("TestDumpId=d1", TOP_OBJECT),
        vec![AttrValues::new(
            "userLabel",
            ValueType::String,
            vec![
                ImmValue::String("a<b".to_string()),
                ImmValue::String("c".to_string()),
            ],
        )],
    )
    .await;

    ctx.imm
        .update_runtime_attributes(
            &join_dn("TestDumpId=d1", TOP_OBJECT),
            vec![
                AttrValues::new("counter", ValueType::Uint32, vec![ImmValue::Uint32(7)]),
                AttrValues::new("persisted", ValueType::Uint64, vec![ImmValue::Uint64(u64::MAX)]),
            ],
        )
        .await
        .unwrap();

    ctx.imm
        .register_implementer("RuntimeImpl", &["TestRuntime"])
        .await
        .unwrap();
    ctx.imm
        .create_runtime_object(
            "TestRuntime",
            TOP_OBJECT,
            vec![AttrValues::name("TestRuntimeId", "TestRuntimeId=r1")],
        )
        .await
        .unwrap();

    ctx
}

/// Parsed `<object>` elements: dn and `(attr name, values)`.
type DumpedObject = (String, String, Vec<(String, Vec<String>)>);

#[derive(Debug, Default)]
struct Parsed {
    root_namespace: Option<String>,
    classes: Vec<String>,
    objects: Vec<DumpedObject>,
}

fn parse(xml: &str) -> Parsed {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parsed = Parsed::default();
    let mut path: Vec<String> = Vec::new();
    let mut current_attr: Option<(String, Vec<String>)> = None;

    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) => {
                let name = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                match name.as_str() {
                    ROOT_ELEMENT => {
                        parsed.root_namespace = e
                            .try_get_attribute("xmlns:imm")
                            .unwrap()
                            .map(|a| a.unescape_value().unwrap().into_owned());
                    }
                    "class" => {
                        let class_name = e.try_get_attribute("name").unwrap().unwrap();
                        parsed
                            .classes
                            .push(class_name.unescape_value().unwrap().into_owned());
                    }
                    "object" => {
                        let class_name = e.try_get_attribute("class").unwrap().unwrap();
                        parsed.objects.push((
                            String::new(),
                            class_name.unescape_value().unwrap().into_owned(),
                            Vec::new(),
                        ));
                    }
                    "attr" if path.last().map(String::as_str) == Some("object") => {
                        current_attr = Some((String::new(), Vec::new()));
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::End(e) => {
                path.pop();
                if e.name().as_ref() == b"attr" {
                    if let (Some(attr), Some(object)) =
                        (current_attr.take(), parsed.objects.last_mut())
                    {
                        object.2.push(attr);
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape().unwrap().into_owned();
                let parent = path.get(path.len().saturating_sub(2)).map(String::as_str);
                match (parent, path.last().map(String::as_str)) {
                    (Some("object"), Some("dn")) => {
                        if let Some(object) = parsed.objects.last_mut() {
                            object.0 = text;
                        }
                    }
                    (Some("attr"), Some("name")) => {
                        if let Some(attr) = current_attr.as_mut() {
                            attr.0 = text;
                        }
                    }
                    (Some("attr"), Some("value")) => {
                        if let Some(attr) = current_attr.as_mut() {
                            attr.1.push(text);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    parsed
}

#[tokio::test]
async fn test_dump_all_reparses() {
    let ctx = mixed_model().await;
    let out = ctx
        .session
        .dump_all(Vec::new(), &DumpOptions::default())
        .await
        .unwrap();
    let xml = String::from_utf8(out).unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0"?>"#));
    assert!(!xml.contains("SaImm"));

    let parsed = parse(&xml);
    assert_eq!(parsed.root_namespace, None);
    assert_eq!(parsed.classes, vec!["TestClass", "TestDump", "TestRuntime"]);

    // Runtime objects and RDN values are left out
    let dns: Vec<&str> = parsed.objects.iter().map(|o| o.0.as_str()).collect();
    assert_eq!(dns, vec![TOP_OBJECT, "TestDumpId=d1,TestClassId=1"]);

    let (_, class_name, attrs) = &parsed.objects[1];
    assert_eq!(class_name, "TestDump");
    assert_eq!(
        attrs,
        &vec![
            (
                "userLabel".to_string(),
                vec!["a<b".to_string(), "c".to_string()]
            ),
            (
                "persisted".to_string(),
                vec![u64::MAX.to_string()]
            ),
        ]
    );
    assert!(parsed.objects[0].2.is_empty());
}

#[tokio::test]
async fn test_dump_all_with_namespace() {
    let ctx = mixed_model().await;
    let out = ctx
        .session
        .dump_all(Vec::new(), &DumpOptions::default().with_namespace())
        .await
        .unwrap();
    let parsed = parse(&String::from_utf8(out).unwrap());
    assert_eq!(parsed.root_namespace.as_deref(), Some(IMM_NAMESPACE));
}

#[tokio::test]
async fn test_dump_single_object_and_class() {
    let ctx = mixed_model().await;
    let mut writer = quick_xml::Writer::new(Vec::new());

    ctx.session.dump_class(&mut writer, "TestRuntime").await.unwrap();
    let written = ctx
        .session
        .dump_object(&mut writer, "TestRuntimeId=r1,TestClassId=1")
        .await
        .unwrap();
    assert!(!written);
    assert!(ctx
        .session
        .dump_object(&mut writer, TOP_OBJECT)
        .await
        .unwrap());

    let xml = String::from_utf8(writer.into_inner()).unwrap();
    assert!(xml.starts_with(r#"<class name="TestRuntime"><category>SA_RUNTIME</category>"#));
    assert!(xml.ends_with(r#"<object class="TestClass"><dn>TestClassId=1</dn></object>"#));
}

#[tokio::test]
async fn test_inspection_helpers() {
    let ctx = mixed_model().await;
    let session = &ctx.session;

    assert_eq!(
        session.runtime_classes().await.unwrap().into_iter().collect::<Vec<_>>(),
        vec!["TestRuntime"]
    );
    assert_eq!(
        session.config_classes().await.unwrap().into_iter().collect::<Vec<_>>(),
        vec!["TestClass", "TestDump"]
    );
    assert_eq!(
        session
            .config_classes_with_runtime_attributes()
            .await
            .unwrap()
            .into_iter()
            .collect::<Vec<_>>(),
        vec!["TestDump"]
    );

    assert_eq!(session.implementers().await.unwrap(), vec!["RuntimeImpl"]);
    assert_eq!(
        session
            .implementer_of("TestRuntimeId=r1,TestClassId=1")
            .await
            .unwrap()
            .as_deref(),
        Some("RuntimeImpl")
    );
    assert_eq!(session.implementer_of(TOP_OBJECT).await.unwrap(), None);
    assert_eq!(
        session.admin_owner_of(TOP_OBJECT).await.unwrap().as_deref(),
        Some(TEST_ADMIN)
    );
    assert_eq!(
        session
            .admin_owner_of("TestRuntimeId=r1,TestClassId=1")
            .await
            .unwrap(),
        None
    );

    let mut runtime = session.get_instance_of("", "TestRuntime").await.unwrap();
    runtime.sort();
    assert_eq!(runtime, vec!["TestRuntimeId=r1,TestClassId=1"]);
}
