//! Terminal output helpers

use std::collections::HashMap;

use immom::dn::{parent_dn, split_dn};
use immom::objects::ImmObject;
use immom::schema::ClassDefinition;
use immom::value::ImmValue;

use crate::error::CliResult;

/// Check if color output is enabled
fn use_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Print a success message (green checkmark)
pub fn print_success(message: &str) {
    if use_color() {
        println!("\x1b[32m✓\x1b[0m {}", message);
    } else {
        println!("OK: {}", message);
    }
}

/// Print a warning message (yellow)
pub fn print_warning(message: &str) {
    if use_color() {
        eprintln!("\x1b[33mWarning:\x1b[0m {}", message);
    } else {
        eprintln!("Warning: {}", message);
    }
}

fn join_values(values: &[ImmValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per attribute: `name (TYPE): v1, v2`.
pub fn format_object(object: &ImmObject) -> String {
    let mut out = format!("{}\n", object.dn);
    for attr in &object.attributes {
        out.push_str(&format!(
            "  {} ({}): {}\n",
            attr.name,
            attr.value_type,
            join_values(&attr.values)
        ));
    }
    out
}

/// Class category followed by one line per attribute with its flags.
pub fn format_class(class: &ClassDefinition) -> String {
    let mut out = format!("{} ({})\n", class.name, class.category);
    for attr in &class.attributes {
        out.push_str(&format!(
            "  {} {} [{}]",
            attr.name,
            attr.value_type,
            attr.flags.symbols().join(", ")
        ));
        if let Some(default) = &attr.default_value {
            out.push_str(&format!(" default={default}"));
        }
        out.push('\n');
    }
    out
}

/// Render `dns` as an indented tree below `root`.
///
/// Children are grouped under their parent DN and keep their order in
/// `dns`, so any listing of the subtree renders the same way.
pub fn format_tree(root: &str, dns: &[String]) -> CliResult<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for dn in dns {
        children.entry(parent_dn(dn)?).or_default().push(dn);
    }

    let mut out = String::new();
    let base = if root.is_empty() {
        0
    } else {
        out.push_str(root);
        out.push('\n');
        1
    };
    write_level(&mut out, &children, root, base)?;
    Ok(out)
}

fn write_level(
    out: &mut String,
    children: &HashMap<&str, Vec<&str>>,
    parent: &str,
    level: usize,
) -> CliResult<()> {
    for dn in children.get(parent).into_iter().flatten() {
        out.push_str(&"  ".repeat(level));
        out.push_str(split_dn(dn)?.0);
        out.push('\n');
        write_level(out, children, dn, level + 1)?;
    }
    Ok(())
}
