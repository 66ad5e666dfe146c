//! CLI command implementations

pub mod apply;
pub mod class;
pub mod dump;
pub mod show;
pub mod split_dn;
pub mod tree;
