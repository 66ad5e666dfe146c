//! # In-memory IMM service
//!
//! [`InMemoryImm`] implements [`immom::service::ImmService`] without a
//! running IMM: class and object repository, admin ownership, CCBs with
//! atomic apply, and simulated object implementers. State can be loaded
//! from and saved to JSON or YAML [`Snapshot`]s.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use immom::prelude::*;
//! use immom_memory::{InMemoryImm, Snapshot};
//!
//! let imm = InMemoryImm::from_snapshot(&Snapshot::load("model.yaml")?)?;
//! let session = Session::open(Arc::new(imm), SessionConfig::default()).await?;
//! let tree = session.get_subtree("").await?;
//! ```

mod error;
mod service;
mod snapshot;
mod store;

pub use error::{SnapshotError, SnapshotResult};
pub use service::{
    AdminOperationHandler, InMemoryImm, CLASS_NAMES_ATTR, SERVICE_CLASS_NAME, SERVICE_OBJECT_DN,
};
pub use snapshot::{ObjectRecord, Snapshot, SnapshotFormat};
