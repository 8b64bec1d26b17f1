//! # Shared Types Crate
//!
//! Types shared by every storage-daemon component that persists or exchanges
//! per-object state.
//!
//! ## Contents
//!
//! - **Codec**: the versioned envelope and little-endian primitives every
//!   persisted structure is framed with.
//! - **Entities**: [`ObjectId`], the totally ordered object identity.
//! - **Modification**: the rollback boundary ([`RollbackVisitor`]) between an
//!   operation log and a local store.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod modification;

pub use codec::{Decode, Encode};
pub use entities::*;
pub use errors::*;
pub use modification::*;
