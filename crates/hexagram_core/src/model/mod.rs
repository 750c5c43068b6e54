//! Storage-neutral data model for repositories and adapters.
//!
//! # Responsibility
//! - Define entity, record, descriptor and filter shapes shared by every
//!   adapter implementation.
//!
//! # Invariants
//! - Entities and records never reference each other; repositories convert
//!   between them through an explicit mapper.

pub mod descriptor;
pub mod entity;
pub mod filter;
pub mod record;
pub mod value;
