//! Repository/adapter persistence core.
//!
//! Repositories bind one entity type to a persistence descriptor and a
//! pluggable storage adapter, and gate every write behind entity validation.

pub mod adapter;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use adapter::{Adapter, AdapterError, AdapterResult, MemoryAdapter, SqliteAdapter};
pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::descriptor::{Descriptor, DescriptorError, FieldKind, FieldSpec, ID_FIELD};
pub use model::entity::{Entity, MappingError, ValidationContext, Violation};
pub use model::filter::Filter;
pub use model::record::{PersistenceRecord, RecordId};
pub use model::value::{Attributes, FieldValue};
pub use repo::{AttributeMapper, RecordMapper, RepoError, RepoResult, Repository, SaveOutcome};
