//! Tenant configuration: profile entities, stores and the process-wide cache.

pub mod store;
pub mod tenant;

pub use store::{ConfigCache, ConfigFile, ConfigStore, InMemoryConfigStore, JsonConfigStore};
pub use tenant::{
    BlockConfig, BlockMode, CalcKind, CodeMapping, FieldCalculation, FieldDef, FieldType,
    IdentifierRule, ResultType, TenantProfile, TenantStatus,
};
