pub mod constants;
pub mod error;
pub mod types;

pub use error::{MemlogError, MemlogErrorKind};
pub use types::{
    validate_agent_name, validate_metadata, ChainConfig, Entry, EntryType, KeyMode, MetadataMap,
    MetadataValue, Seq, Tier, CHAIN_CONFIG_VERSION,
};
