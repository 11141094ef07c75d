//! Chain registry records and the on-disk store

mod record;
mod store;

pub use record::{trim_trailing_slash, ApiKind, ChainRecord, Endpoint};
pub use store::{RegistryStore, RECORD_FILE};
