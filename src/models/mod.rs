pub mod collection;
pub mod loaders;
pub mod record;

pub use collection::Collection;
pub use loaders::{load_collection, load_context};
pub use record::{Enrichment, Record, RecordId};
