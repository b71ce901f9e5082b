pub mod json_loader;

pub use json_loader::{load_collection, load_context};
