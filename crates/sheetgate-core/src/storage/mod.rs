pub mod models;
pub mod naming;
pub mod store;

pub use models::{DerivedKind, StoredFile, StoredResource};
pub use store::FileStore;
