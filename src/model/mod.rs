pub mod error;
pub mod field_store;
pub mod leaf;
pub mod serializer;
