// Trigger store implementations.

pub mod in_memory;
pub mod json_store;
pub mod ocr;
pub mod sqlite_store;

pub use in_memory::InMemoryTriggerStore;
pub use json_store::JsonTriggerStore;
pub use ocr::NoopImageTextReader;
pub use sqlite_store::SqliteTriggerStore;
