//! Test helpers shared across Mnemos crates.

pub mod backends;
pub mod dispatcher;
pub mod embedding;
pub mod kv;
pub mod vector;

pub use backends::FakeBackends;
pub use dispatcher::{DispatchCall, RecordingDispatcher};
pub use embedding::{FailingEmbedder, HashEmbedder};
pub use kv::MemoryKv;
pub use vector::MemoryVectorStore;
