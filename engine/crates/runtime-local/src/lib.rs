mod background;
mod kv;

pub use background::TokioBackgroundTasks;
pub use kv::InMemoryKvStore;
