pub mod pool;
pub mod processor;

pub use pool::{DispatchHook, PoolOutput, WorkerPool};
pub use processor::ItemProcessor;
