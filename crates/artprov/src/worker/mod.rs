pub mod job;
pub mod pool;

pub use job::{JobResult, PhotoJob};
pub use pool::WorkerPool;
