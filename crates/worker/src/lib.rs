//! Concurrency primitives for spool.
//!
//! * [`StateBarrier`]: producers mark named states reached, consumers wait for
//!   one, all, or any of them.
//! * [`SerialQueue`]: FIFO task queue that runs at most one task at a time.

mod barrier;
mod panic;
mod queue;
mod spawn;

pub use barrier::StateBarrier;
pub use panic::join_error_panic_message;
pub use queue::{CloseMode, QueueClosed, SerialQueue, TaskError, TaskHandle};
pub use spawn::spawn;
