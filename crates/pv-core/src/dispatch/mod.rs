//! Delivery of records to the display layer
//!
//! Every call into the [`DisplaySink`](crate::display::DisplaySink) passes
//! through [`ReplayQueue`], whether it comes from a jump replay or from the
//! live clock. Replays themselves run on the [`ReplayExecutor`].

mod queue;
mod replay;

pub use queue::ReplayQueue;
pub use replay::ReplayExecutor;
