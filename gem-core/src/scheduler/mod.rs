//! Render Scheduling
//!
//! Decouples "a store changed" from "the element re-rendered". Async elements
//! push render tasks into a [`RenderPool`]; a [`FrameScheduler`] drains the
//! pool one frame at a time under a time budget (16 ms by default).
//!
//! The frame source is pluggable: call [`FrameScheduler::tick`] from an
//! existing event loop, or let [`FrameScheduler::run`] drive it on tokio.
//! Budget accounting goes through a [`Clock`] so tests can use
//! [`ManualClock`].

mod clock;
mod frame;
mod pool;

pub use clock::{Clock, ManualClock, SystemClock};
pub use frame::{FrameReport, FrameScheduler};
pub use pool::{Pool, RenderPool, RenderTask, TaskId};
