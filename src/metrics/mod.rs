//! Asynchronous metrics
//!
//! Counter, meter and histogram types whose state is confined to a private
//! mailbox. Mutators are fire-and-forget; readers take a callback that
//! receives the value and the time the read was requested. Callbacks may run
//! before the call returns (inline executor) or arbitrarily later.

mod confined;
mod counter;
mod ewma;
mod histogram;
mod meter;
mod reservoir;
mod snapshot;
mod unit;

pub use counter::AsyncCounter;
pub use ewma::{Ewma, TICK_INTERVAL};
pub use histogram::AsyncHistogram;
pub use meter::{AsyncMeter, MeterSnapshot};
pub use reservoir::{Reservoir, SlidingWindowReservoir, UniformReservoir, DEFAULT_RESERVOIR_SIZE};
pub use snapshot::Snapshot;
pub use unit::TimeUnit;
