//! Headless test harness for the Plaster frame core.
//!
//! Drives a [`FrameOrchestrator`](plaster_frame::FrameOrchestrator) over the
//! scripted fake device, and provides helpers for reading its event log.

pub mod harness;
pub mod trace;

#[cfg(test)]
mod properties;
#[cfg(test)]
mod scenarios;

pub use harness::{FrameHarness, HarnessConfig};
pub use plaster_frame::headless::{
    DeviceEvent, FaultPoint, GpuCompletion, HeadlessConfig, HeadlessDevice, HeadlessFence,
};
