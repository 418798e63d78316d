//! Observability helpers for bridge flows.
//!
//! - Every flow runs inside a `tracing` span named `dm_bridge.flow` carrying the `flow` and
//!   `stage` fields.
//! - Enable `metrics` to increment the `dm_bridge_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.
//! - [`try_init_subscriber`] installs the process-wide `tracing-subscriber` stack used by the
//!   binary.

mod metrics;
mod subscriber;
mod tracing;

pub use self::{metrics::*, subscriber::*, tracing::*};

// self
use crate::_prelude::*;

/// Flow kinds observed by the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Redirect-out half of the linking flow.
	Initiate,
	/// Callback half of the linking flow (exchange + store write).
	Callback,
	/// Message relay to a chat user.
	Relay,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Initiate => "initiate",
			FlowKind::Callback => "callback",
			FlowKind::Relay => "relay",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
