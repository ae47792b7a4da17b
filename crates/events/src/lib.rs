//! # Sentinel Events
//!
//! The things a run reports: position transitions, SMA touches, the proximity
//! summary and the end-of-run summary, together with their rendering as the
//! plain-text messages sent to the alert channels.
//!
//! As a Layer 0 crate, it depends only on `core-types`.

pub mod format;
pub mod messages;

pub use format::{format_amount, format_price};
pub use messages::{PositionEvent, ProximitySummary, RunSummary, SmaTouch};
