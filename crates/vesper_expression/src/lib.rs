//! Outbound behaviour: scheduled rules, the dispatcher they share, and the
//! router for inbound messages.

pub mod commands;
pub mod dispatcher;
pub mod recurrence;
pub mod rules;

pub use commands::{Command, InboundRouter};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use rules::{spawn_rule, spawn_silence_monitor, TickRule};
