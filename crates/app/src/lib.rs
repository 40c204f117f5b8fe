//! # vigil-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - resource ports (`Camera`, `Vision`, `GenericResource`, `SmsTransport`,
//!     `NotificationTransport`, `VideoStore`) reached by name through a
//!     [`ResourceTable`](resource_table::ResourceTable)
//!   - `StateStore`: persist event snapshots
//!   - `TriggerHistory`: append & query past triggers
//!   - `WebhookClient`: fire-and-forget HTTP GET
//! - Run events:
//!   - `rules`: evaluate one rule against live resources
//!   - `actions` / `notifier`: side effects of a trigger
//!   - `event_loop`: the per-event state machine task
//!   - `supervisor`: `EventManager`, the host-facing entry point
//! - Provide **in-process infrastructure** (trigger bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `vigil-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actions;
pub mod event_bus;
pub mod event_loop;
pub mod notifier;
pub mod ports;
pub mod resource_table;
pub mod rules;
pub mod supervisor;

#[cfg(test)]
mod testing;
