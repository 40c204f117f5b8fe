//! # vigil-domain
//!
//! Pure domain model for the vigil event automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Events** (rules → verdict → notifications → actions) and the
//!   timing state they carry: sequence thresholding, backoff, rule reset
//! - Define **Rules**, **Actions** and **Notifications** as closed sum types
//! - Define the **logical combinators** aggregating rule outcomes
//! - Define **snapshots** persisted across restarts and the reported **status**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod event;
pub mod logic;
pub mod manager;
pub mod media;
pub mod mode;
pub mod notification;
pub mod pattern;
pub mod rule;
pub mod template;
pub mod trigger_record;
