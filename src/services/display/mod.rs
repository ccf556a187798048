//! DisplayBackend: responsibility and boundaries
//!
//! This module and its submodules are responsible ONLY for talking to the windowing
//! system: delivering hotkey and window lifecycle events, answering queries about
//! windows and activating them. It MUST NOT contain any window grouping or cycling
//! logic. All grouping decisions are made by Registry, FocusCycler and Reconciler.

mod dry_run;
mod r#trait;
mod x11;

pub use self::r#trait::{create_display_backend, DisplayBackend};
