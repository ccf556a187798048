pub mod dispatcher;
pub mod display;
pub mod focus_cycler;
pub mod launcher;
pub mod reconciler;
pub mod registry;
pub mod window_group;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::Dispatcher;
pub use display::create_display_backend;
pub use launcher::create_launcher;
pub use registry::Registry;
