pub mod config;
pub mod event;
pub mod linker;
pub mod notifier;
