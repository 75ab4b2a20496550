pub mod gateway;
pub mod listener;
pub mod media;
pub mod notifier;
