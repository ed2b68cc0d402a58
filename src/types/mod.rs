pub mod event;
pub mod pitch;
