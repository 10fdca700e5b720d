pub mod events;
pub mod queue;
pub mod task;
pub mod transfer;
