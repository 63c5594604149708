pub mod arg;
pub mod queue;
