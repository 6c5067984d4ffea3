pub mod recurring;
pub mod scheduling_loop;

pub use recurring::RecurringTaskManager;
pub use scheduling_loop::{SchedulingLoop, TickReport};
