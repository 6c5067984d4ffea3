pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use ports::*;
pub use scheduler_errors::{SchedulerError, SchedulerResult};
pub use services::*;
pub use value_objects::*;
