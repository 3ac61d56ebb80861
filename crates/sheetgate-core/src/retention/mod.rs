mod schedule;
mod sweeper;
mod template;

pub use schedule::SweepScheduler;
pub use sweeper::{RetentionSweeper, SweepReport};
pub use template::{adjacent_periods, TemplatePattern};
