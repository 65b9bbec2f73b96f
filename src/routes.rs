mod dashboard;
mod live;
mod reminders;
mod theme;

pub use dashboard::*;
pub use live::*;
pub use reminders::*;
pub use theme::*;
