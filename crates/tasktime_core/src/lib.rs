pub mod domain;
pub mod duration;
pub mod ports;
pub mod title;

pub use domain::{ManualEntry, Project, Task, TaskStatus, TimeEntry};
pub use duration::{format_clock, format_human, parse_clock};
pub use ports::{PortError, PortResult, SessionService, TimeTrackingBackend};
pub use title::{resolve_title, TaskTitles, UNTITLED_TASK};
