//! Client-side domain logic.
//!
//! Date conversion to and from the API's time unit, fallback ordering of
//! result sets, overdue evaluation for tasks, and automated-booking detection
//! for meetings. Nothing here performs I/O.

pub mod automated_meetings;
pub mod dates;
pub mod overdue;
pub mod sorting;

pub use automated_meetings::{exclude_automated_bookings, is_automated_booking};
pub use dates::{parse_remote_timestamp, DateConverter};
pub use overdue::{AnnotatedTask, OverdueAnnotation, OverdueCalculator, TaskStatus};
pub use sorting::SortFallback;
