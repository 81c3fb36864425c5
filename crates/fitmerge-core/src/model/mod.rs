//! Value types for backups and the records they carry.

pub mod backup;
pub mod entity;
pub mod timestamp;

pub use backup::{Backup, TimeRange, UndefinedTimeRange};
pub use entity::{
    Activity, ActivityId, CompletedActivity, CompletedActivityId, Duration, Intensity, Record,
    Shortcut, Trainable, TrainableId, Training, TrainingActivity, TrainingId,
};
pub use timestamp::{Timestamp, TimestampError, format_timestamp, parse_timestamp};
