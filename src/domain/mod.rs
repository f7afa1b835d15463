pub mod activity;
pub mod item;
pub mod notification;
pub mod summary;

pub use activity::{DailyActivityRecord, EngagementTier};
pub use item::{ReviewItem, ReviewQuality};
pub use notification::{NotificationTemplate, TemplatePatch};
pub use summary::SessionSummary;
