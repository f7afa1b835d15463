pub mod classifier;
pub mod notifications;

pub use classifier::{classify, classify_engagement};
pub use notifications::{select_template, NotificationSelector, Selection};
