pub mod composer;
pub mod sm2;

pub use composer::{compose_queue, plan_session, ComposedQueue, SessionPlan};
pub use sm2::{calculate_sm2, review_item, Sm2Result};
