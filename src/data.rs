mod check_outcome;
mod source_id;
mod time_calc;
pub mod send_channels;

pub use check_outcome::CheckOutcome;
pub use send_channels::{PublishReceivers, PublishSenders};
pub use source_id::{SourceId, MAX_SOURCES};
pub use time_calc::TimeCalc;

pub(crate) const CROSS_MARK: &str = "❌";
