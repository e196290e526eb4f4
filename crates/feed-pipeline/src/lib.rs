//! Feed assembly: merge live and snapshot pools, then filter, sort, and
//! categorize ranked opportunities into the displayed view model.

pub mod display;
pub mod merge;
pub mod pipeline;

pub use display::{
    deadline_info, filter_by_tab, is_new, normalize_apply_url, sort_opportunities,
    DeadlineInfo, DeadlineUrgency, FeedTab, SortKey,
};
pub use merge::{identity_key, merge};
pub use pipeline::{process, FeedBuckets, FeedFilter, FeedView, LocationScope};

pub use matching_core::days_until_deadline;
