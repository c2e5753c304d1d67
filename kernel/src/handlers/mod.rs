//! Built-in task handlers (spec.md §4.6, §4.7).
//!
//! `article` is the exemplar pipeline; the rest are deliberately lighter
//! weight so the registry has something cheap to schedule alongside it.

pub mod article;
pub mod cover_image;
pub mod heartbeat;
pub mod http_check;
pub mod rss_watch;
pub mod trending_watch;
