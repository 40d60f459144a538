//! Utilities module - text helpers, calendar windows and phonics hints

pub mod calendar;
pub mod phonics;
pub mod text_utils;

pub use calendar::{month_range, week_range};
pub use phonics::phonics_hint;
pub use text_utils::TextUtils;
