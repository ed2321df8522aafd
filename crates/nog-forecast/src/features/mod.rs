//! Feature engineering: technical indicators joined with macro data

pub mod frame;
pub mod indicators;

pub use frame::{FEATURE_COLUMNS, FeatureFrame, FeatureRow, LONGEST_WINDOW, build_feature_frame};
