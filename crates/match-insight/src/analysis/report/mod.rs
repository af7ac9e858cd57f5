mod comparison;
mod progress;
mod trends;
pub mod views;

pub use comparison::{
    build_comparison, clamp_limit, history_entries, DEFAULT_COMPARISON_LIMIT,
    DEFAULT_HISTORY_LIMIT, MAX_LIMIT,
};
pub use progress::build_progress;
pub use trends::build_trends;
