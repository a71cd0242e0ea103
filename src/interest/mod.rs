pub mod accrual;
pub mod cache;
pub mod compound;

pub use accrual::AccrualEngine;
pub use cache::{ScheduleCache, ScheduleKey};
pub use compound::{compound_growth, compound_interest, simple_interest};
