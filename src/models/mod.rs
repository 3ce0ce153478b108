// Core models
pub mod discount;

// Re-export commonly used types
pub use discount::{DiscountId, DiscountRecord, DiscountRegistry, DiscountStatus, DiscountType};
