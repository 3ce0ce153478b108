pub mod discounts;

pub use discounts::DiscountService;
