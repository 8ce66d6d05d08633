pub mod enums;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{OrderAction, OrderType};
pub use structs::{
    AccountInfo, AccountSummary, CashBalance, Order, OrderConfirmation, OrderSpec, Position,
};
