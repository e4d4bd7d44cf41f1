mod contract;
mod dashboard;
mod purchase_order;

pub use contract::*;
pub use dashboard::*;
pub use purchase_order::*;
