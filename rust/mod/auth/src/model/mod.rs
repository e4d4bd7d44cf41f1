mod account;
mod session;
mod user;

pub use account::*;
pub use session::*;
pub use user::*;
