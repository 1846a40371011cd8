pub mod health;
pub mod messages;
pub mod user;
pub mod document;
pub mod error;
pub mod diagnostics;

pub use health::*;
pub use messages::*;
pub use user::*;
pub use document::*;
pub use error::*;
pub use diagnostics::*;
