pub mod comment;
pub mod community;
pub mod notification;
pub mod password_reset;
pub mod post;
pub mod report;
pub mod user;
pub mod vote;

pub use comment::*;
pub use community::*;
pub use notification::*;
pub use password_reset::*;
pub use post::*;
pub use report::*;
pub use user::*;
pub use vote::*;
