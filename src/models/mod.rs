pub mod comment;
pub mod post;
pub mod submission;
pub mod vote;

pub use comment::*;
pub use post::*;
pub use submission::*;
pub use vote::*;
