//! Database models.

pub mod comment;
pub mod post;
pub mod user;

pub use comment::{Comment, CommentWithAuthor, CreateComment};
pub use post::{AuthorInfo, CreatePost, DEFAULT_CATEGORY, Post, PostWithAuthor, SlugTaken};
pub use user::{CreateUser, User};
