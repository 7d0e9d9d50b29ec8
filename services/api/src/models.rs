//! API models for stored records and request/response payloads

pub mod comment;
pub mod post;
pub mod user;

pub use comment::{Comment, CreateCommentRequest, NewComment};
pub use post::{
    CreatePostRequest, FeedItem, NewPost, Post, PostAuthor, PostWithComments, UpdatePostRequest,
};
pub use user::{Role, User};
