pub mod auth;
pub mod comments;
pub mod communities;
pub mod feeds;
pub mod health;
pub mod notifications;
pub mod posts;
pub mod search;
pub mod users;
