pub mod comment_service;
pub mod community_service;
pub mod feed_service;
pub mod notification_service;
pub mod password_reset_service;
pub mod post_service;
pub mod rate_limit_service;
pub mod search_service;
pub mod session_service;
pub mod user_service;
pub mod vote_service;

#[cfg(test)]
pub(crate) mod test_support;
