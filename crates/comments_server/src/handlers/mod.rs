pub mod auth;
pub mod comments;
pub mod health;
pub mod history;
pub mod users;
