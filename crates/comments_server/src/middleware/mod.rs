pub mod jwt;
pub mod timing;
