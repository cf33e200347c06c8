pub mod agency;
pub mod catalog;
pub mod notification;
pub mod occurrence;
pub mod password_reset;
pub mod user;
