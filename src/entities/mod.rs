pub mod prelude;

pub mod agencies;
pub mod coordinates;
pub mod images;
pub mod notifications;
pub mod occurrence_statuses;
pub mod occurrences;
pub mod password_reset_tokens;
pub mod profiles;
pub mod users;
