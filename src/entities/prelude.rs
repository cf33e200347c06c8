pub use super::agencies::Entity as Agencies;
pub use super::coordinates::Entity as Coordinates;
pub use super::images::Entity as Images;
pub use super::notifications::Entity as Notifications;
pub use super::occurrence_statuses::Entity as OccurrenceStatuses;
pub use super::occurrences::Entity as Occurrences;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::profiles::Entity as Profiles;
pub use super::users::Entity as Users;
