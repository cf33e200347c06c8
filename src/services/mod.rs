pub mod mailer;
pub use mailer::{LogMailer, MailError, Mailer, OutgoingMail, SmtpMailer, build_mailer};

pub mod storage;
pub use storage::{ImageStorage, ImageUpload, StorageError};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, Registration};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{AdminUserUpdate, ProfileUpdate, UserError, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod occurrence_service;
pub mod occurrence_service_impl;
pub use occurrence_service::{
    CreateOccurrence, OccurrenceError, OccurrenceService, UpdateOccurrence,
};
pub use occurrence_service_impl::SeaOrmOccurrenceService;
