pub mod email;
pub mod storage;

pub use email::{
    mailer_from_config, password_reset_email, verification_email, LogMailer, MailError, Mailer, OutgoingMail, SmtpMailer,
};
pub use storage::{ByteStream, FileStorage, LocalFileStorage, StorageError};
