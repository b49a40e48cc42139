use thiserror::Error;

pub mod context;
pub mod mail;
pub mod notifier;
pub mod role;

pub use context::NotificationContext;
pub use mail::{MailSender, NotificationKind, SendMailError};
pub use notifier::Notifier;
pub use role::{ProcessRole, RANK_ENV_VAR};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("no sender address given and the recipient list is empty")]
    MissingSender,

    #[error("invalid RANK value: {0:?}")]
    InvalidRank(String),

    #[error(transparent)]
    Mail(#[from] SendMailError),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
