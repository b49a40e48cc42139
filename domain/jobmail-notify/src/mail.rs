use std::{fmt, sync::Arc};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Started,
    Done,
    Crashed,
}

impl NotificationKind {
    /// Subject tag used for the outgoing message.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Started => "STARTED",
            NotificationKind::Done => "DONE",
            NotificationKind::Crashed => "CRASHED",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMailError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("failed to send message: {0}")]
    Transport(String),
}

/// Delivers a single notification to a single recipient.
///
/// `contents` is rendered into the message body in order, one line each.
pub trait MailSender {
    fn send(
        &self,
        recipient: &str,
        kind: NotificationKind,
        contents: &[String],
    ) -> Result<(), SendMailError>;
}

impl<M: MailSender + ?Sized> MailSender for Arc<M> {
    fn send(
        &self,
        recipient: &str,
        kind: NotificationKind,
        contents: &[String],
    ) -> Result<(), SendMailError> {
        (**self).send(recipient, kind, contents)
    }
}

impl<M: MailSender + ?Sized> MailSender for Box<M> {
    fn send(
        &self,
        recipient: &str,
        kind: NotificationKind,
        contents: &[String],
    ) -> Result<(), SendMailError> {
        (**self).send(recipient, kind, contents)
    }
}


#[cfg(test)]
mod tests {
    use super::{mock::MockMailSender, *};

    #[test]
    fn test_subject_tags() {
        assert_eq!(NotificationKind::Started.to_string(), "STARTED");
        assert_eq!(NotificationKind::Done.to_string(), "DONE");
        assert_eq!(NotificationKind::Crashed.to_string(), "CRASHED");
    }

    #[test]
    fn test_shared_sender_forwards() {
        let mock = MockMailSender::default();
        let shared: Arc<dyn MailSender + Send + Sync> = Arc::new(mock.clone());
        shared
            .send("a@x.com", NotificationKind::Done, &["line".to_string()])
            .unwrap();
        let sent = mock.get_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "a@x.com");
        assert_eq!(sent[0].contents, vec!["line".to_string()]);
    }
}
