use std::{
    fmt,
    process::{Command, ExitStatus},
};

use jobmail_notify::{MailSender, Notifier, NotifyError};
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("no command given")]
    EmptyCommand,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed with {0}")]
    Exit(ExitStatus),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl RunError {
    /// Exit code for the `jobmail` process itself.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Exit(status) => status
                .code()
                .and_then(|code| u8::try_from(code).ok())
                .filter(|code| *code != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

/// A finished child process. Its `Display` text is what the DONE mail reports.
#[derive(Debug)]
pub struct CommandOutcome {
    pub status: ExitStatus,
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)
    }
}

pub fn run_command<M: MailSender>(
    notifier: &Notifier<M>,
    job_name: &str,
    command: &[String],
) -> Result<CommandOutcome, RunError> {
    let (program, args) = command.split_first().ok_or(RunError::EmptyCommand)?;
    notifier.run_display(job_name, || {
        info!("Running {}", job_name);
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;
        if status.success() {
            Ok(CommandOutcome { status })
        } else {
            Err(RunError::Exit(status))
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use jobmail_notify::{NotificationKind, SendMailError};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<Mutex<Vec<(NotificationKind, Vec<String>)>>>,
    }

    impl MailSender for RecordingSender {
        fn send(
            &self,
            _recipient: &str,
            kind: NotificationKind,
            contents: &[String],
        ) -> Result<(), SendMailError> {
            self.sent.lock().unwrap().push((kind, contents.to_vec()));
            Ok(())
        }
    }

    fn notifier(sender: &RecordingSender) -> Notifier<RecordingSender> {
        let sender = sender.clone();
        Notifier::new(vec!["a@x.com".to_string()], None, move |_| {
            Ok::<_, NotifyError>(sender)
        })
        .unwrap()
        .with_rank_source(|| None)
    }

    fn command(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_command() {
        let sender = RecordingSender::default();
        let result = run_command(&notifier(&sender), "nothing", &[]);
        assert!(matches!(result, Err(RunError::EmptyCommand)));
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_program_reports_crash() {
        let sender = RecordingSender::default();
        let result = run_command(
            &notifier(&sender),
            "ghost",
            &command(&["jobmail-definitely-not-a-program"]),
        );
        assert!(matches!(result, Err(RunError::Spawn { .. })));

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0, NotificationKind::Crashed);
        assert!(sent[1].1[5].contains("jobmail-definitely-not-a-program"));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_command() {
        let sender = RecordingSender::default();
        let outcome = run_command(&notifier(&sender), "ok", &command(&["true"])).unwrap();
        assert!(outcome.status.success());

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, NotificationKind::Started);
        assert_eq!(sent[1].0, NotificationKind::Done);
        assert_eq!(sent[1].1[1], "ok");
        assert_eq!(sent[1].1[5], outcome.status.to_string());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command() {
        let sender = RecordingSender::default();
        let result = run_command(&notifier(&sender), "fail", &command(&["sh", "-c", "exit 3"]));
        let err = result.unwrap_err();
        assert!(matches!(err, RunError::Exit(_)));
        assert_eq!(err.exit_code(), 3);

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[1].0, NotificationKind::Crashed);
        assert!(sent[1].1[5].contains('3'));
    }
}
