use std::{
    any::Any,
    fmt::{Debug, Display},
    panic::{self, AssertUnwindSafe},
};

use chrono::Local;
use log::{debug, error, info, warn};

use crate::{
    NotificationContext, NotifyError, NotifyResult,
    context::{render_display, render_value},
    mail::{MailSender, NotificationKind},
    role::{ProcessRole, read_rank_env},
};

const UNKNOWN_HOST: &str = "unknown";

type RankSource = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Wraps jobs and emails their recipients when a job starts, finishes, or crashes.
///
/// The mail sender is created once, bound to the sender address, and reused
/// for every wrapped invocation.
pub struct Notifier<M: MailSender> {
    mail_sender: M,
    sender_email: String,
    recipients: Vec<String>,
    crashes_from_all_ranks: bool,
    rank_source: RankSource,
}

impl<M: MailSender> Notifier<M> {
    /// Builds a notifier for `recipients`. When `sender_email` is `None`, the
    /// first recipient sends the messages. `connect` receives the resolved
    /// sender address and is called exactly once.
    pub fn new<F, E>(
        recipients: Vec<String>,
        sender_email: Option<String>,
        connect: F,
    ) -> Result<Self, E>
    where
        F: FnOnce(&str) -> Result<M, E>,
        E: From<NotifyError>,
    {
        let sender_email = match sender_email {
            Some(sender) => sender,
            None => recipients
                .first()
                .cloned()
                .ok_or(NotifyError::MissingSender)?,
        };
        let mail_sender = connect(&sender_email)?;
        info!(
            "Job notifications from {} to {} recipient(s)",
            sender_email,
            recipients.len()
        );
        Ok(Self {
            mail_sender,
            sender_email,
            recipients,
            crashes_from_all_ranks: false,
            rank_source: Box::new(read_rank_env),
        })
    }

    /// Lets non-master ranks report their own crashes. Off by default.
    pub fn report_crashes_from_all_ranks(mut self, enabled: bool) -> Self {
        self.crashes_from_all_ranks = enabled;
        self
    }

    /// Replaces the `RANK` environment lookup.
    pub fn with_rank_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.rank_source = Box::new(source);
        self
    }

    pub fn sender_email(&self) -> &str {
        &self.sender_email
    }

    /// Runs `job` under notification.
    ///
    /// The job's `Ok` value and `Err` value are returned unchanged. Mail and
    /// `RANK` failures are converted into `E`. A panicking job is reported as
    /// crashed and the panic is resumed with its original payload.
    pub fn run<T, E, F>(&self, func_name: &str, job: F) -> Result<T, E>
    where
        T: Debug,
        E: Display + From<NotifyError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.run_rendered(func_name, job, render_value::<T>)
    }

    /// Like [`Notifier::run`], but the DONE mail shows the value's `Display`
    /// text instead of its `Debug` output.
    pub fn run_display<T, E, F>(&self, func_name: &str, job: F) -> Result<T, E>
    where
        T: Display,
        E: Display + From<NotifyError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.run_rendered(func_name, job, render_display::<T>)
    }

    fn run_rendered<T, E, F, R>(&self, func_name: &str, job: F, render: R) -> Result<T, E>
    where
        E: Display + From<NotifyError>,
        F: FnOnce() -> Result<T, E>,
        R: FnOnce(&T) -> String,
    {
        let started_at = Local::now();
        let role = self.resolve_role()?;
        let host = role.annotate_host(&host_name());
        let mut ctx = NotificationContext::new(host, func_name, started_at);
        let master = role.is_master();
        let report_crash = master || self.crashes_from_all_ranks;

        if master {
            self.broadcast(NotificationKind::Started, &ctx.started_lines())?;
        } else {
            debug!("Skipping notifications for {} on non-master {:?}", func_name, role);
        }

        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(value)) => {
                if master {
                    ctx.complete(render(&value));
                    self.broadcast(NotificationKind::Done, &ctx.finished_lines())?;
                }
                Ok(value)
            }
            Ok(Err(err)) => {
                if report_crash {
                    ctx.complete(err.to_string());
                    self.broadcast(NotificationKind::Crashed, &ctx.finished_lines())?;
                }
                Err(err)
            }
            Err(payload) => {
                if report_crash {
                    ctx.complete(panic_message(payload.as_ref()));
                    let lines = ctx.finished_lines();
                    if let Err(e) = self.broadcast(NotificationKind::Crashed, &lines) {
                        error!("Failed to report panic in {}: {}", func_name, e);
                    }
                }
                panic::resume_unwind(payload)
            }
        }
    }

    /// Returns `func` wrapped so that every call goes through [`Notifier::run`].
    pub fn wrap<'a, A, T, E, F>(
        &'a self,
        func_name: impl Into<String>,
        func: F,
    ) -> impl Fn(A) -> Result<T, E> + 'a
    where
        T: Debug,
        E: Display + From<NotifyError>,
        F: Fn(A) -> Result<T, E> + 'a,
    {
        let func_name = func_name.into();
        move |args| self.run(&func_name, || func(args))
    }

    fn resolve_role(&self) -> NotifyResult<ProcessRole> {
        let raw = (self.rank_source)();
        ProcessRole::from_rank(raw.as_deref())
    }

    fn broadcast(&self, kind: NotificationKind, contents: &[String]) -> NotifyResult<()> {
        info!(
            "Sending {} notification to {} recipient(s)",
            kind,
            self.recipients.len()
        );
        for recipient in &self.recipients {
            debug!("Sending {} to {}", kind, recipient);
            self.mail_sender.send(recipient, kind, contents)?;
        }
        Ok(())
    }
}

fn host_name() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("Failed to resolve host name: {}", e);
            UNKNOWN_HOST.to_string()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic".to_string()
    }
}
