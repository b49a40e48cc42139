use jobmail_email_lettre::{SmtpSecurity, SmtpSettings};
use thiserror::Error;

pub const USAGE: &str =
    "Usage: jobmail --to <addr>[,<addr>...] [--from <addr>] [--name <job name>] -- <command> [args...]";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing value for {0}")]
    MissingValue(String),

    #[error("unknown option: {0}")]
    UnknownFlag(String),

    #[error("no recipients given (use --to or JOBMAIL_RECIPIENTS)")]
    MissingRecipients,

    #[error("no command given")]
    MissingCommand,

    #[error("{0} env var not set")]
    MissingVar(String),

    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: String, value: String },

    #[error("failed to initialize logger: {0}")]
    Logger(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub to: Vec<String>,
    pub from: Option<String>,
    pub name: Option<String>,
    pub command: Vec<String>,
}

impl CliArgs {
    pub fn parse<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut cli = CliArgs::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--to" => {
                    let value = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    cli.to.extend(split_addresses(&value));
                }
                "--from" => cli.from = Some(flag_value(&arg, &mut args)?),
                "--name" => cli.name = Some(flag_value(&arg, &mut args)?),
                "--" => {
                    cli.command.extend(args.by_ref());
                }
                flag if flag.starts_with("--") => {
                    return Err(ConfigError::UnknownFlag(flag.to_string()));
                }
                _ => {
                    cli.command.push(arg.clone());
                    cli.command.extend(args.by_ref());
                }
            }
        }
        Ok(cli)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub file_path: Option<String>,
    pub archive_pattern: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub recipients: Vec<String>,
    pub sender: Option<String>,
    pub job_name: String,
    pub command: Vec<String>,
    pub smtp: SmtpSettings,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn load<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        Self::from_parts(CliArgs::parse(args)?, |name| std::env::var(name).ok())
    }

    /// Merges command line arguments with variables from `lookup`; flags win.
    pub fn from_parts<L>(cli: CliArgs, lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        if cli.command.is_empty() {
            return Err(ConfigError::MissingCommand);
        }

        let recipients = if cli.to.is_empty() {
            lookup("JOBMAIL_RECIPIENTS")
                .map(|value| split_addresses(&value))
                .unwrap_or_default()
        } else {
            cli.to
        };
        if recipients.is_empty() {
            return Err(ConfigError::MissingRecipients);
        }

        let sender = cli.from.or_else(|| lookup("JOBMAIL_SENDER"));
        let job_name = cli.name.unwrap_or_else(|| cli.command.join(" "));

        let mut smtp = SmtpSettings::default();
        if let Some(host) = lookup("JOBMAIL_SMTP_HOST") {
            smtp.host = host;
        }
        if let Some(port) = lookup("JOBMAIL_SMTP_PORT") {
            smtp.port = port.parse().map_err(|_| ConfigError::InvalidVar {
                name: "JOBMAIL_SMTP_PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(security) = lookup("JOBMAIL_SMTP_SECURITY") {
            smtp.security = security.parse().map_err(|_| ConfigError::InvalidVar {
                name: "JOBMAIL_SMTP_SECURITY".to_string(),
                value: security.clone(),
            })?;
        }
        smtp.username = lookup("JOBMAIL_SMTP_USER");
        smtp.password = lookup("JOBMAIL_SMTP_PASSWORD");
        if smtp.password.is_none() && smtp.security != SmtpSecurity::Plain {
            return Err(ConfigError::MissingVar("JOBMAIL_SMTP_PASSWORD".to_string()));
        }

        let file_path = lookup("JOBMAIL_LOG_FILE");
        let archive_pattern = lookup("JOBMAIL_LOG_ARCHIVE_PATTERN")
            .or_else(|| file_path.as_ref().map(|path| format!("{}.{{}}", path)));

        Ok(Self {
            recipients,
            sender,
            job_name,
            command: cli.command,
            smtp,
            log: LogConfig {
                file_path,
                archive_pattern,
            },
        })
    }
}

fn flag_value<I>(flag: &str, args: &mut I) -> Result<String, ConfigError>
where
    I: Iterator<Item = String>,
{
    args.next()
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn split_addresses(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}
