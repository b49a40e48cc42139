use std::process::ExitCode;

use jobmail_email_lettre::LettreMailSender;
use jobmail_notify::{Notifier, NotifyError};
use log::{error, info};

use crate::config::{AppConfig, USAGE};

mod config;
mod job;
mod logs;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match AppConfig::load(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logs::init_logger(&config.log) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let notifier = match Notifier::new(
        config.recipients.clone(),
        config.sender.clone(),
        |sender| LettreMailSender::connect(sender, &config.smtp).map_err(NotifyError::from),
    ) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!("Failed to set up mail sender: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match job::run_command(&notifier, &config.job_name, &config.command) {
        Ok(outcome) => {
            info!("{} finished: {}", config.job_name, outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{} failed: {}", config.job_name, e);
            ExitCode::from(e.exit_code())
        }
    }
}
