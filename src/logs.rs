use log::LevelFilter;
use log4rs::{
    Config,
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            RollingFileAppender,
            policy::compound::{
                CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
            },
        },
    },
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

use crate::config::{ConfigError, LogConfig};

const LOG_SIZE_LIMIT: u64 = 10 * 1024 * 1024; // 10 MB

const LOG_FILE_COUNT: u32 = 3;

pub fn init_logger(log_config: &LogConfig) -> Result<(), ConfigError> {
    let stderr_level = LevelFilter::Info;
    let file_level = LevelFilter::Debug;

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%m-%d %H:%M:%S)} {l} - {m}\n")))
        .build();

    let mut config = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(stderr_level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");

    if let (Some(file_path), Some(archive_pattern)) =
        (&log_config.file_path, &log_config.archive_pattern)
    {
        let trigger = SizeTrigger::new(LOG_SIZE_LIMIT);
        let roller = FixedWindowRoller::builder()
            .build(archive_pattern, LOG_FILE_COUNT)
            .map_err(|e| ConfigError::Logger(e.to_string()))?;
        let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

        let logfile = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d} {l} - {m}\n")))
            .build(file_path, Box::new(policy))
            .map_err(|e| ConfigError::Logger(e.to_string()))?;

        config = config.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(file_level)))
                .build("logfile", Box::new(logfile)),
        );
        root = root.appender("logfile");
    }

    let config = config
        .build(root.build(LevelFilter::Trace))
        .map_err(|e| ConfigError::Logger(e.to_string()))?;

    log4rs::init_config(config).map_err(|e| ConfigError::Logger(e.to_string()))?;
    Ok(())
}
