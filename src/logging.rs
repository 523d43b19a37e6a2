use crate::error::ConfigError;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Installs the process-wide logger: the log4rs file at `config_file` when
/// given, otherwise a stderr logger at `level`.
pub fn init_logging(level: &str, config_file: Option<&Path>) -> Result<(), ConfigError> {
    if let Some(path) = config_file {
        return log4rs::init_file(path, Default::default())
            .map_err(|e| ConfigError::Logging(format!("{}: {}", path.display(), e)));
    }

    let level: LevelFilter = level
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", level)))?;
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| ConfigError::Logging(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| ConfigError::Logging(e.to_string()))?;
    Ok(())
}
