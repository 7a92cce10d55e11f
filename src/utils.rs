use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};

/// Terminal logger bootstrap. Call once at program start; repeated calls are
/// ignored (the first installed logger wins).
pub fn init_logger(loglevel: &str) {
    let log_option = match loglevel {
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" | "none" => return,
        _ => LevelFilter::Info,
    };
    let _ = CombinedLogger::init(vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
