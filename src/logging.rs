//! Console logging setup

use tracing::Level;

/// Maps `-v` occurrences to a max level. `quiet` wins over verbosity.
pub fn level_for(verbosity: u8, quiet: bool) -> Level {
    if quiet {
        return Level::WARN;
    }
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs a stdout fmt subscriber. Safe to call more than once; later
/// calls leave the first subscriber in place.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity, quiet))
        .with_target(false)
        .with_writer(std::io::stdout)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0, false), Level::INFO);
        assert_eq!(level_for(1, false), Level::DEBUG);
        assert_eq!(level_for(5, false), Level::TRACE);
        assert_eq!(level_for(2, true), Level::WARN);
    }
}
