use log::{debug, error, info, warn};

/// Routes pipeline messages to the `log` facade.
///
/// Per-node detail goes to `info` only when `verbose` is set, otherwise to
/// `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogManager {
    verbose: bool,
}

impl LogManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn record(&self, message: &str) {
        info!("{}", message);
    }

    pub fn detail(&self, message: &str) {
        if self.verbose {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        warn!("{}", message);
    }

    pub fn failure(&self, message: &str) {
        error!("{}", message);
    }
}
