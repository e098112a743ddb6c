//! Cast channel that writes receiver messages to the log instead of a network
//! session. Useful for checking what a receiver would be told.

use soundscape_core::playback::CastChannel;
use soundscape_core::Result;

pub struct LoggingCastChannel;

impl CastChannel for LoggingCastChannel {
    fn is_connected(&self) -> bool {
        true
    }

    fn send_message(&self, namespace: &str, message: &str) -> Result<()> {
        tracing::info!(target: "cast", "[{}] {}", namespace, message);
        Ok(())
    }
}
