use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle, time};

/// One-shot timer that delivers an input to a component after a delay.
///
/// Arming it again cancels the pending delivery, so a burst of triggers
/// results in a single input once things settle.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `input` through `sender` after `delay`, replacing any pending delivery.
    pub fn arm<T: Send + 'static>(
        &mut self,
        delay: Duration,
        sender: mpsc::UnboundedSender<T>,
        input: T,
    ) {
        self.cancel();

        self.pending = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            // The receiving component is gone; nothing to do.
            let _ = sender.send(input);
        }));
    }

    /// Drop the pending delivery, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    /// Whether a delivery is still waiting on its delay.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Get only the first name from a full name.
pub fn get_first_name(name: &str) -> &str {
    name.split_once(' ').map_or(name, |(first, _)| first)
}
