//! Reusable UI components

pub mod cell;
mod chat_view;
mod renderer;

use tokio::sync::mpsc;

pub use chat_view::{ChatView, ChatViewInput, ChatViewOutput, IndexPath, Row, ScrollState, Section};
pub use renderer::TextRenderer;

/// Handle a component uses to queue inputs to itself and emit outputs to its parent.
#[derive(Debug)]
pub struct ComponentSender<I, O> {
    input: mpsc::UnboundedSender<I>,
    output: mpsc::UnboundedSender<O>,
}

impl<I, O> Clone for ComponentSender<I, O> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
            output: self.output.clone(),
        }
    }
}

impl<I, O> ComponentSender<I, O> {
    /// Create a sender along with the receiving ends of its input and output queues.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<I>, mpsc::UnboundedReceiver<O>) {
        let (input, input_rx) = mpsc::unbounded_channel();
        let (output, output_rx) = mpsc::unbounded_channel();

        (Self { input, output }, input_rx, output_rx)
    }

    /// Emit an output to the parent.
    pub fn output(&self, msg: O) -> Result<(), O> {
        self.output.send(msg).map_err(|e| e.0)
    }

    /// Raw input queue, for tasks that feed the component later on.
    pub fn input_sender(&self) -> &mpsc::UnboundedSender<I> {
        &self.input
    }
}
