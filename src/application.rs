use std::io;

use tokio::sync::mpsc;

use crate::{
    components::{
        ChatView, ChatViewInput, ChatViewOutput, ComponentSender, TextRenderer,
        cell::MenuAction,
    },
    config::ChatViewSettings,
    store::Database,
};

/// Drives the chat screen: applies inputs one at a time and renders its outputs.
pub struct Application<W: io::Write> {
    db: Database,
    view: ChatView,
    sender: ComponentSender<ChatViewInput, ChatViewOutput>,
    inputs: mpsc::UnboundedReceiver<ChatViewInput>,
    outputs: mpsc::UnboundedReceiver<ChatViewOutput>,
    renderer: TextRenderer<W>,
}

impl<W: io::Write> Application<W> {
    pub fn new(db: Database, settings: ChatViewSettings, out: W) -> Self {
        let (sender, inputs, outputs) = ComponentSender::channel();
        let view = ChatView::new(settings, sender.clone());

        Self {
            db,
            view,
            sender,
            inputs,
            outputs,
            renderer: TextRenderer::new(out),
        }
    }

    /// Queue for feeding the screen from other tasks.
    pub fn input_sender(&self) -> mpsc::UnboundedSender<ChatViewInput> {
        self.sender.input_sender().clone()
    }

    /// Run until the screen is closed.
    pub async fn run(mut self) -> io::Result<W> {
        loop {
            tokio::select! {
                // Render pending outputs before taking the next input.
                biased;

                Some(output) = self.outputs.recv() => self.handle_output(output).await?,
                Some(input) = self.inputs.recv() => {
                    let closing = matches!(input, ChatViewInput::Close);
                    self.view.update(input).await;

                    if closing {
                        break;
                    }
                }
                else => break,
            }
        }

        while let Ok(output) = self.outputs.try_recv() {
            self.handle_output(output).await?;
        }
        self.renderer.flush()?;

        Ok(self.renderer.into_inner())
    }

    async fn handle_output(&mut self, output: ChatViewOutput) -> io::Result<()> {
        match output {
            ChatViewOutput::Reload => self.renderer.render_all(&self.view)?,
            ChatViewOutput::ScrollToBottom => {
                tracing::trace!("Scrolled to row {}", self.view.window().len().saturating_sub(1));
            }
            ChatViewOutput::RowsInserted { section, rows } => {
                self.renderer.render_rows(&self.view, section, rows)?;
            }
            ChatViewOutput::LoadingIndicator(loading) => self.renderer.render_indicator(loading)?,
            ChatViewOutput::PreviewMedia { message_id } => {
                self.renderer.note(&format!("preview {message_id}"))?;
            }
            ChatViewOutput::Menu { row, actions } => self.renderer.render_menu(row, &actions)?,
            ChatViewOutput::ActionRequested { message_id, action } => {
                self.perform(&message_id, action).await;
            }
        }

        self.renderer.flush()
    }

    /// Apply a menu action to the store, then let the screen catch up with it.
    async fn perform(&mut self, message_id: &str, action: MenuAction) {
        let result = match action {
            MenuAction::Recall => self.db.mark_recalled(message_id).await,
            MenuAction::Hide | MenuAction::Delete => self.db.delete_message(message_id).await,
            MenuAction::Report => {
                match self.db.load_message(message_id).await {
                    Ok(Some(message)) => {
                        let sender = message.sender.as_ref().map_or("unknown", |s| s.jid.as_str());
                        tracing::info!("Reported message {message_id} from {sender}");
                    }
                    Ok(None) => tracing::warn!("Reported message {message_id} is gone"),
                    Err(e) => tracing::error!("Failed to load reported message {message_id}: {e}"),
                }
                return;
            }
        };

        match result {
            Ok(()) => self.view.update(ChatViewInput::StoreChanged).await,
            Err(e) => tracing::error!("Failed to {} message {message_id}: {e}", action.title()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::{
        components::{ScrollState, cell::ClassifyOptions},
        state::Chat,
        store::fixtures::{CHAT, seeded},
    };

    fn settings() -> ChatViewSettings {
        ChatViewSettings {
            page_size: std::num::NonZeroUsize::new(3).unwrap(),
            ..ChatViewSettings::default()
        }
    }

    async fn run(db: Database, inputs: Vec<ChatViewInput>) -> String {
        run_with(db, settings(), inputs).await
    }

    async fn run_with(
        db: Database,
        settings: ChatViewSettings,
        inputs: Vec<ChatViewInput>,
    ) -> String {
        let app = Application::new(db.clone(), settings, Vec::new());
        let tx = app.input_sender();

        tx.send(ChatViewInput::Open(Chat {
            jid: CHAT.into(),
            name: "Alice".into(),
            last_message_time: Utc::now(),
            db: Arc::new(db),
        }))
        .unwrap();
        for input in inputs {
            tx.send(input).unwrap();
        }
        tx.send(ChatViewInput::Close).unwrap();

        String::from_utf8(app.run().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn renders_open_chat() {
        let out = run(seeded(5).await, Vec::new()).await;
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "── Alice ──");
        assert_eq!(lines[1], "     (pull to load earlier messages)");
        assert_eq!(lines.len(), 5);
        assert!(lines[2].starts_with("   0 < Alice: content of m002"));
    }

    #[tokio::test]
    async fn renders_only_inserted_rows() {
        let out = run(seeded(5).await, vec![ChatViewInput::LoadPrevious]).await;
        let inserted: Vec<&str> = out.lines().skip(5).collect();

        assert_eq!(inserted.len(), 3);
        assert!(inserted[0].starts_with("   0 < Alice: content of m000"));
        assert!(inserted[1].ends_with("content of m001 >"));
        assert_eq!(inserted[2], "     (pull to load earlier messages)");
    }

    #[tokio::test]
    async fn hiding_removes_the_row() {
        let db = seeded(3).await;
        let out = run(
            db.clone(),
            vec![ChatViewInput::PerformAction {
                row: 0,
                action: MenuAction::Hide,
            }],
        )
        .await;

        assert_eq!(db.count_messages(CHAT).await.unwrap(), 2);

        let redraw = last_redraw(&out);
        assert_eq!(redraw.len(), 4);
        assert!(redraw[2].contains("content of m001"));
        assert!(redraw[3].contains("content of m002"));
        assert!(!redraw.iter().any(|l| l.contains("content of m000")));
    }

    #[tokio::test]
    async fn recalling_redraws_the_prompt() {
        let db = seeded(3).await;
        let settings = ChatViewSettings {
            classify: ClassifyOptions {
                recall_prompt_for_own_messages: true,
            },
            ..settings()
        };
        let out = run_with(
            db.clone(),
            settings,
            vec![ChatViewInput::PerformAction {
                row: 1,
                action: MenuAction::Recall,
            }],
        )
        .await;

        let recalled = db.load_message("m001").await.unwrap().unwrap();
        assert!(recalled.moderation.deleted_by_creator);

        let redraw = last_redraw(&out);
        assert_eq!(redraw.len(), 5);
        assert_eq!(redraw[3], "   1 [ The message was recalled ]");
        assert!(redraw[2].contains("content of m000"));
    }

    /// Lines of the last full redraw.
    fn last_redraw(out: &str) -> Vec<&str> {
        let lines: Vec<&str> = out.lines().collect();
        let start = lines.iter().rposition(|l| l.starts_with("── ")).unwrap();
        assert!(start > 0, "expected a redraw after the first render");
        lines[start..].to_vec()
    }

    #[tokio::test(start_paused = true)]
    async fn scrolling_is_ignored_after_close() {
        let out = run(
            seeded(5).await,
            vec![ChatViewInput::Scrolled(ScrollState {
                at_top: true,
                dragging: true,
                decelerating: false,
            })],
        )
        .await;

        assert!(out.lines().any(|l| l.contains("loading earlier")));
        assert!(!out.lines().any(|l| l.contains("content of m000")));
    }
}
