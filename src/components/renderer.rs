//! Plain text rendering of the chat screen.

use std::{io, ops::Range};

use crate::{
    components::{
        ChatView, IndexPath, Row, Section,
        cell::{Body, MenuAction, Presentation, Side},
    },
    utils::get_first_name,
};

/// Writes chat rows as lines of text, one line per row.
#[derive(Debug)]
pub struct TextRenderer<W: io::Write> {
    out: W,
}

impl<W: io::Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Redraw every row.
    pub fn render_all(&mut self, view: &ChatView) -> io::Result<()> {
        let title = view.chat().map_or("", |chat| chat.get_name_or_jid());
        writeln!(self.out, "── {title} ──")?;

        for index in 0..view.section_count() {
            if let Ok(section) = Section::try_from(index) {
                self.render_rows(view, section, 0..view.row_count(index))?;
            }
        }

        Ok(())
    }

    /// Draw only the given rows of a section.
    pub fn render_rows(
        &mut self,
        view: &ChatView,
        section: Section,
        rows: Range<usize>,
    ) -> io::Result<()> {
        for row in rows {
            let line = format_row(view.row(IndexPath::new(section, row)));
            match section {
                Section::LoadPrevious => writeln!(self.out, "     {line}")?,
                Section::Messages => writeln!(self.out, "{row:>4} {line}")?,
            }
        }

        Ok(())
    }

    pub fn render_indicator(&mut self, loading: bool) -> io::Result<()> {
        writeln!(self.out, "     {}", indicator_text(loading))
    }

    pub fn render_menu(&mut self, row: usize, actions: &[MenuAction]) -> io::Result<()> {
        let titles: Vec<&str> = actions.iter().map(|a| a.title()).collect();
        writeln!(self.out, "menu {row}: {}", titles.join(" | "))
    }

    /// Free-form status line.
    pub fn note(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "* {text}")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

fn indicator_text(loading: bool) -> &'static str {
    if loading {
        "(loading earlier messages…)"
    } else {
        "(pull to load earlier messages)"
    }
}

/// Text of a single row.
pub fn format_row(row: Row<'_>) -> String {
    let (message, presentation) = match row {
        Row::LoadingIndicator { loading } => return indicator_text(loading).to_string(),
        Row::Message {
            message,
            presentation,
        } => (message, presentation),
    };

    let content = message.map_or("", |m| m.content.as_str());
    let sender = message
        .and_then(|m| m.sender.as_ref())
        .map_or("", |s| get_first_name(&s.name));

    match presentation {
        Presentation::Placeholder(placeholder) => placeholder.marker().to_string(),
        Presentation::SectionDate => {
            let date = message.map(|m| m.timestamp.format("%Y-%m-%d").to_string());
            format!("─── {} ───", date.unwrap_or_default())
        }
        Presentation::Prompt(prompt) => format!("[ {} ]", prompt.text()),
        Presentation::Text { side, body } => {
            let text = match body {
                Body::Content => content,
                Body::Caption(caption) => caption,
            };
            bubble(side, sender, text)
        }
        Presentation::Image { side } => bubble(side, sender, &format!("[image] {content}")),
    }
}

fn bubble(side: Side, sender: &str, text: &str) -> String {
    match side {
        Side::Left => format!("< {sender}: {text}"),
        Side::Right => format!("{text:>40} >"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        components::cell::{Placeholder, Prompt},
        state::{ChatMessage, Contact, Moderation},
        store::Database,
    };

    async fn message(sender: Option<&str>, content: &str) -> ChatMessage {
        ChatMessage {
            id: "m".into(),
            chat_jid: "c".into(),
            sender: sender.map(|name| Contact {
                jid: "s".into(),
                name: name.into(),
                is_me: false,
            }),
            media_type: "text".into(),
            content: content.into(),
            moderation: Moderation::default(),
            timestamp: Utc.with_ymd_and_hms(2016, 6, 16, 12, 0, 0).unwrap(),
            db: Arc::new(Database::in_memory().await.unwrap()),
        }
    }

    fn row(message: Option<&ChatMessage>, presentation: Presentation) -> String {
        format_row(Row::Message {
            message,
            presentation,
        })
    }

    #[tokio::test]
    async fn formats_bubbles() {
        let message = message(Some("Ada Lovelace"), "hello").await;

        assert_eq!(
            row(
                Some(&message),
                Presentation::Text {
                    side: Side::Left,
                    body: Body::Content
                }
            ),
            "< Ada: hello"
        );
        assert_eq!(
            row(
                Some(&message),
                Presentation::Text {
                    side: Side::Left,
                    body: Body::Caption("Mysterious Audio")
                }
            ),
            "< Ada: Mysterious Audio"
        );
        assert!(
            row(Some(&message), Presentation::Image { side: Side::Right })
                .ends_with("[image] hello >")
        );
    }

    #[tokio::test]
    async fn formats_markers_and_prompts() {
        let message = message(None, "").await;

        assert_eq!(
            row(Some(&message), Presentation::SectionDate),
            "─── 2016-06-16 ───"
        );
        assert_eq!(
            row(Some(&message), Presentation::Prompt(Prompt::Recalled)),
            "[ The message was recalled ]"
        );
        assert_eq!(
            row(None, Presentation::Placeholder(Placeholder::Missing)),
            "🐌🐌🐌"
        );
        assert_eq!(
            format_row(Row::LoadingIndicator { loading: true }),
            "(loading earlier messages…)"
        );
    }

    #[test]
    fn writes_menus() {
        let mut renderer = TextRenderer::new(Vec::new());
        renderer
            .render_menu(3, &[MenuAction::Hide, MenuAction::Report])
            .unwrap();
        renderer.render_indicator(false).unwrap();

        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(
            text,
            "menu 3: Hide | Report\n     (pull to load earlier messages)\n"
        );
    }
}
