//! Mapping of message records to the cell style they render as.

use crate::state::{ChatMessage, Contact, MediaKind, Moderation};

/// Which side of the conversation a bubble sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Incoming.
    Left,
    /// Outgoing.
    Right,
}

/// What a text bubble shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Body {
    /// The message's own content.
    Content,
    /// A fixed caption standing in for media the screen can't render inline.
    Caption(&'static str),
}

/// Why a row fell back to a placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placeholder {
    /// No message at the row's position (e.g. deleted concurrently).
    Missing,
    /// The stored media kind isn't one we know.
    UndecodableMedia,
    /// Sender is unknown and nothing else explains the message.
    UnknownSender,
}

impl Placeholder {
    /// Marker text, distinct per reason so rows can be told apart when debugging.
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Missing => "🐌🐌🐌",
            Self::UndecodableMedia => "🐌🐌",
            Self::UnknownSender => "🐌",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prompt {
    /// The recipient has blocked us.
    BlockedByRecipient,
    /// The sender withdrew the message.
    Recalled,
}

impl Prompt {
    pub const fn text(self) -> &'static str {
        match self {
            Self::BlockedByRecipient => "Message was rejected by the recipient",
            Self::Recalled => "The message was recalled",
        }
    }
}

/// Cell style chosen for a message row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presentation {
    Placeholder(Placeholder),
    /// Day separator.
    SectionDate,
    Prompt(Prompt),
    Text { side: Side, body: Body },
    /// Image bubble, tap to preview.
    Image { side: Side },
}

impl Presentation {
    /// Whether tapping the row opens a media preview.
    pub const fn is_previewable(self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// Knobs for [`classify`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Show the recalled prompt for our own withdrawn messages too.
    ///
    /// Off by default: only incoming messages are checked.
    pub recall_prompt_for_own_messages: bool,
}

/// Pick the cell style for the message at some row, `None` if the row
/// didn't resolve to a message.
pub fn classify(message: Option<&ChatMessage>, options: ClassifyOptions) -> Presentation {
    let Some(message) = message else {
        return Presentation::Placeholder(Placeholder::Missing);
    };

    classify_parts(
        message.media_kind(),
        message.sender.as_ref(),
        message.moderation,
        options,
    )
}

/// Pick the cell style from the parts of a message. First matching rule wins.
pub fn classify_parts(
    kind: Result<MediaKind, strum::ParseError>,
    sender: Option<&Contact>,
    moderation: Moderation,
    options: ClassifyOptions,
) -> Presentation {
    let Ok(kind) = kind else {
        return Presentation::Placeholder(Placeholder::UndecodableMedia);
    };

    if kind == MediaKind::SectionDate {
        return Presentation::SectionDate;
    }

    let Some(sender) = sender else {
        return if moderation.blocked_by_recipient {
            Presentation::Prompt(Prompt::BlockedByRecipient)
        } else {
            Presentation::Placeholder(Placeholder::UnknownSender)
        };
    };

    let check_recall = !sender.is_me || options.recall_prompt_for_own_messages;
    if check_recall && moderation.deleted_by_creator {
        return Presentation::Prompt(Prompt::Recalled);
    }

    let side = if sender.is_me { Side::Right } else { Side::Left };
    bubble(kind, side)
}

fn bubble(kind: MediaKind, side: Side) -> Presentation {
    match kind {
        MediaKind::Image => Presentation::Image { side },
        kind => Presentation::Text {
            side,
            body: kind.placeholder_caption().map_or(Body::Content, Body::Caption),
        },
    }
}

/// Action offered in a message's context menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    /// Withdraw our own message.
    Recall,
    /// Hide someone else's message locally.
    Hide,
    /// Report someone else's message.
    Report,
    /// Remove a row we can't display.
    Delete,
}

impl MenuAction {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Recall => "Recall",
            Self::Hide => "Hide",
            Self::Report => "Report",
            Self::Delete => "Delete",
        }
    }
}

/// Context menu for the message at some row, `None` when the row has no menu.
pub fn menu_for(message: Option<&ChatMessage>) -> Option<Vec<MenuAction>> {
    let message = message.filter(|m| m.is_real())?;

    let actions = if message.media_kind().is_err() {
        vec![MenuAction::Delete]
    } else if message.is_outgoing() {
        vec![MenuAction::Recall]
    } else {
        vec![MenuAction::Hide, MenuAction::Report]
    };

    Some(actions)
}
