use strum::{AsRefStr, EnumString, IntoStaticStr};

/// Kind of content carried by a message.
///
/// Persisted as snake case text (`"section_date"`, `"social_work"`, ...).
#[derive(AsRefStr, Clone, Copy, Debug, EnumString, Eq, Hash, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    /// Plain text.
    Text,
    /// Image (tap to preview).
    Image,
    /// Video.
    Video,
    /// Voice or audio clip.
    Audio,
    /// Sticker.
    Sticker,
    /// Shared location.
    Location,
    /// Synthetic day separator, not user content.
    SectionDate,
    /// Shared social work (e.g. a post from a linked account).
    SocialWork,
    /// Shared feed.
    ShareFeed,
}

impl MediaKind {
    /// Persisted name of the kind.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Fixed caption for kinds the chat screen can't render inline yet.
    pub const fn placeholder_caption(self) -> Option<&'static str> {
        match self {
            Self::Audio => Some("Mysterious Audio"),
            Self::Video => Some("Mysterious Video"),
            Self::Location => Some("Mysterious Location"),
            Self::SocialWork => Some("Mysterious SocialWork"),
            Self::Text | Self::Image | Self::Sticker | Self::SectionDate | Self::ShareFeed => None,
        }
    }

    /// Whether rows of this kind are user content rather than synthetic markers.
    pub const fn is_real(self) -> bool {
        !matches!(self, Self::SectionDate)
    }
}
