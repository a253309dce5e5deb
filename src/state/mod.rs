mod chat;
mod contact;
mod media;
mod message;

pub use chat::Chat;
pub use contact::Contact;
pub use media::MediaKind;
pub use message::{Message as ChatMessage, Moderation};
