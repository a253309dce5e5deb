/// A resolved message sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    /// JID (Jabbed ID) - unique contact identifier.
    pub jid: String,
    /// Display name.
    pub name: String,
    /// Whether this contact is the current user.
    pub is_me: bool,
}
