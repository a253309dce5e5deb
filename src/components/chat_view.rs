use std::ops::Range;

use indexmap::IndexMap;

use crate::{
    components::{
        ComponentSender,
        cell::{MenuAction, Presentation, classify, menu_for},
    },
    config::ChatViewSettings,
    state::{Chat, ChatMessage},
    utils::Debouncer,
    window::{LoadingState, MessageWindow, TailChange},
};

/// Logical groups of rows shown by the chat screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    /// A single row with the "load earlier messages" indicator.
    LoadPrevious = 0,
    /// One row per windowed message.
    Messages = 1,
}

impl TryFrom<usize> for Section {
    type Error = usize;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::LoadPrevious),
            1 => Ok(Self::Messages),
            other => Err(other),
        }
    }
}

/// Position of a row as the rendering side addresses it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    pub const fn new(section: Section, row: usize) -> Self {
        Self {
            section: section as usize,
            row,
        }
    }
}

/// Content of a single row.
#[derive(Clone, Copy, Debug)]
pub enum Row<'a> {
    LoadingIndicator {
        loading: bool,
    },
    Message {
        /// `None` when the row doesn't resolve to a stored message.
        message: Option<&'a ChatMessage>,
        presentation: Presentation,
    },
}

/// Scroll position report from the rendering side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollState {
    /// The top of the content is visible.
    pub at_top: bool,
    /// The user is dragging the list.
    pub dragging: bool,
    /// The list is still moving after a fling.
    pub decelerating: bool,
}

impl ScrollState {
    /// Whether this scroll should page in older messages.
    pub const fn wants_previous(self) -> bool {
        self.at_top && (self.dragging || self.decelerating)
    }
}

#[derive(Debug)]
pub enum ChatViewInput {
    /// Open a chat.
    Open(Chat),
    /// Close the open chat.
    Close,

    /// The list scrolled.
    Scrolled(ScrollState),
    /// Page in older messages. Queued by the scroll debounce timer.
    LoadPrevious,
    /// The message store changed under us.
    StoreChanged,

    /// The image of a message row was tapped.
    TapImage(usize),
    /// Long-press on a message row.
    ShowMenu(usize),
    /// A context menu action was picked.
    PerformAction { row: usize, action: MenuAction },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatViewOutput {
    /// Every row must be queried again.
    Reload,
    /// Scroll to the last message row.
    ScrollToBottom,
    /// New rows appeared; the rest keep their content.
    RowsInserted { section: Section, rows: Range<usize> },
    /// Start or stop the loading indicator row.
    LoadingIndicator(bool),

    /// Preview the media of a message.
    PreviewMedia { message_id: String },
    /// Show a context menu for a message row.
    Menu { row: usize, actions: Vec<MenuAction> },
    /// The user picked a context menu action on a message.
    ActionRequested { message_id: String, action: MenuAction },
}

/// Chat screen: a window over the open chat's messages, paged backward on demand.
#[derive(Debug)]
pub struct ChatView {
    settings: ChatViewSettings,
    sender: ComponentSender<ChatViewInput, ChatViewOutput>,

    /// Currently open chat.
    chat: Option<Chat>,
    /// Slice of the chat's messages on display.
    window: MessageWindow,
    /// Messages of the window, in window order.
    messages: IndexMap<String, ChatMessage>,

    /// Guards against overlapping backward loads.
    loading: LoadingState,
    /// Whether the indicator row is spinning.
    indicator: bool,
    /// Pending scroll-triggered load.
    load_previous_timer: Debouncer,
}

impl ChatView {
    pub fn new(
        settings: ChatViewSettings,
        sender: ComponentSender<ChatViewInput, ChatViewOutput>,
    ) -> Self {
        Self {
            settings,
            sender,

            chat: None,
            window: MessageWindow::default(),
            messages: IndexMap::new(),

            loading: LoadingState::Idle,
            indicator: false,
            load_previous_timer: Debouncer::new(),
        }
    }

    pub async fn update(&mut self, input: ChatViewInput) {
        match input {
            ChatViewInput::Open(chat) => self.open(chat).await,
            ChatViewInput::Close => self.close(),

            ChatViewInput::Scrolled(scroll) => self.scrolled(scroll),
            ChatViewInput::LoadPrevious => self.load_previous().await,
            ChatViewInput::StoreChanged => self.store_changed().await,

            ChatViewInput::TapImage(row) => {
                let message = self.message_at(row);
                if classify(message, self.settings.classify).is_previewable() {
                    if let Some(message) = message {
                        self.output(ChatViewOutput::PreviewMedia {
                            message_id: message.id.clone(),
                        });
                    }
                }
            }

            ChatViewInput::ShowMenu(row) => {
                if let Some(actions) = menu_for(self.message_at(row)) {
                    self.output(ChatViewOutput::Menu { row, actions });
                }
            }

            ChatViewInput::PerformAction { row, action } => {
                let message = self.message_at(row);
                let allowed = menu_for(message).is_some_and(|actions| actions.contains(&action));

                match message {
                    Some(message) if allowed => {
                        let message_id = message.id.clone();
                        self.output(ChatViewOutput::ActionRequested { message_id, action });
                    }
                    _ => tracing::warn!("{action:?} is not available for row {row}"),
                }
            }
        }
    }

    /// Currently open chat.
    pub fn chat(&self) -> Option<&Chat> {
        self.chat.as_ref()
    }

    pub fn window(&self) -> MessageWindow {
        self.window
    }

    /// Whether a backward load holds the latch.
    #[cfg(test)]
    pub fn is_loading_previous(&self) -> bool {
        self.loading.is_loading()
    }

    pub const fn section_count(&self) -> usize {
        2
    }

    pub fn row_count(&self, section: usize) -> usize {
        match Section::try_from(section) {
            Ok(Section::LoadPrevious) => 1,
            Ok(Section::Messages) => self.window.len(),
            Err(_) => 0,
        }
    }

    /// Content of a row.
    ///
    /// # Panics
    ///
    /// Panics if `index.section` isn't one of the [`Section`]s.
    pub fn row(&self, index: IndexPath) -> Row<'_> {
        let section = Section::try_from(index.section)
            .unwrap_or_else(|section| panic!("invalid section {section}"));

        match section {
            Section::LoadPrevious => Row::LoadingIndicator {
                loading: self.indicator,
            },
            Section::Messages => {
                let message = self.message_at(index.row);

                Row::Message {
                    message,
                    presentation: classify(message, self.settings.classify),
                }
            }
        }
    }

    /// Message shown at a row of the messages section.
    pub fn message_at(&self, row: usize) -> Option<&ChatMessage> {
        self.window.position_of(row)?;
        self.messages.get_index(row).map(|(_, message)| message)
    }

    fn output(&self, output: ChatViewOutput) {
        if let Err(output) = self.sender.output(output) {
            tracing::debug!("Dropped {output:?}, nobody is listening");
        }
    }

    fn set_indicator(&mut self, loading: bool) {
        self.indicator = loading;
        self.output(ChatViewOutput::LoadingIndicator(loading));
    }

    async fn open(&mut self, chat: Chat) {
        self.load_previous_timer.cancel();
        self.loading.finish();
        self.indicator = false;

        let total = chat.count_messages().await.unwrap_or_else(|e| {
            tracing::error!("Failed to count messages of {}: {e}", chat.jid);
            0
        });
        self.reload(&chat, MessageWindow::new(total, self.settings.page_size))
            .await;

        tracing::info!(
            "Opened {} with {} of {} messages",
            chat.jid,
            self.window.len(),
            self.window.total()
        );
        self.chat = Some(chat);

        if !self.window.is_empty() {
            self.output(ChatViewOutput::ScrollToBottom);
        }
    }

    fn close(&mut self) {
        if self.load_previous_timer.is_pending() {
            tracing::debug!("Dropping pending load of previous messages");
        }
        self.load_previous_timer.cancel();
        self.loading.finish();

        if let Some(chat) = self.chat.take() {
            tracing::info!("Closed {}", chat.jid);
        }
    }

    fn scrolled(&mut self, scroll: ScrollState) {
        if !scroll.wants_previous() {
            return;
        }

        if self.loading.is_loading() {
            self.set_indicator(false);
            return;
        }

        self.set_indicator(true);
        self.load_previous_timer.arm(
            self.settings.load_previous_delay,
            self.sender.input_sender().clone(),
            ChatViewInput::LoadPrevious,
        );
    }

    async fn load_previous(&mut self) {
        if !self.loading.try_begin() {
            self.set_indicator(false);
            return;
        }

        tracing::debug!("Loading previous messages");
        let inserted = self.expand_backward().await;
        if inserted > 0 {
            self.output(ChatViewOutput::RowsInserted {
                section: Section::Messages,
                rows: 0..inserted,
            });
        }

        self.loading.finish();
        self.set_indicator(false);
    }

    /// Grow the window by one page of older messages. Returns how many rows were added.
    ///
    /// The page is read together with the current first row. When that row moved,
    /// the store changed under the cached rows and the whole window is reloaded
    /// instead, returning `0`.
    async fn expand_backward(&mut self) -> usize {
        let Some(chat) = self.chat.clone() else {
            return 0;
        };

        if self.window.is_exhausted() {
            tracing::debug!("No previous messages left in {}", chat.jid);
            return 0;
        }
        let (window, added) = self.window.expand_backward(self.settings.page_size);

        let anchor = self.messages.first().map(|(id, _)| id.clone());
        let extra = usize::from(anchor.is_some());
        let mut older = match chat.load_range(window.offset(), added + extra).await {
            Ok(older) => older,
            Err(e) => {
                tracing::error!("Failed to load previous messages of {}: {e}", chat.jid);
                return 0;
            }
        };
        let edge = if older.len() > added {
            older.pop().map(|message| message.id)
        } else {
            None
        };

        if !self.is_complete()
            || edge != anchor
            || older.len() != added
            || older.iter().any(|m| self.messages.contains_key(&m.id))
        {
            tracing::warn!(
                "Previous messages of {} don't line up with the shown ones",
                chat.jid
            );
            self.resync(&chat, window).await;
            return 0;
        }

        let mut messages = index_messages(older);
        messages.extend(self.messages.drain(..));
        self.messages = messages;
        self.window = window;

        added
    }

    async fn store_changed(&mut self) {
        let Some(chat) = self.chat.clone() else {
            return;
        };

        let total = match chat.count_messages().await {
            Ok(total) => total,
            Err(e) => {
                tracing::error!("Failed to count messages of {}: {e}", chat.jid);
                return;
            }
        };

        let old = self.window;
        let (window, change) = old.sync_total(total);

        match change {
            TailChange::Appended(count) => {
                // Read the new rows along with the current last one.
                let anchor = self.messages.last().map(|(id, _)| id.clone());
                let extra = usize::from(anchor.is_some());
                let mut newer = self
                    .read(&chat, old.range().end - extra, count + extra)
                    .await;
                let tail = newer.split_off(extra.min(newer.len()));
                let edge = newer.pop().map(|message| message.id);

                if !self.is_complete()
                    || edge != anchor
                    || tail.len() != count
                    || tail.iter().any(|m| self.messages.contains_key(&m.id))
                {
                    tracing::debug!("New messages of {} don't line up with the tail", chat.jid);
                    self.reload(&chat, window).await;
                    return;
                }

                self.messages.extend(index_messages(tail));
                self.window = window;

                tracing::debug!("{count} new messages in {}", chat.jid);
                self.output(ChatViewOutput::RowsInserted {
                    section: Section::Messages,
                    rows: old.len()..window.len(),
                });
            }
            // Content may have changed in place.
            TailChange::Unchanged => self.reload(&chat, window).await,
            TailChange::Truncated(dropped) => {
                tracing::debug!("{dropped} rows of {} no longer fit the window", chat.jid);
                self.reload(&chat, window).await;
            }
        }
    }

    /// Whether every row of the window has its message cached.
    fn is_complete(&self) -> bool {
        self.messages.len() == self.window.len()
    }

    /// Re-count the store and reload `window` synced to it.
    async fn resync(&mut self, chat: &Chat, window: MessageWindow) {
        let window = match chat.count_messages().await {
            Ok(total) => window.sync_total(total).0,
            Err(e) => {
                tracing::error!("Failed to count messages of {}: {e}", chat.jid);
                window
            }
        };

        self.reload(chat, window).await;
    }

    /// Replace the cached rows with a fresh read of `window`.
    async fn reload(&mut self, chat: &Chat, window: MessageWindow) {
        self.window = window;
        self.messages = index_messages(self.read(chat, window.offset(), window.len()).await);
        if !self.is_complete() {
            tracing::warn!(
                "Expected {} messages in {}, store returned {}",
                window.len(),
                chat.jid,
                self.messages.len()
            );
        }

        self.output(ChatViewOutput::Reload);
    }

    /// Read a range of the chat, logging failures as an empty read.
    async fn read(&self, chat: &Chat, offset: usize, limit: usize) -> Vec<ChatMessage> {
        chat.load_range(offset, limit).await.unwrap_or_else(|e| {
            tracing::error!("Failed to load messages of {}: {e}", chat.jid);
            Vec::new()
        })
    }
}

fn index_messages(messages: Vec<ChatMessage>) -> IndexMap<String, ChatMessage> {
    messages.into_iter().map(|m| (m.id.clone(), m)).collect()
}
