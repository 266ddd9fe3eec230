use uuid::Uuid;

use crate::types::{ConversationListing, Message, MessageSummary, PushEvent};

/// The thread currently on screen: the counterpart and the loaded messages,
/// oldest first.
#[derive(Debug, Clone)]
pub struct OpenThread {
    pub counterpart_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub messages: Vec<Message>,
}

/// Follow-up IO the session needs after applying a push. The state machine
/// itself never performs IO; the owner executes these against `ChatApi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Acknowledge the open thread's conversation (the counterpart gets a
    /// read receipt).
    MarkRead { conversation_id: Uuid },
    /// Local state cannot be reconciled incrementally (e.g. first message of
    /// a brand-new conversation); refetch GET /conversations.
    RefreshInbox,
}

/// Local reconciliation state: the inbox list and, when a thread is open,
/// its message list. Socket pushes patch this state; REST fetches replace it
/// wholesale and are always authoritative.
#[derive(Debug)]
pub struct ChatSession {
    user_id: Uuid,
    inbox: Vec<ConversationListing>,
    open_thread: Option<OpenThread>,
}

impl ChatSession {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            inbox: Vec::new(),
            open_thread: None,
        }
    }

    pub fn inbox(&self) -> &[ConversationListing] {
        &self.inbox
    }

    pub fn open_thread(&self) -> Option<&OpenThread> {
        self.open_thread.as_ref()
    }

    /// Replace the inbox with a REST result (authoritative).
    pub fn set_inbox(&mut self, listings: Vec<ConversationListing>) {
        self.inbox = listings;
    }

    /// Open a thread from a REST history refetch (authoritative; socket
    /// messages accumulated while the thread was closed are discarded).
    pub fn open_thread_with(&mut self, counterpart_id: Uuid, history: Vec<Message>) {
        let conversation_id = history.first().map(|m| m.conversation_id);
        self.open_thread = Some(OpenThread {
            counterpart_id,
            conversation_id,
            messages: history,
        });
    }

    pub fn close_thread(&mut self) {
        self.open_thread = None;
    }

    /// Record a message the local user just sent through REST.
    pub fn record_sent(&mut self, message: Message) {
        if let Some(thread) = self.open_thread.as_mut() {
            if thread.counterpart_id == message.recipient_id {
                thread.conversation_id.get_or_insert(message.conversation_id);
                thread.messages.push(message);
            }
        }
    }

    /// Apply one pushed event, returning whatever follow-up IO is needed.
    pub fn apply(&mut self, event: PushEvent) -> Vec<SessionCommand> {
        match event {
            PushEvent::ReceiveMessage { message, .. } => self.apply_receive(message),
            PushEvent::ConversationUpdated {
                conversation_id,
                last_message,
                unread_count,
            } => self.apply_conversation_updated(conversation_id, last_message, unread_count),
            PushEvent::MessagesRead {
                conversation_id,
                read_by,
            } => {
                self.apply_messages_read(conversation_id, read_by);
                Vec::new()
            }
        }
    }

    fn apply_receive(&mut self, message: Message) -> Vec<SessionCommand> {
        // A message from the open thread's counterpart lands on screen and
        // is acknowledged immediately.
        if let Some(thread) = self.open_thread.as_mut() {
            if thread.counterpart_id == message.sender_id {
                let conversation_id = message.conversation_id;
                thread.conversation_id.get_or_insert(conversation_id);
                thread.messages.push(message);
                return vec![SessionCommand::MarkRead { conversation_id }];
            }
        }

        // Otherwise it only bumps the badge; an unknown conversation means
        // this is the first message of a new pairing and the inbox must be
        // refetched.
        match self
            .inbox
            .iter_mut()
            .find(|c| c.conversation_id == message.conversation_id)
        {
            Some(listing) => {
                listing.unread_count += 1;
                Vec::new()
            }
            None => vec![SessionCommand::RefreshInbox],
        }
    }

    fn apply_conversation_updated(
        &mut self,
        conversation_id: Uuid,
        last_message: MessageSummary,
        unread_count: i64,
    ) -> Vec<SessionCommand> {
        match self
            .inbox
            .iter()
            .position(|c| c.conversation_id == conversation_id)
        {
            Some(pos) => {
                let mut listing = self.inbox.remove(pos);
                listing.last_message = Some(last_message);
                listing.unread_count = unread_count;
                listing.updated_at = chrono::Utc::now();
                // Most recently active first.
                self.inbox.insert(0, listing);
                Vec::new()
            }
            None => vec![SessionCommand::RefreshInbox],
        }
    }

    /// The counterpart read our messages: flip receipts on everything we
    /// sent them in that conversation.
    fn apply_messages_read(&mut self, conversation_id: Uuid, read_by: Uuid) {
        if let Some(thread) = self.open_thread.as_mut() {
            if thread.conversation_id == Some(conversation_id) {
                for message in thread
                    .messages
                    .iter_mut()
                    .filter(|m| m.sender_id == self.user_id && m.recipient_id == read_by)
                {
                    message.is_read = true;
                }
            }
        }
    }
}
