//! Single source of truth for conversations and the active-conversation pointer.
//!
//! State is an immutable [`StoreSnapshot`] published through an [`ArcSwap`].
//! Every mutation builds a new snapshot from the current one and swaps it in
//! with read-copy-update, so readers never observe a half-applied change and
//! overlapping writers (e.g. a background reply and a user action) are applied
//! one after another.

use arc_swap::ArcSwap;
use chrono::Utc;
use std::sync::Arc;

use crate::error::StoreError;
use crate::state::{ChatMessage, Conversation, ConversationId, MessageId};

pub type StoreResult<T> = Result<T, StoreError>;

/// An immutable view of every conversation plus the active pointer
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Most recently created first
    pub conversations: Vec<Arc<Conversation>>,
    pub active: ConversationId,
}

impl StoreSnapshot {
    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id).map(|c| c.as_ref())
    }

    /// The active conversation. The store never publishes a snapshot whose
    /// active id is missing or whose list is empty.
    pub fn active(&self) -> &Conversation {
        self.get(self.active)
            .unwrap_or_else(|| self.conversations[0].as_ref())
    }

    pub fn position(&self, id: ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    fn edit(
        &self,
        id: ConversationId,
        f: impl FnOnce(&mut Conversation),
    ) -> StoreResult<StoreSnapshot> {
        let idx = self
            .position(id)
            .ok_or(StoreError::UnknownConversation(id))?;
        let mut next = self.clone();
        f(Arc::make_mut(&mut next.conversations[idx]));
        Ok(next)
    }
}

pub struct ConversationStore {
    state: ArcSwap<StoreSnapshot>,
}

impl ConversationStore {
    /// A store holding the single welcome conversation
    pub fn new() -> Self {
        Self::with_conversation(Conversation::welcome())
    }

    pub fn with_conversation(conversation: Conversation) -> Self {
        let snapshot = StoreSnapshot {
            active: conversation.id,
            conversations: vec![Arc::new(conversation)],
        };
        Self {
            state: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.state.load_full()
    }

    pub fn active_id(&self) -> ConversationId {
        self.state.load().active
    }

    pub fn conversation(&self, id: ConversationId) -> Option<Arc<Conversation>> {
        self.state
            .load()
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Insert a seeded conversation at the front and make it active
    pub fn create_conversation(&self) -> ConversationId {
        let conversation = Arc::new(Conversation::fresh());
        let id = conversation.id;
        self.state.rcu(|current| {
            let mut conversations = Vec::with_capacity(current.conversations.len() + 1);
            conversations.push(Arc::clone(&conversation));
            conversations.extend(current.conversations.iter().cloned());
            StoreSnapshot {
                conversations,
                active: id,
            }
        });
        tracing::debug!(conversation = %id, "conversation created");
        id
    }

    pub fn select_conversation(&self, id: ConversationId) -> StoreResult<()> {
        self.update(|current| {
            if current.position(id).is_none() {
                return Err(StoreError::UnknownConversation(id));
            }
            let mut next = current.clone();
            next.active = id;
            Ok((next, ()))
        })
    }

    /// Set the title; blank titles are ignored
    pub fn rename_conversation(&self, id: ConversationId, title: &str) -> StoreResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(());
        }
        self.update(|current| {
            let next = current.edit(id, |c| c.title = title.to_string())?;
            Ok((next, ()))
        })
    }

    /// Remove a conversation. When the active one goes, the new first entry
    /// becomes active; when none remain, a fresh conversation is created.
    pub fn delete_conversation(&self, id: ConversationId) -> StoreResult<()> {
        let replacement = Arc::new(Conversation::fresh());
        self.update(|current| {
            let idx = current
                .position(id)
                .ok_or(StoreError::UnknownConversation(id))?;
            let mut conversations = current.conversations.clone();
            conversations.remove(idx);
            if conversations.is_empty() {
                conversations.push(Arc::clone(&replacement));
            }
            let active = if current.active == id {
                conversations[0].id
            } else {
                current.active
            };
            Ok((StoreSnapshot { conversations, active }, ()))
        })?;
        tracing::debug!(conversation = %id, "conversation deleted");
        Ok(())
    }

    /// Append to a conversation's transcript, active or not
    pub fn append_message(&self, id: ConversationId, message: ChatMessage) -> StoreResult<()> {
        self.update(|current| {
            let next = current.edit(id, |c| {
                c.messages.push(message.clone());
                c.updated_at = Utc::now();
            })?;
            Ok((next, ()))
        })
    }

    /// Concatenate onto the last message's content. The caller guarantees the
    /// last message is the reply being filled in.
    pub fn update_last_message_content(
        &self,
        id: ConversationId,
        appended: &str,
    ) -> StoreResult<()> {
        self.update(|current| {
            let next = current.edit(id, |c| {
                if let Some(last) = c.messages.last_mut() {
                    last.content.push_str(appended);
                }
            })?;
            Ok((next, ()))
        })
    }

    /// Mark a conversation as streaming. Returns false, changing nothing, if
    /// it already was.
    pub fn try_begin_streaming(&self, id: ConversationId) -> StoreResult<bool> {
        self.update(|current| {
            let conversation = current.get(id).ok_or(StoreError::UnknownConversation(id))?;
            if conversation.streaming {
                return Ok((current.clone(), false));
            }
            let next = current.edit(id, |c| c.streaming = true)?;
            Ok((next, true))
        })
    }

    pub fn finish_streaming(&self, id: ConversationId) -> StoreResult<()> {
        self.update(|current| {
            let next = current.edit(id, |c| c.streaming = false)?;
            Ok((next, ()))
        })
    }

    pub fn set_session_id(&self, id: ConversationId, session_id: &str) -> StoreResult<()> {
        self.update(|current| {
            let next = current.edit(id, |c| c.session_id = Some(session_id.to_string()))?;
            Ok((next, ()))
        })
    }

    /// Content of one message, for the clipboard
    pub fn message_content(&self, id: ConversationId, message: MessageId) -> Option<String> {
        self.conversation(id)
            .and_then(|c| c.message(message).map(|m| m.content.clone()))
    }

    /// Content of the newest message, for "copy last"
    pub fn last_message_content(&self, id: ConversationId) -> Option<String> {
        self.conversation(id)
            .and_then(|c| c.last_message().map(|m| m.content.clone()))
    }

    /// Apply a fallible read-copy-update. `f` may run more than once when
    /// writers race, so it must not have side effects beyond its return value.
    fn update<T>(
        &self,
        mut f: impl FnMut(&StoreSnapshot) -> StoreResult<(StoreSnapshot, T)>,
    ) -> StoreResult<T> {
        let mut outcome = None;
        self.state.rcu(|current| match f(current.as_ref()) {
            Ok((next, value)) => {
                outcome = Some(Ok(value));
                Arc::new(next)
            }
            Err(err) => {
                outcome = Some(Err(err));
                Arc::clone(current)
            }
        });
        outcome.unwrap_or_else(|| unreachable!("rcu runs the update at least once"))
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChatRole, NEW_CHAT_GREETING, NEW_CHAT_TITLE, WELCOME_TITLE};

    #[test]
    fn starts_with_one_active_welcome_conversation() {
        let store = ConversationStore::new();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.conversations.len(), 1);
        assert_eq!(snapshot.active().title, WELCOME_TITLE);
        assert_eq!(snapshot.active().messages.len(), 1);
    }

    #[test]
    fn create_inserts_first_seeds_and_activates() {
        let store = ConversationStore::new();
        let first = store.active_id();
        let id = store.create_conversation();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.active, id);
        assert_eq!(snapshot.conversations[0].id, id);
        assert_eq!(snapshot.conversations[1].id, first);

        let created = snapshot.active();
        assert_eq!(created.title, NEW_CHAT_TITLE);
        assert_eq!(created.messages.len(), 1);
        assert_eq!(created.messages[0].role, ChatRole::Assistant);
        assert_eq!(created.messages[0].content, NEW_CHAT_GREETING);
    }

    #[test]
    fn select_switches_active_and_rejects_unknown_ids() {
        let store = ConversationStore::new();
        let first = store.active_id();
        store.create_conversation();

        store.select_conversation(first).unwrap();
        assert_eq!(store.active_id(), first);

        let missing = ConversationId::new();
        assert!(matches!(
            store.select_conversation(missing),
            Err(StoreError::UnknownConversation(id)) if id == missing
        ));
        assert_eq!(store.active_id(), first);
    }

    #[test]
    fn rename_trims_and_ignores_blank_titles() {
        let store = ConversationStore::new();
        let id = store.active_id();

        store.rename_conversation(id, "  Scholarships  ").unwrap();
        assert_eq!(store.conversation(id).unwrap().title, "Scholarships");

        store.rename_conversation(id, "   ").unwrap();
        assert_eq!(store.conversation(id).unwrap().title, "Scholarships");
    }

    #[test]
    fn deleting_active_conversation_picks_new_first() {
        let store = ConversationStore::new();
        let oldest = store.active_id();
        let middle = store.create_conversation();
        let newest = store.create_conversation();

        store.delete_conversation(newest).unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.conversations.len(), 2);
        assert_eq!(snapshot.active, middle);
        assert!(snapshot.get(snapshot.active).is_some());

        store.delete_conversation(oldest).unwrap();
        assert_eq!(store.active_id(), middle);
    }

    #[test]
    fn deleting_last_conversation_creates_a_fresh_one() {
        let store = ConversationStore::new();
        let only = store.active_id();

        store.delete_conversation(only).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.conversations.len(), 1);
        assert_ne!(snapshot.active, only);
        assert_eq!(snapshot.active().title, NEW_CHAT_TITLE);
        assert_eq!(snapshot.active().messages.len(), 1);
    }

    #[test]
    fn deleting_inactive_conversation_keeps_active() {
        let store = ConversationStore::new();
        let first = store.active_id();
        let second = store.create_conversation();

        store.delete_conversation(first).unwrap();
        assert_eq!(store.active_id(), second);
        assert!(store.delete_conversation(first).is_err());
    }

    #[test]
    fn append_targets_conversation_by_id_not_active() {
        let store = ConversationStore::new();
        let background = store.active_id();
        let foreground = store.create_conversation();

        store
            .append_message(background, ChatMessage::user("hello"))
            .unwrap();

        assert_eq!(store.conversation(background).unwrap().messages.len(), 2);
        assert_eq!(store.conversation(foreground).unwrap().messages.len(), 1);
        assert_eq!(store.active_id(), foreground);
    }

    #[test]
    fn update_last_message_concatenates() {
        let store = ConversationStore::new();
        let id = store.active_id();
        store.append_message(id, ChatMessage::assistant("")).unwrap();

        store.update_last_message_content(id, "He").unwrap();
        store.update_last_message_content(id, "llo").unwrap();

        assert_eq!(store.last_message_content(id).as_deref(), Some("Hello"));
    }

    #[test]
    fn streaming_flag_is_exclusive() {
        let store = ConversationStore::new();
        let id = store.active_id();

        assert!(store.try_begin_streaming(id).unwrap());
        assert!(!store.try_begin_streaming(id).unwrap());
        store.finish_streaming(id).unwrap();
        assert!(store.try_begin_streaming(id).unwrap());
    }

    #[test]
    fn snapshots_are_unaffected_by_later_writes() {
        let store = ConversationStore::new();
        let id = store.active_id();
        let before = store.snapshot();

        store.append_message(id, ChatMessage::user("later")).unwrap();

        assert_eq!(before.active().messages.len(), 1);
        assert_eq!(store.snapshot().active().messages.len(), 2);
    }

    #[test]
    fn message_content_accessors() {
        let store = ConversationStore::new();
        let id = store.active_id();
        let message = ChatMessage::user("copy me");
        let message_id = message.id;
        store.append_message(id, message).unwrap();

        assert_eq!(store.message_content(id, message_id).as_deref(), Some("copy me"));
        assert_eq!(store.message_content(id, MessageId::new()), None);
        assert_eq!(store.last_message_content(ConversationId::new()), None);
    }

    #[test]
    fn concurrent_appends_are_all_applied() {
        let store = Arc::new(ConversationStore::new());
        let id = store.active_id();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .append_message(id, ChatMessage::user(format!("{n}-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.conversation(id).unwrap().messages.len(), 1 + 8 * 25);
    }
}
