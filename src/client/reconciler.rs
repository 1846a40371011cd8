//! Decides whether an inbound socket message is applied to local editor state.
//!
//! Two conditions drive suppression: a local edit happened whose inbound
//! counterpart must be skipped once ("skip armed"), and this client just
//! broadcast content so the next inbound message is its own echo. Both are
//! folded into [`EchoState`]:
//!
//! | state                         | event                | result                                   |
//! |-------------------------------|----------------------|------------------------------------------|
//! | `Idle`                        | local edit           | `AwaitingSkip`                           |
//! | `AwaitingEcho { .. }`         | local edit           | `AwaitingEcho { skip_armed: true }`      |
//! | `Idle`                        | broadcast sent       | `AwaitingEcho { skip_armed: false }`     |
//! | `AwaitingSkip`                | broadcast sent       | `AwaitingEcho { skip_armed: true }`      |
//! | `AwaitingEcho { skip_armed }` | content / title      | dropped, then `AwaitingSkip` or `Idle`   |
//! | `AwaitingEcho { skip_armed }` | active_users         | applied, then `AwaitingSkip` or `Idle`   |
//! | `AwaitingSkip`                | content              | dropped, then `Idle`                     |
//! | `AwaitingSkip`                | title / active_users | applied, stays `AwaitingSkip`            |
//! | `Idle`                        | content / title      | applied if different from local          |
//!
//! The echo is recognised by position, not by content: any peer update that
//! arrives while awaiting the echo is consumed as if it were the echo.

use tracing::debug;

use crate::models::{ActiveUser, SyncMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoState {
    #[default]
    Idle,
    /// A local edit is pending; the next inbound content update is skipped.
    AwaitingSkip,
    /// This client broadcast content; the next inbound message is its echo.
    AwaitingEcho { skip_armed: bool },
}

impl EchoState {
    fn skip_armed(self) -> bool {
        matches!(self, EchoState::AwaitingSkip | EchoState::AwaitingEcho { skip_armed: true })
    }

    fn with_skip(skip_armed: bool) -> Self {
        if skip_armed {
            EchoState::AwaitingSkip
        } else {
            EchoState::Idle
        }
    }
}

/// Local view of the document the editor renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    pub content: String,
    pub title: String,
    pub roster: Vec<ActiveUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// Consumed as this client's own broadcast coming back.
    Echo,
    /// Consumed by the skip armed on a local edit.
    LocalEdit,
}

/// Outcome of reconciling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    ContentApplied(String),
    TitleApplied(String),
    RosterReplaced(Vec<ActiveUser>),
    /// Update equal to local state; nothing to render.
    Unchanged,
    Suppressed(Suppression),
}

#[derive(Debug, Default)]
pub struct UpdateReconciler {
    state: EchoState,
    editor: EditorState,
}

impl UpdateReconciler {
    pub fn new(editor: EditorState) -> Self {
        Self { state: EchoState::Idle, editor }
    }

    pub fn echo_state(&self) -> EchoState {
        self.state
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    /// Replace local content and title from a loaded snapshot. Suppression
    /// state is left alone.
    pub fn load(&mut self, content: String, title: String) {
        self.editor.content = content;
        self.editor.title = title;
    }

    /// The user changed the content locally.
    pub fn record_local_edit(&mut self, content: String) {
        self.editor.content = content;
        self.arm_skip();
    }

    /// The user changed the title locally. Title edits don't arm suppression.
    pub fn record_local_title(&mut self, title: String) {
        self.editor.title = title;
    }

    /// Skip the next inbound content update (manual save path).
    pub fn arm_skip(&mut self) {
        self.state = match self.state {
            EchoState::Idle | EchoState::AwaitingSkip => EchoState::AwaitingSkip,
            EchoState::AwaitingEcho { .. } => EchoState::AwaitingEcho { skip_armed: true },
        };
    }

    /// A debounced content broadcast just went out.
    pub fn mark_broadcast_sent(&mut self) {
        self.state = EchoState::AwaitingEcho { skip_armed: self.state.skip_armed() };
    }

    /// Decide on one inbound message and update local state accordingly.
    pub fn apply(&mut self, msg: SyncMessage) -> Reconciliation {
        match self.state {
            EchoState::AwaitingEcho { skip_armed } => {
                self.state = EchoState::with_skip(skip_armed);
                match msg {
                    SyncMessage::ActiveUsers(m) => self.replace_roster(m.users),
                    other => {
                        debug!("Dropping {} as own echo", other.kind());
                        Reconciliation::Suppressed(Suppression::Echo)
                    }
                }
            }
            EchoState::AwaitingSkip => match msg {
                SyncMessage::ContentUpdate(_) => {
                    debug!("Dropping content_update, local edit pending");
                    self.state = EchoState::Idle;
                    Reconciliation::Suppressed(Suppression::LocalEdit)
                }
                SyncMessage::TitleUpdate(m) => self.apply_title(m.title),
                SyncMessage::ActiveUsers(m) => self.replace_roster(m.users),
            },
            EchoState::Idle => match msg {
                SyncMessage::ContentUpdate(m) => {
                    if m.content == self.editor.content {
                        Reconciliation::Unchanged
                    } else {
                        self.editor.content = m.content.clone();
                        Reconciliation::ContentApplied(m.content)
                    }
                }
                SyncMessage::TitleUpdate(m) => self.apply_title(m.title),
                SyncMessage::ActiveUsers(m) => self.replace_roster(m.users),
            },
        }
    }

    /// Forget pending suppression, e.g. after the channel was re-established.
    pub fn reset(&mut self) {
        self.state = EchoState::Idle;
    }

    fn apply_title(&mut self, title: String) -> Reconciliation {
        if title == self.editor.title {
            Reconciliation::Unchanged
        } else {
            self.editor.title = title.clone();
            Reconciliation::TitleApplied(title)
        }
    }

    fn replace_roster(&mut self, users: Vec<ActiveUser>) -> Reconciliation {
        self.editor.roster = users.clone();
        Reconciliation::RosterReplaced(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn reconciler(content: &str) -> UpdateReconciler {
        UpdateReconciler::new(EditorState {
            content: content.to_string(),
            title: "Untitled Document".to_string(),
            roster: Vec::new(),
        })
    }

    fn user(id: &str) -> ActiveUser {
        ActiveUser { session_id: Uuid::new_v4(), user_id: id.to_string(), name: None, attached_at: Utc::now() }
    }

    #[test]
    fn test_remote_content_applied_when_idle() {
        let mut r = reconciler("old");
        assert_eq!(
            r.apply(SyncMessage::content_update("new")),
            Reconciliation::ContentApplied("new".to_string())
        );
        assert_eq!(r.editor().content, "new");
        assert_eq!(r.apply(SyncMessage::content_update("new")), Reconciliation::Unchanged);
    }

    #[test]
    fn test_own_echo_is_not_reapplied() {
        let mut r = reconciler("");
        r.record_local_edit("Hello".to_string());
        r.mark_broadcast_sent();
        assert_eq!(r.echo_state(), EchoState::AwaitingEcho { skip_armed: true });

        assert_eq!(
            r.apply(SyncMessage::content_update("Hello")),
            Reconciliation::Suppressed(Suppression::Echo)
        );
        // The echo consumed the broadcast flag but not the pending skip
        assert_eq!(r.echo_state(), EchoState::AwaitingSkip);
        assert_eq!(
            r.apply(SyncMessage::content_update("peer")),
            Reconciliation::Suppressed(Suppression::LocalEdit)
        );
        assert_eq!(r.echo_state(), EchoState::Idle);
        assert_eq!(r.editor().content, "Hello");
    }

    #[test]
    fn test_broadcast_without_pending_edit() {
        let mut r = reconciler("x");
        r.mark_broadcast_sent();
        assert_eq!(r.echo_state(), EchoState::AwaitingEcho { skip_armed: false });
        assert_eq!(
            r.apply(SyncMessage::title_update("echoed")),
            Reconciliation::Suppressed(Suppression::Echo)
        );
        assert_eq!(r.echo_state(), EchoState::Idle);
        assert_eq!(r.editor().title, "Untitled Document");
    }

    #[test]
    fn test_edit_while_awaiting_echo_arms_skip() {
        let mut r = reconciler("");
        r.mark_broadcast_sent();
        r.record_local_edit("typing".to_string());
        assert_eq!(r.echo_state(), EchoState::AwaitingEcho { skip_armed: true });
    }

    #[test]
    fn test_title_applied_while_skip_armed() {
        let mut r = reconciler("");
        r.record_local_edit("draft".to_string());
        assert_eq!(
            r.apply(SyncMessage::title_update("Plans")),
            Reconciliation::TitleApplied("Plans".to_string())
        );
        assert_eq!(r.echo_state(), EchoState::AwaitingSkip);
        assert_eq!(r.apply(SyncMessage::title_update("Plans")), Reconciliation::Unchanged);
    }

    #[test]
    fn test_roster_always_replaced() {
        let mut r = reconciler("");
        let roster = vec![user("a"), user("b")];
        r.mark_broadcast_sent();
        assert_eq!(
            r.apply(SyncMessage::active_users(roster.clone())),
            Reconciliation::RosterReplaced(roster.clone())
        );
        // A roster message still counts as the awaited inbound message
        assert_eq!(r.echo_state(), EchoState::Idle);

        r.record_local_edit("x".to_string());
        assert_eq!(
            r.apply(SyncMessage::active_users(Vec::new())),
            Reconciliation::RosterReplaced(Vec::new())
        );
        assert_eq!(r.echo_state(), EchoState::AwaitingSkip);
        assert!(r.editor().roster.is_empty());
    }

    #[test]
    fn test_local_title_does_not_arm_suppression() {
        let mut r = reconciler("");
        r.record_local_title("Mine".to_string());
        assert_eq!(r.echo_state(), EchoState::Idle);
        assert_eq!(r.editor().title, "Mine");
    }

    #[test]
    fn test_manual_save_arms_skip_and_reset_clears() {
        let mut r = reconciler("");
        r.arm_skip();
        assert_eq!(r.echo_state(), EchoState::AwaitingSkip);
        r.reset();
        assert_eq!(r.echo_state(), EchoState::Idle);
    }
}
