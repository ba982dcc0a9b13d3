use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// An authenticated session as issued by the auth service's token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now.timestamp())
    }
}

struct Listener {
    id: u64,
    /// Cleared by the owning `Subscription` on drop, even mid-notification.
    active: Rc<Cell<bool>>,
    callback: Box<dyn FnMut(Option<&Session>)>,
}

#[derive(Default)]
struct AuthState {
    session: Option<Session>,
    listeners: Vec<Listener>,
    next_listener: u64,
}

/// The signed-in user, shared by everything that renders or scopes tasks.
///
/// Cloning shares the same state; `set_session` notifies every subscriber.
#[derive(Clone, Default)]
pub struct AuthContext {
    state: Rc<RefCell<AuthState>>,
}

impl AuthContext {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            state: Rc::new(RefCell::new(AuthState {
                session,
                ..AuthState::default()
            })),
        }
    }

    pub fn signed_out() -> Self {
        Self::new(None)
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.state
            .borrow()
            .session
            .as_ref()
            .map(|s| s.user_id().clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().session.is_some()
    }

    pub fn set_session(&self, session: Option<Session>) {
        let mut listeners = {
            let mut state = self.state.borrow_mut();
            state.session = session.clone();
            std::mem::take(&mut state.listeners)
        };

        // Listeners run without the borrow held so they may read the context.
        for listener in &mut listeners {
            if listener.active.get() {
                (listener.callback)(session.as_ref());
            }
        }

        let mut state = self.state.borrow_mut();
        listeners.append(&mut state.listeners);
        listeners.retain(|listener| listener.active.get());
        state.listeners = listeners;
    }

    pub fn on_session_change(&self, listener: impl FnMut(Option<&Session>) + 'static) -> Subscription {
        let mut state = self.state.borrow_mut();
        let id = state.next_listener;
        state.next_listener += 1;
        let active = Rc::new(Cell::new(true));
        state.listeners.push(Listener {
            id,
            active: Rc::clone(&active),
            callback: Box::new(listener),
        });
        Subscription {
            state: Rc::downgrade(&self.state),
            id,
            active,
        }
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("AuthContext")
            .field("session", &state.session)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

/// Detaches its listener when dropped.
pub struct Subscription {
    state: Weak<RefCell<AuthState>>,
    id: u64,
    active: Rc<Cell<bool>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.set(false);
        if let Some(state) = self.state.upgrade()
            && let Ok(mut state) = state.try_borrow_mut()
        {
            state.listeners.retain(|listener| listener.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user: &str) -> Session {
        Session {
            access_token: format!("token-{user}"),
            refresh_token: None,
            expires_at: None,
            user: User {
                id: UserId::new(user),
                email: Some(format!("{user}@example.com")),
            },
        }
    }

    #[test]
    fn set_session_notifies_subscribers() {
        let auth = AuthContext::signed_out();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = auth.on_session_change(move |s| {
            sink.borrow_mut().push(s.map(|s| s.user_id().to_string()));
        });

        auth.set_session(Some(session("u1")));
        auth.set_session(None);

        assert_eq!(*seen.borrow(), vec![Some("u1".to_string()), None]);
        assert!(!auth.is_signed_in());
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let auth = AuthContext::signed_out();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let sub = auth.on_session_change(move |_| *sink.borrow_mut() += 1);

        auth.set_session(Some(session("u1")));
        sub.unsubscribe();
        auth.set_session(None);

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn listener_dropping_its_own_subscription_detaches() {
        let auth = AuthContext::signed_out();
        let count = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&count);
        let own = Rc::clone(&slot);
        let sub = auth.on_session_change(move |_| {
            sink.set(sink.get() + 1);
            drop(own.borrow_mut().take());
        });
        *slot.borrow_mut() = Some(sub);

        auth.set_session(None);
        auth.set_session(None);

        assert_eq!(count.get(), 1);
        assert_eq!(format!("{auth:?}"), "AuthContext { session: None, listeners: 0 }");
    }

    #[test]
    fn listener_can_drop_another_subscription() {
        let auth = AuthContext::signed_out();
        let later_calls = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let other = Rc::clone(&slot);
        let _first = auth.on_session_change(move |_| drop(other.borrow_mut().take()));
        let sink = Rc::clone(&later_calls);
        *slot.borrow_mut() = Some(auth.on_session_change(move |_| sink.set(sink.get() + 1)));

        auth.set_session(None);
        auth.set_session(None);

        assert_eq!(later_calls.get(), 0);
    }

    #[test]
    fn listeners_can_read_the_context() {
        let auth = AuthContext::signed_out();
        let observed = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&observed);
        let reader = auth.clone();
        let _sub = auth.on_session_change(move |_| {
            *sink.borrow_mut() = reader.user_id();
        });

        auth.set_session(Some(session("u7")));
        assert_eq!(*observed.borrow(), Some(UserId::new("u7")));
    }

    #[test]
    fn session_reads_token_endpoint_response() {
        let json = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1700000000,
            "refresh_token": "r1",
            "user": {"id": "8f8e25bc-e289-4d9d-ae2c-a30ba04d71ab", "email": "a@b.c", "role": "authenticated"}
        }"#;
        let parsed: Session = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.user_id().as_str(), "8f8e25bc-e289-4d9d-ae2c-a30ba04d71ab");
        let later = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
        assert!(parsed.is_expired(later));
    }
}
