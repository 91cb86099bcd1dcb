//! Runs the state machine against a session store.

use crate::auth::{AuthError, Authenticator, LoginForm};
use crate::gate::Decision;
use crate::i18n::Language;
use crate::role::Page;
use crate::session::{KeyValueStore, SessionLoad, SessionStore, User};
use crate::state::{reduce, settle, AppState, Effect, Event};
use crate::views::{self, Frame, ViewContext};
use rand::Rng;

pub struct Portal<S: KeyValueStore> {
    state: AppState,
    sessions: SessionStore<S>,
    discarded_session: Option<String>,
}

impl<S: KeyValueStore> Portal<S> {
    /// Load any persisted session before the first render decision
    pub fn start(mut sessions: SessionStore<S>, language: Language) -> Self {
        let (user, discarded_session) = match sessions.load() {
            SessionLoad::Restored(user) => (Some(user), None),
            SessionLoad::Absent => (None, None),
            SessionLoad::Discarded(reason) => (None, Some(reason)),
        };
        Self {
            state: AppState::boot(user, language),
            sessions,
            discarded_session,
        }
    }

    /// Why a stored session was thrown away at startup, if one was
    pub fn discarded_session(&self) -> Option<&str> {
        self.discarded_session.as_deref()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    pub fn dispatch(&mut self, event: Event) {
        let (next, effects) = reduce(&self.state, event);
        self.state = next;
        for effect in effects {
            let result = match &effect {
                Effect::PersistSession(user) => self.sessions.save(user),
                Effect::ClearSession => self.sessions.clear(),
            };
            if let Err(e) = result {
                eprintln!("Warning: session storage failed ({:?}): {}", effect, e);
            }
        }
    }

    /// Validate the form and log in. On error nothing changes.
    pub fn login(
        &mut self,
        auth: &dyn Authenticator,
        form: &LoginForm,
    ) -> Result<User, AuthError> {
        let user = auth.login(form)?;
        self.dispatch(Event::Login(user.clone()));
        Ok(user)
    }

    pub fn navigate(&mut self, page: Page) {
        self.dispatch(Event::Navigate(page));
    }

    pub fn logout(&mut self) {
        self.dispatch(Event::Logout);
    }

    /// Gate the current page, correcting the state on redirect
    pub fn settle(&mut self) -> Decision {
        let (decision, next) = settle(&self.state);
        self.state = next;
        decision
    }

    /// Produce one frame. A redirect yields no frame; the next call renders login.
    pub fn render<R: Rng>(&mut self, rng: &mut R) -> (Decision, Option<Frame>) {
        let decision = self.settle();
        match decision {
            Decision::Render(page) => {
                let ctx = ViewContext {
                    user: self.state.user(),
                    language: self.state.language,
                };
                (decision, Some(views::render(page, &ctx, rng)))
            }
            Decision::RedirectToLogin => (decision, None),
        }
    }
}
