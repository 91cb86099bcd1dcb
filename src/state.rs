//! Application state machine.
//!
//! `reduce` is pure: it takes the current snapshot and an event and returns
//! the next snapshot plus the storage effects the shell has to carry out.
//! No access check happens on navigation; `settle` applies the gate right
//! before a frame is rendered and moves an invalid state to the login page.

use crate::gate::{evaluate, Decision};
use crate::i18n::Language;
use crate::role::Page;
use crate::session::{Session, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub session: Session,
    pub page: Page,
    pub language: Language,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            session: Session::LoggedOut,
            page: Page::Landing,
            language: Language::En,
        }
    }
}

impl AppState {
    /// Initial state. A rehydrated user starts on their dashboard.
    pub fn boot(user: Option<User>, language: Language) -> Self {
        match user {
            Some(user) => Self {
                page: user.role.dashboard(),
                session: Session::LoggedIn(user),
                language,
            },
            None => Self {
                language,
                ..Self::default()
            },
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session.user()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Navigate(Page),
    Login(User),
    Logout,
    SetLanguage(Language),
    ToggleLanguage,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Navigate(_) => "navigate",
            Event::Login(_) => "login",
            Event::Logout => "logout",
            Event::SetLanguage(_) => "set_language",
            Event::ToggleLanguage => "toggle_language",
        }
    }
}

/// Storage side effects requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    PersistSession(User),
    ClearSession,
}

pub fn reduce(state: &AppState, event: Event) -> (AppState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match event {
        Event::Navigate(page) => {
            next.page = page;
        }
        Event::Login(user) => {
            next.page = user.role.dashboard();
            effects.push(Effect::PersistSession(user.clone()));
            next.session = Session::LoggedIn(user);
        }
        Event::Logout => {
            next.session = Session::LoggedOut;
            next.page = Page::Landing;
            effects.push(Effect::ClearSession);
        }
        Event::SetLanguage(language) => {
            next.language = language;
        }
        Event::ToggleLanguage => {
            next.language = state.language.toggle();
        }
    }

    (next, effects)
}

/// Gate the current page. On redirect the returned state points at login and
/// nothing is drawn for the requested page this frame.
pub fn settle(state: &AppState) -> (Decision, AppState) {
    let decision = evaluate(state.page, &state.session);
    let mut next = state.clone();
    if decision == Decision::RedirectToLogin {
        next.page = Page::Login;
    }
    (decision, next)
}
