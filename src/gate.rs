//! Render-or-redirect decisions.
//!
//! Two encodings of the same policy live here: `evaluate` dispatches on the
//! page, and `routes`/`resolve_path` expose a path table with a catch-all.
//! Both read `role::access_rule`.

use crate::role::{access_rule, AccessRule, Page};
use crate::session::Session;

/// Outcome of checking a page against the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Render(Page),
    RedirectToLogin,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Render(_) => "render",
            Decision::RedirectToLogin => "redirect_to_login",
        }
    }
}

/// Decide whether `page` may be shown for `session`.
/// A logged-in user with the wrong role is sent to login like a logged-out one.
pub fn evaluate(page: Page, session: &Session) -> Decision {
    if access_rule(page).permits(session.role()) {
        Decision::Render(page)
    } else {
        Decision::RedirectToLogin
    }
}

/// One entry of the path-based route table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub page: Page,
    pub rule: AccessRule,
}

/// Route table derived from the page registry
pub fn routes() -> Vec<Route> {
    Page::ALL
        .iter()
        .map(|&page| Route {
            path: page.path(),
            page,
            rule: access_rule(page),
        })
        .collect()
}

/// Resolve a URL path. Unknown paths hit the catch-all and land on the landing page.
pub fn resolve_path(path: &str, session: &Session) -> Decision {
    let wanted = format!("/{}", path.trim().trim_matches('/').to_lowercase());
    let route = routes().into_iter().find(|r| r.path == wanted);
    match route {
        Some(route) if route.rule.permits(session.role()) => Decision::Render(route.page),
        Some(_) => Decision::RedirectToLogin,
        None => Decision::Render(Page::Landing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;
    use crate::session::User;

    fn sessions() -> Vec<Session> {
        let mut all = vec![Session::LoggedOut];
        for role in Role::ALL {
            all.push(Session::LoggedIn(User::new("user-1", "a@b.com", role)));
        }
        all
    }

    #[test]
    fn test_total_over_pages_and_sessions() {
        for page in Page::ALL {
            for session in sessions() {
                match evaluate(page, &session) {
                    Decision::Render(p) => assert_eq!(p, page),
                    Decision::RedirectToLogin => {}
                }
            }
        }
    }

    #[test]
    fn test_required_role_enforced() {
        for page in Page::ALL {
            if let AccessRule::RequiresRole(required) = access_rule(page) {
                for role in Role::ALL {
                    let session = Session::LoggedIn(User::new("user-1", "a@b.com", role));
                    let expected = if role == required {
                        Decision::Render(page)
                    } else {
                        Decision::RedirectToLogin
                    };
                    assert_eq!(evaluate(page, &session), expected, "{} as {}", page, role);
                }
                assert_eq!(evaluate(page, &Session::LoggedOut), Decision::RedirectToLogin);
            }
        }
    }

    #[test]
    fn test_marine_crime_detection_excludes_researcher() {
        let page = Page::parse("marine-crime-detection");
        for role in Role::ALL {
            let session = Session::LoggedIn(User::new("user-1", "a@b.com", role));
            let decision = evaluate(page, &session);
            if role == Role::Researcher {
                assert_eq!(decision, Decision::RedirectToLogin);
            } else {
                assert_eq!(decision, Decision::Render(page));
            }
        }
        assert_eq!(evaluate(page, &Session::LoggedOut), Decision::RedirectToLogin);
    }

    #[test]
    fn test_wrong_role_goes_to_login() {
        let session = Session::LoggedIn(User::new("user-1", "a@b.com", Role::Researcher));
        assert_eq!(
            evaluate(Page::PolicyTools, &session),
            Decision::RedirectToLogin
        );
    }

    #[test]
    fn test_public_pages_without_session() {
        assert_eq!(
            evaluate(Page::Landing, &Session::LoggedOut),
            Decision::Render(Page::Landing)
        );
        assert_eq!(
            evaluate(Page::Login, &Session::LoggedOut),
            Decision::Render(Page::Login)
        );
        assert_eq!(
            evaluate(Page::DataExplorer, &Session::LoggedOut),
            Decision::RedirectToLogin
        );
    }

    #[test]
    fn test_path_table_agrees_with_dispatch() {
        for route in routes() {
            for session in sessions() {
                assert_eq!(
                    resolve_path(&route.path, &session),
                    evaluate(route.page, &session),
                    "path {}",
                    route.path
                );
            }
        }
    }

    #[test]
    fn test_path_catch_all() {
        let session = Session::LoggedOut;
        assert_eq!(
            resolve_path("/nowhere", &session),
            Decision::Render(Page::Landing)
        );
        assert_eq!(resolve_path("/", &session), Decision::Render(Page::Landing));
        assert_eq!(
            resolve_path("policy-tools/", &session),
            Decision::RedirectToLogin
        );
    }
}
