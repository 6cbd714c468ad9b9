//! Caller identity.
//!
//! The server sits behind an authentication layer that has already established who the caller is. That layer passes
//! the result on in three headers:
//! * `X-Storefront-User`: the signed-in user's id.
//! * `X-Storefront-Session`: the anonymous session key. Sent on its own for guests, and alongside the user id right
//!   after sign-in so that the guest cart can be merged.
//! * `X-Storefront-Roles`: a comma-separated list of back-office roles (`staff`, `admin`).
//!
//! A request with neither a user nor a session header has no identity, and `/api` handlers reject it with a 401.
use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::*;
use storefront_engine::db_types::{ActorContext, Role};

use crate::errors::ServerError;

pub const USER_HEADER: &str = "X-Storefront-User";
pub const SESSION_HEADER: &str = "X-Storefront-Session";
pub const ROLES_HEADER: &str = "X-Storefront-Roles";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The owner that carts and orders are scoped to. A signed-in user takes precedence over the session.
    pub actor: ActorContext,
    /// The session key, if one was sent, even when the caller is signed in
    pub session_key: Option<String>,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = header_value(headers, USER_HEADER);
        let session_key = header_value(headers, SESSION_HEADER);
        let actor = match (user_id, &session_key) {
            (Some(user), _) => ActorContext::user(user),
            (None, Some(session)) => ActorContext::session(session.as_str()),
            (None, None) => return None,
        };
        let roles = header_value(headers, ROLES_HEADER)
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .filter_map(|r| {
                        r.parse::<Role>()
                            .map_err(|e| debug!("💻️ Ignoring unknown role in {ROLES_HEADER}. {e}"))
                            .ok()
                    })
                    .collect::<Vec<Role>>()
            })
            .unwrap_or_default();
        Some(Self { actor, session_key, roles })
    }

    /// Admins can do everything staff can.
    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::Staff => self.roles.iter().any(|r| matches!(r, Role::Staff | Role::Admin)),
            Role::Admin => self.roles.contains(&Role::Admin),
        }
    }

    pub fn has_all_roles(&self, roles: &[Role]) -> bool {
        roles.iter().all(|r| self.has_role(*r))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl FromRequest for Identity {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = Identity::from_headers(req.headers()).ok_or_else(|| {
            debug!("💻️ Request to {} carried no identity headers", req.path());
            ServerError::MissingIdentity
        });
        ready(result)
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn user_takes_precedence_over_session() {
        let req = TestRequest::default()
            .insert_header((USER_HEADER, "alice"))
            .insert_header((SESSION_HEADER, "abc123"))
            .to_http_request();
        let id = Identity::from_headers(req.headers()).unwrap();
        assert_eq!(id.actor, ActorContext::user("alice"));
        assert_eq!(id.session_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn no_identity() {
        let req = TestRequest::default().insert_header((ROLES_HEADER, "admin")).to_http_request();
        assert!(Identity::from_headers(req.headers()).is_none());
        let req = TestRequest::default().insert_header((USER_HEADER, "  ")).to_http_request();
        assert!(Identity::from_headers(req.headers()).is_none());
    }

    #[test]
    fn roles() {
        let req = TestRequest::default()
            .insert_header((SESSION_HEADER, "s1"))
            .insert_header((ROLES_HEADER, "Admin, wizard"))
            .to_http_request();
        let id = Identity::from_headers(req.headers()).unwrap();
        assert_eq!(id.roles, vec![Role::Admin]);
        assert!(id.has_role(Role::Staff));
        assert!(id.has_all_roles(&[Role::Staff, Role::Admin]));

        let req = TestRequest::default()
            .insert_header((USER_HEADER, "bob"))
            .insert_header((ROLES_HEADER, "staff"))
            .to_http_request();
        let id = Identity::from_headers(req.headers()).unwrap();
        assert!(id.has_role(Role::Staff));
        assert!(!id.has_role(Role::Admin));
    }
}
