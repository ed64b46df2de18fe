/**
 * Close Authorization Policy
 *
 * Who may close a chat session is a deployment decision, not a fixed
 * rule: the strict variant only admits the occurrence owner, the
 * relaxed variant also admits staff accounts. The policy is selected
 * once at startup from configuration.
 */

use crate::shared::types::ChatSession;
use uuid::Uuid;

/// Role string that identifies staff accounts in JWT claims
pub const STAFF_ROLE: &str = "staff";

/// Predicate deciding who may close a chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAuthorizer {
    /// Only the occurrence owner may close (default)
    OwnerOnly,
    /// The occurrence owner or any staff account may close
    OwnerOrStaff,
}

impl CloseAuthorizer {
    /// Decide whether `requester` may close `session`
    pub fn may_close(
        &self,
        session: &ChatSession,
        requester: Uuid,
        requester_role: Option<&str>,
    ) -> bool {
        if session.owner_id == requester {
            return true;
        }
        match self {
            Self::OwnerOnly => false,
            Self::OwnerOrStaff => requester_role == Some(STAFF_ROLE),
        }
    }
}

impl Default for CloseAuthorizer {
    fn default() -> Self {
        Self::OwnerOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::SessionState;
    use chrono::Utc;

    fn session_owned_by(owner_id: Uuid) -> ChatSession {
        ChatSession {
            id: Uuid::new_v4(),
            occurrence_id: Uuid::new_v4(),
            owner_id,
            state: SessionState::Open,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_may_always_close() {
        let owner = Uuid::new_v4();
        let session = session_owned_by(owner);
        assert!(CloseAuthorizer::OwnerOnly.may_close(&session, owner, None));
        assert!(CloseAuthorizer::OwnerOrStaff.may_close(&session, owner, None));
    }

    #[test]
    fn test_stranger_may_never_close() {
        let session = session_owned_by(Uuid::new_v4());
        let stranger = Uuid::new_v4();
        assert!(!CloseAuthorizer::OwnerOnly.may_close(&session, stranger, Some("citizen")));
        assert!(!CloseAuthorizer::OwnerOrStaff.may_close(&session, stranger, Some("citizen")));
    }

    #[test]
    fn test_staff_close_depends_on_policy() {
        let session = session_owned_by(Uuid::new_v4());
        let staff = Uuid::new_v4();
        assert!(!CloseAuthorizer::OwnerOnly.may_close(&session, staff, Some(STAFF_ROLE)));
        assert!(CloseAuthorizer::OwnerOrStaff.may_close(&session, staff, Some(STAFF_ROLE)));
    }
}
