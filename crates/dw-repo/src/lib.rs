//! Treasury document repository.
//!
//! Persists documents, signers, commands, approvals, schedules, state
//! channel sessions and custodial wallets, and provides the atomic
//! approval/quorum-promotion primitives the engine's orchestrator relies on.

pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::RepoConfig;
pub use error::{RepoError, Result};
pub use models::*;
pub use store::Repo;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_status_round_trips_through_its_string_form() {
        for status in [
            CommandStatus::Invalid,
            CommandStatus::Raw,
            CommandStatus::PendingApproval,
            CommandStatus::Approved,
            CommandStatus::Executing,
            CommandStatus::Executed,
            CommandStatus::Failed,
            CommandStatus::Rejected,
        ] {
            assert_eq!(CommandStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn terminal_statuses_match_spec() {
        assert!(CommandStatus::Executed.is_terminal());
        assert!(CommandStatus::Failed.is_terminal());
        assert!(CommandStatus::Rejected.is_terminal());
        assert!(CommandStatus::Invalid.is_terminal());
        assert!(!CommandStatus::PendingApproval.is_terminal());
        assert!(!CommandStatus::Approved.is_terminal());
        assert!(!CommandStatus::Executing.is_terminal());
        assert!(!CommandStatus::Raw.is_terminal());
    }

    #[test]
    fn approval_decision_round_trips() {
        assert_eq!(ApprovalDecision::parse("APPROVE"), Some(ApprovalDecision::Approve));
        assert_eq!(ApprovalDecision::parse("REJECT"), Some(ApprovalDecision::Reject));
        assert_eq!(ApprovalDecision::parse("MAYBE"), None);
    }

    #[test]
    fn session_key_expiry_is_inclusive() {
        let key = SessionKey {
            doc_id: "d1".into(),
            signer_address: "0xabc".into(),
            delegated_public_key: "pub".into(),
            encrypted_private: vec![],
            expires_at: 1000,
            allowances_json: None,
        };
        assert!(!key.is_expired(999));
        assert!(key.is_expired(1000));
        assert!(key.is_expired(1001));
    }
}
