//! Two-level approval state machine.
//!
//! ```text
//! Pending L1 --approve(L1)--> Pending L2 --approve(L2)--> Approved
//!     |                           |
//!     +--reject(L1)--> Rejected <-+--reject(L2)
//! ```
//!
//! Each level decides exactly once, and only while the request is waiting on
//! that level.

use chrono::Utc;

use crate::errors::AppError;
use crate::models::approval::{Decision, ManagerLevel};
use crate::models::request::RequestStatus;
use crate::store::sqlite::{NewDecision, SqliteStore};

/// Status a request must be in for `level` to decide on it.
pub fn awaited_status(level: ManagerLevel) -> RequestStatus {
    match level {
        ManagerLevel::One => RequestStatus::PendingL1,
        ManagerLevel::Two => RequestStatus::PendingL2,
    }
}

pub fn not_ready_message(level: ManagerLevel) -> String {
    match level {
        ManagerLevel::One => "Request is not awaiting a Level 1 decision.".into(),
        ManagerLevel::Two => "Request is not ready for Level 2.".into(),
    }
}

/// Next status after `level` records `decision` on a request in `current`.
pub fn transition(
    level: ManagerLevel,
    current: RequestStatus,
    decision: Decision,
) -> Result<RequestStatus, AppError> {
    if current != awaited_status(level) {
        return Err(AppError::NotReady(not_ready_message(level)));
    }
    Ok(match (level, decision) {
        (ManagerLevel::One, Decision::Approved) => RequestStatus::PendingL2,
        (ManagerLevel::Two, Decision::Approved) => RequestStatus::Approved,
        (_, Decision::Rejected) => RequestStatus::Rejected,
    })
}

/// Raw decision form as submitted by a manager.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct DecisionForm {
    pub decision: Option<String>,
    pub approver_name: Option<String>,
    pub comments: Option<String>,
}

/// Checked decision input.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionInput {
    pub decision: Decision,
    pub approver_name: String,
    pub comments: Option<String>,
}

impl DecisionForm {
    /// Decision value is checked first, then the approver name.
    pub fn parse(&self) -> Result<DecisionInput, AppError> {
        let decision = self
            .decision
            .as_deref()
            .and_then(Decision::parse)
            .ok_or_else(|| AppError::InvalidDecision("Invalid decision".into()))?;

        let approver_name = self.approver_name.as_deref().unwrap_or("").trim();
        if approver_name.is_empty() {
            return Err(AppError::InvalidDecision("Approver name required".into()));
        }

        let comments = self
            .comments
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);

        Ok(DecisionInput {
            decision,
            approver_name: approver_name.to_string(),
            comments,
        })
    }
}

/// Record `level`'s decision on request `request_id` and advance its status.
/// Returns the new status.
pub async fn decide(
    db: &SqliteStore,
    level: ManagerLevel,
    request_id: i64,
    form: &DecisionForm,
) -> Result<RequestStatus, AppError> {
    let input = form.parse()?;

    let current = db
        .get_request(request_id)
        .await?
        .ok_or(AppError::NotFound)?
        .status;

    let next = transition(level, current, input.decision).map_err(|e| {
        tracing::warn!(request_id, level = %level, status = %current, "decision out of sequence");
        e
    })?;

    let applied = db
        .record_decision(&NewDecision {
            request_id,
            level,
            expected: current,
            next,
            approver_name: &input.approver_name,
            decision: input.decision,
            comments: input.comments.as_deref(),
            decided_at: Utc::now(),
        })
        .await?;

    if !applied {
        // Another decision moved the request between our read and our write.
        tracing::warn!(request_id, level = %level, "concurrent decision lost the race");
        return Err(AppError::NotReady(not_ready_message(level)));
    }

    tracing::info!(
        request_id,
        level = %level,
        decision = input.decision.as_str(),
        from = %current,
        to = %next,
        "decision recorded"
    );
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(decision: &str, name: &str) -> DecisionForm {
        DecisionForm {
            decision: Some(decision.into()),
            approver_name: Some(name.into()),
            comments: None,
        }
    }

    #[test]
    fn test_transitions_from_awaited_states() {
        use ManagerLevel::{One, Two};

        assert_eq!(
            transition(One, RequestStatus::PendingL1, Decision::Approved).unwrap(),
            RequestStatus::PendingL2
        );
        assert_eq!(
            transition(One, RequestStatus::PendingL1, Decision::Rejected).unwrap(),
            RequestStatus::Rejected
        );
        assert_eq!(
            transition(Two, RequestStatus::PendingL2, Decision::Approved).unwrap(),
            RequestStatus::Approved
        );
        assert_eq!(
            transition(Two, RequestStatus::PendingL2, Decision::Rejected).unwrap(),
            RequestStatus::Rejected
        );
    }

    #[test]
    fn test_level_two_requires_pending_l2() {
        for status in [
            RequestStatus::PendingL1,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ] {
            match transition(ManagerLevel::Two, status, Decision::Approved) {
                Err(AppError::NotReady(msg)) => assert_eq!(msg, "Request is not ready for Level 2."),
                other => panic!("expected NotReady from {:?}, got {:?}", status, other),
            }
        }
    }

    #[test]
    fn test_level_one_requires_pending_l1() {
        for status in [
            RequestStatus::PendingL2,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ] {
            assert!(matches!(
                transition(ManagerLevel::One, status, Decision::Rejected),
                Err(AppError::NotReady(_))
            ));
        }
    }

    #[test]
    fn test_every_result_keeps_status_step_pairing() {
        for level in [ManagerLevel::One, ManagerLevel::Two] {
            for decision in [Decision::Approved, Decision::Rejected] {
                let next = transition(level, awaited_status(level), decision).unwrap();
                assert!(matches!(
                    (next, next.step()),
                    (RequestStatus::PendingL2, 2)
                        | (RequestStatus::Approved, 0)
                        | (RequestStatus::Rejected, 0)
                ));
            }
        }
    }

    #[test]
    fn test_form_checks_decision_before_name() {
        match form("Maybe", "").parse() {
            Err(AppError::InvalidDecision(msg)) => assert_eq!(msg, "Invalid decision"),
            other => panic!("unexpected {:?}", other),
        }
        match form("Approved", "   ").parse() {
            Err(AppError::InvalidDecision(msg)) => assert_eq!(msg, "Approver name required"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_form_trims_name_and_drops_blank_comments() {
        let mut f = form("Rejected", "  Sara K. ");
        f.comments = Some("  ".into());
        let input = f.parse().unwrap();
        assert_eq!(input.approver_name, "Sara K.");
        assert_eq!(input.decision, Decision::Rejected);
        assert_eq!(input.comments, None);
    }

    #[test]
    fn test_missing_decision_field_is_invalid() {
        assert!(matches!(
            DecisionForm::default().parse(),
            Err(AppError::InvalidDecision(_))
        ));
    }
}
