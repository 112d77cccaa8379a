//! crates/guroosh_core/src/workflow.rs
//!
//! The status transitions of advice requests, meetings and connection requests,
//! together with who is allowed to trigger each of them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AdviceRequest, ConnectionRequest, ConnectionStatus, Meeting, MeetingStatus, Participant,
    RequestStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Only participants of this request may do that")]
    NotParticipant,
    #[error("Only the advisor this request was sent to may do that")]
    NotAdvisor,
    #[error("Only the client who created this request may do that")]
    NotClient,
    #[error("Cannot change status from {from} to {to}")]
    Invalid { from: String, to: String },
    #[error("Status must be 'accepted' or 'rejected'")]
    InvalidDecision,
    #[error("This request has already been {0}")]
    AlreadyProcessed(String),
    #[error("This request is {0} and no longer accepts messages")]
    NotOpen(String),
    #[error("Meetings can only be changed while they are Scheduled")]
    MeetingLocked,
    #[error("Meetings must be scheduled in the future")]
    MeetingInPast,
}

impl TransitionError {
    /// True for errors caused by who is asking rather than by the current state.
    pub fn is_permission(&self) -> bool {
        matches!(
            self,
            TransitionError::NotParticipant | TransitionError::NotAdvisor | TransitionError::NotClient
        )
    }

    fn invalid(from: impl ToString, to: impl ToString) -> Self {
        TransitionError::Invalid {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Checks that `actor` may move `request` to `next`.
///
/// Pending requests are accepted or declined by their advisor, or cancelled by
/// their client. Accepted requests move to In Progress with the first message.
/// Either participant may close or cancel an open request and complete one in progress.
pub fn check_request_transition(
    request: &AdviceRequest,
    actor: Uuid,
    next: RequestStatus,
) -> Result<Participant, TransitionError> {
    use RequestStatus::*;

    let side = request
        .participant(actor)
        .ok_or(TransitionError::NotParticipant)?;

    match (request.status, next) {
        (Pending, Accepted | Declined) => match side {
            Participant::Advisor => Ok(side),
            Participant::Client => Err(TransitionError::NotAdvisor),
        },
        (Pending, Cancelled) => match side {
            Participant::Client => Ok(side),
            Participant::Advisor => Err(TransitionError::NotClient),
        },
        (Accepted, InProgress) => Ok(side),
        (Accepted | InProgress, Closed | Cancelled) => Ok(side),
        (InProgress, Completed) => Ok(side),
        (from, to) => Err(TransitionError::invalid(from, to)),
    }
}

/// Messages and meetings are only allowed while the request is Accepted or In Progress.
pub fn ensure_open(request: &AdviceRequest) -> Result<(), TransitionError> {
    if request.status.is_open() {
        Ok(())
    } else {
        Err(TransitionError::NotOpen(request.status.to_string()))
    }
}

/// Only the client may edit the request text, and only before the advisor answered.
pub fn ensure_client_editable(request: &AdviceRequest, actor: Uuid) -> Result<(), TransitionError> {
    match request.participant(actor) {
        None => Err(TransitionError::NotParticipant),
        Some(Participant::Advisor) => Err(TransitionError::NotClient),
        Some(Participant::Client) if request.status != RequestStatus::Pending => {
            Err(TransitionError::AlreadyProcessed(request.status.to_string()))
        }
        Some(Participant::Client) => Ok(()),
    }
}

pub fn check_meeting_time(date_time: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), TransitionError> {
    if date_time > now {
        Ok(())
    } else {
        Err(TransitionError::MeetingInPast)
    }
}

pub fn ensure_meeting_editable(meeting: &Meeting, actor: Uuid) -> Result<(), TransitionError> {
    if !meeting.involves(actor) {
        return Err(TransitionError::NotParticipant);
    }
    if meeting.status != MeetingStatus::Scheduled {
        return Err(TransitionError::MeetingLocked);
    }
    Ok(())
}

pub fn check_meeting_transition(
    meeting: &Meeting,
    actor: Uuid,
    next: MeetingStatus,
) -> Result<(), TransitionError> {
    if !meeting.involves(actor) {
        return Err(TransitionError::NotParticipant);
    }
    match (meeting.status, next) {
        (MeetingStatus::Scheduled, MeetingStatus::Completed | MeetingStatus::Cancelled) => Ok(()),
        (from, to) => Err(TransitionError::invalid(from, to)),
    }
}

/// Validates an advisor's answer to a connection request.
///
/// The decision is checked first, then ownership, then that the request is still pending.
pub fn check_connection_response(
    request: &ConnectionRequest,
    advisor_id: Uuid,
    decision: &str,
) -> Result<ConnectionStatus, TransitionError> {
    let decision = match decision.parse::<ConnectionStatus>() {
        Ok(status @ (ConnectionStatus::Accepted | ConnectionStatus::Rejected)) => status,
        _ => return Err(TransitionError::InvalidDecision),
    };
    if request.advisor_id != advisor_id {
        return Err(TransitionError::NotAdvisor);
    }
    if request.status != ConnectionStatus::Pending {
        return Err(TransitionError::AlreadyProcessed(request.status.to_string()));
    }
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewAdviceRequest;

    fn request(status: RequestStatus) -> AdviceRequest {
        let draft = NewAdviceRequest {
            advisor_id: Uuid::new_v4(),
            topic: "Debt".to_string(),
            description: "Consolidating two loans".to_string(),
            budget: None,
        };
        let mut request = AdviceRequest::new(Uuid::new_v4(), draft, Utc::now());
        request.status = status;
        request
    }

    #[test]
    fn only_the_targeted_advisor_accepts() {
        let r = request(RequestStatus::Pending);
        assert_eq!(
            check_request_transition(&r, r.advisor_id, RequestStatus::Accepted),
            Ok(Participant::Advisor)
        );
        assert_eq!(
            check_request_transition(&r, r.client_id, RequestStatus::Accepted),
            Err(TransitionError::NotAdvisor)
        );
        assert_eq!(
            check_request_transition(&r, Uuid::new_v4(), RequestStatus::Declined),
            Err(TransitionError::NotParticipant)
        );
    }

    #[test]
    fn either_participant_closes_an_accepted_request() {
        let r = request(RequestStatus::Accepted);
        assert!(check_request_transition(&r, r.client_id, RequestStatus::Closed).is_ok());
        assert!(check_request_transition(&r, r.advisor_id, RequestStatus::Closed).is_ok());
    }

    #[test]
    fn completion_requires_work_in_progress() {
        let accepted = request(RequestStatus::Accepted);
        assert!(matches!(
            check_request_transition(&accepted, accepted.client_id, RequestStatus::Completed),
            Err(TransitionError::Invalid { .. })
        ));
        let in_progress = request(RequestStatus::InProgress);
        assert!(check_request_transition(&in_progress, in_progress.advisor_id, RequestStatus::Completed).is_ok());
    }

    #[test]
    fn terminal_states_do_not_move() {
        for status in [
            RequestStatus::Declined,
            RequestStatus::Completed,
            RequestStatus::Closed,
            RequestStatus::Cancelled,
        ] {
            let r = request(status);
            for next in RequestStatus::ALL {
                assert!(check_request_transition(&r, r.client_id, *next).is_err());
            }
        }
    }

    #[test]
    fn only_the_client_cancels_a_pending_request() {
        let r = request(RequestStatus::Pending);
        assert!(check_request_transition(&r, r.client_id, RequestStatus::Cancelled).is_ok());
        assert_eq!(
            check_request_transition(&r, r.advisor_id, RequestStatus::Cancelled),
            Err(TransitionError::NotClient)
        );
    }

    #[test]
    fn closed_requests_refuse_messages() {
        assert!(ensure_open(&request(RequestStatus::Accepted)).is_ok());
        assert!(ensure_open(&request(RequestStatus::InProgress)).is_ok());
        assert_eq!(
            ensure_open(&request(RequestStatus::Closed)),
            Err(TransitionError::NotOpen("Closed".to_string()))
        );
    }

    #[test]
    fn connection_response_checks_in_order() {
        let advisor = Uuid::new_v4();
        let mut r = ConnectionRequest::new(Uuid::new_v4(), advisor, None, Utc::now());

        assert_eq!(
            check_connection_response(&r, Uuid::new_v4(), "maybe"),
            Err(TransitionError::InvalidDecision)
        );
        assert_eq!(
            check_connection_response(&r, advisor, "pending"),
            Err(TransitionError::InvalidDecision)
        );
        assert_eq!(
            check_connection_response(&r, Uuid::new_v4(), "accepted"),
            Err(TransitionError::NotAdvisor)
        );
        assert_eq!(
            check_connection_response(&r, advisor, "rejected"),
            Ok(ConnectionStatus::Rejected)
        );

        r.status = ConnectionStatus::Accepted;
        assert_eq!(
            check_connection_response(&r, advisor, "rejected"),
            Err(TransitionError::AlreadyProcessed("accepted".to_string()))
        );
    }

    #[test]
    fn meetings_only_leave_scheduled() {
        let r = request(RequestStatus::Accepted);
        let now = Utc::now();
        let draft = crate::domain::NewMeeting {
            request_id: r.id,
            date_time: now + chrono::Duration::days(1),
            duration_minutes: None,
            location: None,
            agenda: None,
        };
        let mut meeting = Meeting::new(&r, draft, now);
        assert!(check_meeting_transition(&meeting, r.client_id, MeetingStatus::Completed).is_ok());
        assert_eq!(
            check_meeting_transition(&meeting, Uuid::new_v4(), MeetingStatus::Cancelled),
            Err(TransitionError::NotParticipant)
        );

        meeting.status = MeetingStatus::Cancelled;
        assert!(check_meeting_transition(&meeting, r.client_id, MeetingStatus::Completed).is_err());
        assert_eq!(
            ensure_meeting_editable(&meeting, r.advisor_id),
            Err(TransitionError::MeetingLocked)
        );
    }

    #[test]
    fn meetings_must_be_in_the_future() {
        let now = Utc::now();
        assert!(check_meeting_time(now + chrono::Duration::minutes(5), now).is_ok());
        assert_eq!(check_meeting_time(now, now), Err(TransitionError::MeetingInPast));
    }
}
