//! Pull request webhook payload structures

use serde::Deserialize;

/// Value of the event-type header for the only event this service handles.
pub const PULL_REQUEST_EVENT: &str = "pull_request";

/// Header carrying the event-type discriminator.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Header carrying the sender's correlation token, echoed on every response.
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// The slice of the pull-request webhook body this service reads.
/// The payload schema is owned by the source-control platform; everything
/// else in it is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: PullRequestState,
    pub head: HeadRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadRef {
    #[serde(rename = "ref")]
    pub branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
    /// Any state the platform may send that we do not act on.
    #[serde(other)]
    Other,
}

impl PullRequestEvent {
    /// Derived pipeline identity for this pull request. Used consistently
    /// for the existence check, the create and the delete.
    pub fn pipeline_name(&self) -> String {
        format!("pr-{}", self.pull_request.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_pull_request_payload() {
        let body = r#"{"pull_request":{"number":42,"state":"open","head":{"ref":"feature-x"}}}"#;
        let event: PullRequestEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.pull_request.number, 42);
        assert_eq!(event.pull_request.state, PullRequestState::Open);
        assert_eq!(event.pull_request.head.branch, "feature-x");
        assert_eq!(event.pipeline_name(), "pr-42");
    }

    #[test]
    fn unknown_state_maps_to_other() {
        let body = r#"{"pull_request":{"number":7,"state":"merged","head":{"ref":"main"}}}"#;
        let event: PullRequestEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.pull_request.state, PullRequestState::Other);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let body = r#"{
            "action": "closed",
            "pull_request": {
                "number": 3,
                "state": "closed",
                "head": {"ref": "fix/typo", "sha": "abc123"},
                "title": "Fix typo"
            },
            "repository": {"name": "web"}
        }"#;
        let event: PullRequestEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.pull_request.state, PullRequestState::Closed);
        assert_eq!(event.pipeline_name(), "pr-3");
    }

    #[test]
    fn missing_head_is_a_parse_error() {
        let body = r#"{"pull_request":{"number":1,"state":"open"}}"#;
        assert!(serde_json::from_str::<PullRequestEvent>(body).is_err());
    }
}
