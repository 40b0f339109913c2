//! Typed webhook event keys.
//!
//! Hooks are registered against an event kind plus an optional action
//! (e.g. `issues` or `issues.opened`). Free-form strings exist only at the
//! boundaries: registration specs and the `X-GitHub-Event` header are
//! parsed into [`EventKey`] values, and all lookups are typed.

use std::fmt;

/// A GitHub webhook event kind.
///
/// The common kinds get variants; anything else is carried verbatim in
/// `Other`, so new provider events route without a crate upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    CheckRun,
    CheckSuite,
    Create,
    Delete,
    Installation,
    InstallationRepositories,
    IssueComment,
    Issues,
    Label,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    Push,
    Release,
    Repository,
    Status,
    WorkflowRun,
    Other(String),
}

impl EventKind {
    /// Parses the wire name of an event (the `X-GitHub-Event` header value).
    pub fn parse(name: &str) -> Self {
        match name {
            "check_run" => EventKind::CheckRun,
            "check_suite" => EventKind::CheckSuite,
            "create" => EventKind::Create,
            "delete" => EventKind::Delete,
            "installation" => EventKind::Installation,
            "installation_repositories" => EventKind::InstallationRepositories,
            "issue_comment" => EventKind::IssueComment,
            "issues" => EventKind::Issues,
            "label" => EventKind::Label,
            "pull_request" => EventKind::PullRequest,
            "pull_request_review" => EventKind::PullRequestReview,
            "pull_request_review_comment" => EventKind::PullRequestReviewComment,
            "push" => EventKind::Push,
            "release" => EventKind::Release,
            "repository" => EventKind::Repository,
            "status" => EventKind::Status,
            "workflow_run" => EventKind::WorkflowRun,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// The wire name of this event kind.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::CheckRun => "check_run",
            EventKind::CheckSuite => "check_suite",
            EventKind::Create => "create",
            EventKind::Delete => "delete",
            EventKind::Installation => "installation",
            EventKind::InstallationRepositories => "installation_repositories",
            EventKind::IssueComment => "issue_comment",
            EventKind::Issues => "issues",
            EventKind::Label => "label",
            EventKind::PullRequest => "pull_request",
            EventKind::PullRequestReview => "pull_request_review",
            EventKind::PullRequestReviewComment => "pull_request_review_comment",
            EventKind::Push => "push",
            EventKind::Release => "release",
            EventKind::Repository => "repository",
            EventKind::Status => "status",
            EventKind::WorkflowRun => "workflow_run",
            EventKind::Other(name) => name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registration/dispatch key: event kind plus optional action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub kind: EventKind,
    pub action: Option<String>,
}

impl EventKey {
    /// Key matching every delivery of an event kind, regardless of action.
    pub fn event(kind: EventKind) -> Self {
        EventKey { kind, action: None }
    }

    /// Key matching one specific action of an event kind.
    pub fn with_action(kind: EventKind, action: impl Into<String>) -> Self {
        EventKey {
            kind,
            action: Some(action.into()),
        }
    }

    /// Parses a registration spec: `"issues"` or `"issues.opened"`.
    ///
    /// Only the first dot separates kind from action; actions themselves
    /// contain no dots in GitHub's taxonomy.
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('.') {
            Some((kind, action)) => EventKey::with_action(EventKind::parse(kind), action),
            None => EventKey::event(EventKind::parse(spec)),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Some(action) => write!(f, "{}.{}", self.kind, action),
            None => write!(f, "{}", self.kind),
        }
    }
}
