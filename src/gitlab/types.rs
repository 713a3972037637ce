//! Wire types for the GitLab REST v4 surface this tool consumes

use serde::{Deserialize, Serialize};

/// An issue as returned by the API. Only the fields the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub iid: u64,
    #[serde(default)]
    pub project_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub web_url: String,
}

/// A milestone within a project or group scope
#[derive(Debug, Clone, Deserialize)]
pub struct Milestone {
    pub id: u64,
    pub title: String,
}

/// Project metadata; used only for child title decoration
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: String,
}

/// Issue-creation payload
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub labels: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<u64>,
}
