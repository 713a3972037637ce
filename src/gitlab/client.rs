//! Blocking HTTP client for the GitLab REST v4 API
//!
//! Calls are synchronous, one at a time, with ureq's default timeouts and no
//! retry. Expected non-2xx responses are surfaced as `GitLabError::Status`
//! values for the caller to inspect and log.

use serde::Serialize;

use super::types::{Issue, Milestone, NewIssue, ProjectInfo};
use super::{GitLabError, MilestoneScope, Tracker};

pub struct GitLabClient {
    api_url: String,
    token: String,
}

impl GitLabClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    fn milestones_path(scope: MilestoneScope) -> String {
        match scope {
            MilestoneScope::Project(id) => format!("projects/{id}/milestones"),
            MilestoneScope::Group(id) => format!("groups/{id}/milestones"),
        }
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ureq::Response, GitLabError> {
        let mut request = ureq::get(&self.url(path)).set("PRIVATE-TOKEN", &self.token);
        for (key, value) in query {
            request = request.query(key, value);
        }
        Self::finish(request.call())
    }

    fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<ureq::Response, GitLabError> {
        Self::finish(
            ureq::post(&self.url(path))
                .set("PRIVATE-TOKEN", &self.token)
                .send_json(body),
        )
    }

    fn post_empty(&self, path: &str, query: &[(&str, String)]) -> Result<ureq::Response, GitLabError> {
        let mut request = ureq::post(&self.url(path)).set("PRIVATE-TOKEN", &self.token);
        for (key, value) in query {
            request = request.query(key, value);
        }
        Self::finish(request.call())
    }

    fn delete(&self, path: &str) -> Result<ureq::Response, GitLabError> {
        Self::finish(
            ureq::delete(&self.url(path))
                .set("PRIVATE-TOKEN", &self.token)
                .call(),
        )
    }

    fn finish(result: Result<ureq::Response, ureq::Error>) -> Result<ureq::Response, GitLabError> {
        match result {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, response)) => Err(GitLabError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(err) => Err(GitLabError::Transport(err.to_string())),
        }
    }
}

impl Tracker for GitLabClient {
    fn create_issue(&self, project: u64, draft: &NewIssue) -> Result<Issue, GitLabError> {
        let response = self.post(&format!("projects/{project}/issues"), draft)?;
        Ok(response.into_json()?)
    }

    fn delete_issue(&self, project: u64, iid: u64) -> Result<(), GitLabError> {
        self.delete(&format!("projects/{project}/issues/{iid}"))?;
        Ok(())
    }

    fn list_issues_page(&self, project: u64, page: u32) -> Result<Vec<Issue>, GitLabError> {
        let response = self.get(
            &format!("projects/{project}/issues"),
            &[
                ("scope", "all".to_string()),
                ("per_page", "100".to_string()),
                ("page", page.to_string()),
            ],
        )?;
        Ok(response.into_json()?)
    }

    fn list_milestones(&self, scope: MilestoneScope) -> Result<Vec<Milestone>, GitLabError> {
        let response = self.get(
            &Self::milestones_path(scope),
            &[("per_page", "100".to_string())],
        )?;
        Ok(response.into_json()?)
    }

    fn create_milestone(
        &self,
        scope: MilestoneScope,
        title: &str,
        due_date: Option<&str>,
    ) -> Result<Milestone, GitLabError> {
        let mut payload = serde_json::json!({ "title": title });
        if let Some(due) = due_date {
            payload["due_date"] = serde_json::json!(due);
        }
        let response = self.post(&Self::milestones_path(scope), &payload)?;
        Ok(response.into_json()?)
    }

    fn link_issues(
        &self,
        src_project: u64,
        src_iid: u64,
        dst_project: u64,
        dst_iid: u64,
    ) -> Result<(), GitLabError> {
        let payload = serde_json::json!({
            "target_project_id": dst_project,
            "target_issue_iid": dst_iid,
            "link_type": "relates_to",
        });
        match self.post(
            &format!("projects/{src_project}/issues/{src_iid}/links"),
            &payload,
        ) {
            Ok(_) => Ok(()),
            // 409 means the link already exists; duplicate creation is success
            Err(GitLabError::Status { status: 409, .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn set_time_estimate(
        &self,
        project: u64,
        iid: u64,
        duration: &str,
    ) -> Result<(), GitLabError> {
        self.post_empty(
            &format!("projects/{project}/issues/{iid}/time_estimate"),
            &[("duration", duration.to_string())],
        )?;
        Ok(())
    }

    fn add_spent_time(&self, project: u64, iid: u64, duration: &str) -> Result<(), GitLabError> {
        self.post_empty(
            &format!("projects/{project}/issues/{iid}/add_spent_time"),
            &[("duration", duration.to_string())],
        )?;
        Ok(())
    }

    fn award_emoji(&self, project: u64, iid: u64, name: &str) -> Result<(), GitLabError> {
        let payload = serde_json::json!({ "name": name });
        self.post(
            &format!("projects/{project}/issues/{iid}/award_emoji"),
            &payload,
        )?;
        Ok(())
    }

    fn project_name(&self, project: u64) -> Result<String, GitLabError> {
        let response = self.get(&format!("projects/{project}"), &[])?;
        let info: ProjectInfo = response.into_json()?;
        Ok(info.name)
    }
}
