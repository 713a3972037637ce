//! GitLab API surface: the `Tracker` seam, the HTTP client behind it, and
//! the idempotent lookup helpers built on top.

pub mod client;
pub mod types;

use thiserror::Error;

pub use client::GitLabClient;
pub use types::{Issue, Milestone, NewIssue, ProjectInfo};

/// Errors from remote tracker calls.
///
/// Expected rejections come back as `Status` values carrying the raw status
/// and body text so callers can log and continue; nothing here panics.
#[derive(Debug, Error)]
pub enum GitLabError {
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to decode API response: {0}")]
    Decode(#[from] std::io::Error),
}

/// The boundary within which a milestone title is treated as unique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneScope {
    Project(u64),
    Group(u64),
}

/// The remote tracker operations the pipeline consumes. `GitLabClient` is
/// the production implementation; tests substitute an in-memory fake.
pub trait Tracker {
    fn create_issue(&self, project: u64, draft: &NewIssue) -> Result<Issue, GitLabError>;
    fn delete_issue(&self, project: u64, iid: u64) -> Result<(), GitLabError>;
    fn list_issues_page(&self, project: u64, page: u32) -> Result<Vec<Issue>, GitLabError>;
    fn list_milestones(&self, scope: MilestoneScope) -> Result<Vec<Milestone>, GitLabError>;
    fn create_milestone(
        &self,
        scope: MilestoneScope,
        title: &str,
        due_date: Option<&str>,
    ) -> Result<Milestone, GitLabError>;
    /// Create a relates_to link. Duplicate links are reported as success by
    /// the implementation (the remote treats them as already linked).
    fn link_issues(
        &self,
        src_project: u64,
        src_iid: u64,
        dst_project: u64,
        dst_iid: u64,
    ) -> Result<(), GitLabError>;
    fn set_time_estimate(&self, project: u64, iid: u64, duration: &str)
        -> Result<(), GitLabError>;
    fn add_spent_time(&self, project: u64, iid: u64, duration: &str) -> Result<(), GitLabError>;
    fn award_emoji(&self, project: u64, iid: u64, name: &str) -> Result<(), GitLabError>;
    fn project_name(&self, project: u64) -> Result<String, GitLabError>;
}

/// Whether [`find_or_create_milestone`] found an existing milestone or had
/// to create one
#[derive(Debug, Clone)]
pub enum MilestoneOutcome {
    Found(Milestone),
    Created(Milestone),
}

/// Idempotent milestone upsert: case-insensitive title match over the
/// scope's existing milestones, else create.
///
/// Race tolerance: there is no transactional guarantee against the remote.
/// Within one run the caller caches results per title, so at most one create
/// is attempted per (scope, title); concurrent independent runs can still
/// race and produce duplicates, which is accepted.
pub fn find_or_create_milestone(
    tracker: &dyn Tracker,
    scope: MilestoneScope,
    title: &str,
    due_date: Option<&str>,
) -> Result<MilestoneOutcome, GitLabError> {
    let wanted = title.trim().to_lowercase();
    // A failed listing falls through to creation, mirroring the lookup's
    // best-effort contract
    let existing = tracker.list_milestones(scope).unwrap_or_default();
    if let Some(found) = existing
        .into_iter()
        .find(|m| m.title.trim().to_lowercase() == wanted)
    {
        return Ok(MilestoneOutcome::Found(found));
    }
    tracker
        .create_milestone(scope, title.trim(), due_date)
        .map(MilestoneOutcome::Created)
}

/// Enumerate every issue in a project, paginating until an empty page.
/// Used only by the purge path.
pub fn list_all_issues(tracker: &dyn Tracker, project: u64) -> Result<Vec<Issue>, GitLabError> {
    let mut issues = Vec::new();
    let mut page = 1_u32;
    loop {
        let batch = tracker.list_issues_page(project, page)?;
        if batch.is_empty() {
            break;
        }
        issues.extend(batch);
        page += 1;
    }
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Minimal fake covering the milestone and listing helpers
    struct FakeTracker {
        milestones: RefCell<Vec<Milestone>>,
        creates: RefCell<u32>,
        issue_pages: Vec<Vec<Issue>>,
    }

    impl FakeTracker {
        fn with_milestones(titles: &[&str]) -> Self {
            Self {
                milestones: RefCell::new(
                    titles
                        .iter()
                        .enumerate()
                        .map(|(i, t)| Milestone {
                            id: i as u64 + 1,
                            title: (*t).to_string(),
                        })
                        .collect(),
                ),
                creates: RefCell::new(0),
                issue_pages: Vec::new(),
            }
        }
    }

    impl Tracker for FakeTracker {
        fn create_issue(&self, _: u64, _: &NewIssue) -> Result<Issue, GitLabError> {
            unimplemented!("not exercised")
        }
        fn delete_issue(&self, _: u64, _: u64) -> Result<(), GitLabError> {
            Ok(())
        }
        fn list_issues_page(&self, _: u64, page: u32) -> Result<Vec<Issue>, GitLabError> {
            Ok(self
                .issue_pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default())
        }
        fn list_milestones(&self, _: MilestoneScope) -> Result<Vec<Milestone>, GitLabError> {
            Ok(self.milestones.borrow().clone())
        }
        fn create_milestone(
            &self,
            _: MilestoneScope,
            title: &str,
            _: Option<&str>,
        ) -> Result<Milestone, GitLabError> {
            *self.creates.borrow_mut() += 1;
            let milestone = Milestone {
                id: 99,
                title: title.to_string(),
            };
            self.milestones.borrow_mut().push(milestone.clone());
            Ok(milestone)
        }
        fn link_issues(&self, _: u64, _: u64, _: u64, _: u64) -> Result<(), GitLabError> {
            Ok(())
        }
        fn set_time_estimate(&self, _: u64, _: u64, _: &str) -> Result<(), GitLabError> {
            Ok(())
        }
        fn add_spent_time(&self, _: u64, _: u64, _: &str) -> Result<(), GitLabError> {
            Ok(())
        }
        fn award_emoji(&self, _: u64, _: u64, _: &str) -> Result<(), GitLabError> {
            Ok(())
        }
        fn project_name(&self, _: u64) -> Result<String, GitLabError> {
            Ok("Fake".to_string())
        }
    }

    #[test]
    fn test_find_milestone_case_insensitive() {
        let fake = FakeTracker::with_milestones(&["Sprint One", "Release 1.0"]);
        let outcome = find_or_create_milestone(
            &fake,
            MilestoneScope::Group(1),
            "  release 1.0 ",
            None,
        )
        .unwrap();
        assert!(matches!(outcome, MilestoneOutcome::Found(ref m) if m.title == "Release 1.0"));
        assert_eq!(*fake.creates.borrow(), 0);
    }

    #[test]
    fn test_create_milestone_when_absent() {
        let fake = FakeTracker::with_milestones(&["Other"]);
        let outcome =
            find_or_create_milestone(&fake, MilestoneScope::Project(1), "Sprint Two", None)
                .unwrap();
        assert!(matches!(outcome, MilestoneOutcome::Created(ref m) if m.title == "Sprint Two"));
        assert_eq!(*fake.creates.borrow(), 1);

        // A second lookup now finds it instead of re-creating
        let outcome =
            find_or_create_milestone(&fake, MilestoneScope::Project(1), "sprint two", None)
                .unwrap();
        assert!(matches!(outcome, MilestoneOutcome::Found(_)));
        assert_eq!(*fake.creates.borrow(), 1);
    }

    #[test]
    fn test_list_all_issues_paginates_until_empty() {
        let mut fake = FakeTracker::with_milestones(&[]);
        let issue = |iid| Issue {
            iid,
            project_id: 1,
            title: String::new(),
            web_url: String::new(),
        };
        fake.issue_pages = vec![vec![issue(1), issue(2)], vec![issue(3)], vec![]];
        let all = list_all_issues(&fake, 1).unwrap();
        let iids: Vec<u64> = all.iter().map(|i| i.iid).collect();
        assert_eq!(iids, vec![1, 2, 3]);
    }
}
