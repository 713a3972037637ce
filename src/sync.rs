//! Sync orchestrator: drives the per-record pipeline against the tracker.
//!
//! Each record is processed to completion before the next begins: milestone,
//! then the master issue in the primary project, then one linked child issue
//! per mapped identity. A rejected master skips the rest of its record and
//! the batch continues; a failed child only skips that identity. Advisory
//! calls (time tracking, votes, links, milestones) warn and degrade, never
//! abort.

use console::style;
use std::collections::HashMap;

use crate::core::config::{ChildTitlePolicy, Config, ConfigError};
use crate::core::ingest::SourceRecord;
use crate::core::normalize::NormalizedFields;
use crate::gitlab::{
    find_or_create_milestone, Issue, Milestone, MilestoneOutcome, NewIssue, Tracker,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Plan and print without any remote call
    pub dry_run: bool,
    /// Suppress progress lines; warnings still print
    pub quiet: bool,
    /// Also print advisory successes (time tracking, votes, milestones)
    pub verbose: bool,
}

/// Counters for the end-of-run summary
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub records: usize,
    pub masters_created: usize,
    pub masters_failed: usize,
    pub children_created: usize,
    pub children_failed: usize,
    pub links_created: usize,
    pub identities_skipped: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Copy)]
struct CreatedIssue {
    project: u64,
    iid: u64,
}

pub struct SyncEngine<'a> {
    config: &'a Config,
    tracker: &'a dyn Tracker,
    options: SyncOptions,
    master_project: u64,
    /// Source key → master issue, for wiring parent-record links in-run
    created: HashMap<String, CreatedIssue>,
    /// Milestone cache, keyed by lowercased title: at most one create
    /// attempt per (scope, title) per run
    milestones: HashMap<String, Option<Milestone>>,
    report: SyncReport,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        config: &'a Config,
        tracker: &'a dyn Tracker,
        options: SyncOptions,
    ) -> Result<Self, ConfigError> {
        let master_project = config.require_master_project()?;
        Ok(Self {
            config,
            tracker,
            options,
            master_project,
            created: HashMap::new(),
            milestones: HashMap::new(),
            report: SyncReport::default(),
        })
    }

    pub fn run(mut self, records: &[SourceRecord]) -> SyncReport {
        let total = records.len();
        for (idx, record) in records.iter().enumerate() {
            self.report.records += 1;
            self.sync_record(idx + 1, total, record);
        }
        self.report
    }

    fn sync_record(&mut self, index: usize, total: usize, record: &SourceRecord) {
        let fields = NormalizedFields::from_record(record, self.config);
        let key_display = if record.key.is_empty() {
            "(no key)"
        } else {
            record.key.as_str()
        };

        if !self.options.quiet {
            println!();
            println!(
                "--- {}/{}: processing {} - {} ---",
                index, total, key_display, fields.title
            );
            let identities = if record.identities.is_empty() {
                "none".to_string()
            } else {
                record.identities.join(", ")
            };
            println!("{} related identities: {}", style("→").blue(), identities);
        }

        if self.options.dry_run {
            self.plan_record(record, &fields);
            return;
        }

        let milestone = self.resolve_milestone(&fields);

        let draft = self.issue_draft(
            fields.title.clone(),
            fields.description.clone(),
            &fields,
            record.assignee.as_deref(),
            milestone.as_ref(),
        );
        let master = match self.tracker.create_issue(self.master_project, &draft) {
            Ok(issue) => {
                self.report.masters_created += 1;
                if !self.options.quiet {
                    println!(
                        "{} Master issue created: #{} {}",
                        style("✓").green(),
                        issue.iid,
                        fields.title
                    );
                }
                issue
            }
            Err(err) => {
                // Record-fatal: no child or link calls for this record
                self.warn(format!("Master issue rejected ({key_display}): {err}"));
                self.report.masters_failed += 1;
                return;
            }
        };

        self.apply_time_tracking(self.master_project, master.iid, &fields);

        if fields.votes > 0 {
            // One marker regardless of count; the remote rejects duplicate
            // awards from the same user anyway
            match self
                .tracker
                .award_emoji(self.master_project, master.iid, "thumbsup")
            {
                Ok(()) => {
                    if self.options.verbose {
                        println!(
                            "  {} Vote marker added ({} source votes)",
                            style("✓").green(),
                            fields.votes
                        );
                    }
                }
                Err(err) => self.warn(format!("Vote marker not added: {err}")),
            }
        }

        if let Some(parent_key) = record.parent.as_deref() {
            let parent = self.created.get(parent_key).copied();
            if let Some(parent) = parent {
                match self.tracker.link_issues(
                    self.master_project,
                    master.iid,
                    parent.project,
                    parent.iid,
                ) {
                    Ok(()) => {
                        self.report.links_created += 1;
                        if !self.options.quiet {
                            println!(
                                "  {} Linked to parent record {}",
                                style("✓").green(),
                                parent_key
                            );
                        }
                    }
                    Err(err) => self.warn(format!("Parent link failed ({parent_key}): {err}")),
                }
            }
        }

        if !record.key.is_empty() {
            self.created.insert(
                record.key.clone(),
                CreatedIssue {
                    project: self.master_project,
                    iid: master.iid,
                },
            );
        }

        for identity in &record.identities {
            self.sync_child(record, &fields, &master, milestone.as_ref(), identity);
        }
    }

    fn sync_child(
        &mut self,
        record: &SourceRecord,
        fields: &NormalizedFields,
        master: &Issue,
        milestone: Option<&Milestone>,
        identity: &str,
    ) {
        let Some(&project) = self.config.teams.get(identity) else {
            // Identity-fatal only: siblings still process
            self.warn(format!(
                "No project mapped for identity '{identity}'; skipping"
            ));
            self.report.identities_skipped += 1;
            return;
        };

        let decoration = match self.config.child_title_policy() {
            ChildTitlePolicy::ProjectName => self
                .tracker
                .project_name(project)
                .unwrap_or_else(|_| "Unknown project".to_string()),
            ChildTitlePolicy::Identity => identity.to_string(),
        };
        let title = format!("{} ({})", fields.title, decoration);
        let description = format!(
            "**Master issue:** project {}, iid {} ({})\n\n--- Original description ---\n\n{}",
            self.master_project,
            master.iid,
            master.web_url,
            record.description.trim()
        );

        let draft = self.issue_draft(
            title.clone(),
            description,
            fields,
            Some(identity),
            milestone,
        );
        let child = match self.tracker.create_issue(project, &draft) {
            Ok(issue) => {
                self.report.children_created += 1;
                issue
            }
            Err(err) => {
                self.warn(format!("Child issue rejected (identity {identity}): {err}"));
                self.report.children_failed += 1;
                return;
            }
        };

        self.apply_time_tracking(project, child.iid, fields);

        match self
            .tracker
            .link_issues(self.master_project, master.iid, project, child.iid)
        {
            Ok(()) => {
                self.report.links_created += 1;
                if !self.options.quiet {
                    println!(
                        "  {} Child issue created and linked: {}",
                        style("✓").green(),
                        title
                    );
                }
            }
            Err(err) => {
                if !self.options.quiet {
                    println!("  {} Child issue created: {}", style("✓").green(), title);
                }
                self.warn(format!("Link failed for '{title}': {err}"));
            }
        }
    }

    fn issue_draft(
        &self,
        title: String,
        description: String,
        fields: &NormalizedFields,
        assignee: Option<&str>,
        milestone: Option<&Milestone>,
    ) -> NewIssue {
        NewIssue {
            title,
            description,
            labels: fields.labels_str(),
            due_date: fields.due_date.clone(),
            assignee_ids: assignee
                .and_then(|a| self.config.assignees.get(a))
                .map(|&id| vec![id]),
            milestone_id: milestone.map(|m| m.id),
        }
    }

    /// Milestone find-or-create with an in-run cache so one (scope, title)
    /// is created at most once per run. Failure degrades to no milestone.
    fn resolve_milestone(&mut self, fields: &NormalizedFields) -> Option<Milestone> {
        let Ok(scope) = self.config.milestone_scope() else {
            return None;
        };
        let cache_key = fields.title.trim().to_lowercase();
        if let Some(cached) = self.milestones.get(&cache_key) {
            return cached.clone();
        }

        let resolved = match find_or_create_milestone(
            self.tracker,
            scope,
            &fields.title,
            fields.due_date.as_deref(),
        ) {
            Ok(MilestoneOutcome::Created(m)) => {
                if !self.options.quiet {
                    println!("{} Milestone created: {}", style("✓").green(), m.title);
                }
                Some(m)
            }
            Ok(MilestoneOutcome::Found(m)) => {
                if self.options.verbose {
                    println!("  {} Milestone found: {}", style("✓").green(), m.title);
                }
                Some(m)
            }
            Err(err) => {
                self.warn(format!(
                    "Milestone unavailable for '{}': {err}",
                    fields.title
                ));
                None
            }
        };
        self.milestones.insert(cache_key, resolved.clone());
        resolved
    }

    fn apply_time_tracking(&mut self, project: u64, iid: u64, fields: &NormalizedFields) {
        if let Some(estimate) = fields.estimate.as_deref() {
            match self.tracker.set_time_estimate(project, iid, estimate) {
                Ok(()) => {
                    if self.options.verbose {
                        println!("  {} Time estimate set: {estimate}", style("✓").green());
                    }
                }
                Err(err) => self.warn(format!("Time estimate not set: {err}")),
            }
        }
        if let Some(spent) = fields.spent.as_deref() {
            match self.tracker.add_spent_time(project, iid, spent) {
                Ok(()) => {
                    if self.options.verbose {
                        println!("  {} Spent time added: {spent}", style("✓").green());
                    }
                }
                Err(err) => self.warn(format!("Spent time not added: {err}")),
            }
        }
    }

    /// Dry-run path: print the plan, touch nothing remote
    fn plan_record(&mut self, record: &SourceRecord, fields: &NormalizedFields) {
        println!(
            "{} Would create master issue in project {}: {}",
            style("○").dim(),
            self.master_project,
            fields.title
        );
        self.report.masters_created += 1;
        for identity in &record.identities {
            match self.config.teams.get(identity) {
                Some(&project) => {
                    println!(
                        "  {} Would create child issue in project {} for '{}'",
                        style("○").dim(),
                        project,
                        identity
                    );
                    self.report.children_created += 1;
                    self.report.links_created += 1;
                }
                None => {
                    self.warn(format!(
                        "No project mapped for identity '{identity}'; skipping"
                    ));
                    self.report.identities_skipped += 1;
                }
            }
        }
    }

    fn warn(&mut self, message: impl AsRef<str>) {
        eprintln!("{} {}", style("⚠").yellow(), message.as_ref());
        self.report.warnings += 1;
    }
}
