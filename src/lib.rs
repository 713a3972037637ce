//! glsync: Jira → GitLab issue migration
//!
//! A one-shot operator tool that replays a Jira CSV export into GitLab,
//! creating one master issue per exported record plus linked child issues
//! in per-team projects.

pub mod cli;
pub mod core;
pub mod gitlab;
pub mod sync;
