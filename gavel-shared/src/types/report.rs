use serde::{Deserialize, Serialize};

use super::target::Target;

/// One moderator report on a thing: free-text reason plus who filed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModReport {
    pub reason: String,
    pub moderator: String,
}

/// A thing from the report queue together with its moderator reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reported {
    pub target: Target,
    pub reports: Vec<ModReport>,
}

/// One page of the moderator-report queue.
#[derive(Debug, Clone, Default)]
pub struct ReportPage {
    pub items: Vec<Reported>,
    /// Pagination cursor; `None` on the last page.
    pub after: Option<String>,
}
