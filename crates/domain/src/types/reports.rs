//! Signal report types returned to the serving layer
//!
//! This module centralizes the result structures of the four signal
//! computations:
//! - Contributor health (churn, activity buckets, first-time experience)
//! - PR bottlenecks (attention queue, review flow)
//! - Issue health (unanswered backlog, aging, triage quality)
//! - Overview (headline counters, activity trend, narrative)
//!
//! All structs are transient computation results; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/* -------------------------------------------------------------------------- */
/* Shared display primitives                                                  */
/* -------------------------------------------------------------------------- */

/// Traffic-light display status used across reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

/// Kind of activity that most recently touched a contributor aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PrOpened,
    IssueOpened,
}

/* -------------------------------------------------------------------------- */
/* Contributor health                                                         */
/* -------------------------------------------------------------------------- */

/// Bucket totals for the contributor population.
///
/// `new + returning == active`; contributors whose last activity falls in
/// the 45-30 day band count in neither `churned` nor the active buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorSummary {
    pub new: i64,
    pub returning: i64,
    pub churned: i64,
    pub active: i64,
}

/// Review latency experienced on first pull requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstTimeExperience {
    pub median_hours: f64,
    pub worst_case_hours: f64,
    pub severity: HealthStatus,
}

/// One row of the active-contributor table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveContributor {
    pub login: String,
    pub avatar_url: String,
    pub last_activity_at: DateTime<Utc>,
    pub activity_kind: ActivityKind,
    pub status: HealthStatus,
}

/// Contributor health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorsHealthReport {
    pub summary: ContributorSummary,
    pub first_time_experience: FirstTimeExperience,
    /// Sorted by last activity, most recent first.
    pub active_contributors: Vec<ActiveContributor>,
    pub last_updated: DateTime<Utc>,
}

/* -------------------------------------------------------------------------- */
/* PR bottlenecks                                                             */
/* -------------------------------------------------------------------------- */

/// Headline counters for the PR bottleneck report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrBottleneckSummary {
    pub open_prs: i64,
    /// Open, unreviewed, and older than 7 whole days.
    pub waiting_over_7d: i64,
    /// Median review latency over the trailing-90-day reviewed sample;
    /// 0.0 when the sample is empty.
    pub median_review_hours: f64,
    pub unreviewed_prs: i64,
}

/// One actionable row of the PR attention queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrAttentionItem {
    pub number: i64,
    pub title: String,
    pub author: String,
    pub age_days: i64,
    /// Age-based only; review state deliberately does not factor in here.
    pub status: HealthStatus,
    pub html_url: String,
}

/// First-time contributor PR experience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstTimePrs {
    /// First PRs currently open, unreviewed, and older than 7 days.
    pub waiting_count: i64,
    /// Median recorded latency over first PRs; 0.0 when empty.
    pub median_review_hours: f64,
}

/// Trailing-90-day review flow breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFlow {
    pub waiting_for_review: i64,
    pub waiting_for_merge: i64,
    pub merged: i64,
}

/// PR bottleneck report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrBottlenecksReport {
    pub summary: PrBottleneckSummary,
    /// Sorted by age descending, capped at 50 rows.
    pub attention_queue: Vec<PrAttentionItem>,
    pub first_time_prs: FirstTimePrs,
    pub review_flow: ReviewFlow,
}

/* -------------------------------------------------------------------------- */
/* Issue health                                                               */
/* -------------------------------------------------------------------------- */

/// Headline counters for the issue health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueHealthSummary {
    pub open_issues: i64,
    pub unanswered: i64,
    /// Median first-response latency over the trailing-90-day responded
    /// sample; `None` when the sample is empty (issue medians are nullable,
    /// unlike PR medians).
    pub median_first_response_hours: Option<f64>,
    pub older_than_30d: i64,
}

/// One actionable row of the unanswered-issue queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueAttentionItem {
    pub number: i64,
    pub title: String,
    pub author: String,
    pub age_days: i64,
    pub status: HealthStatus,
    pub html_url: String,
}

/// Exhaustive, mutually-exclusive age histogram by creation age.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueAgeBuckets {
    pub under_7d: i64,
    pub from_7_to_30d: i64,
    pub over_30d: i64,
}

/// Triage quality block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageQuality {
    /// Fixed placeholder; labels are not stored in the snapshot schema.
    pub percent_labelled: f64,
    /// Share of the 90-day responded sample answered within 48 hours.
    pub percent_fast_response: Option<f64>,
    /// Share of trailing-90-day issues that are their author's first ever.
    pub percent_first_time: f64,
}

/// First-time issue author experience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstTimeIssues {
    /// First issues currently open and unanswered.
    pub unanswered_count: i64,
    pub median_response_hours: Option<f64>,
}

/// Issue health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesHealthReport {
    pub summary: IssueHealthSummary,
    /// Sorted by age descending, capped at 50 rows.
    pub unanswered_issues: Vec<IssueAttentionItem>,
    pub age_buckets: IssueAgeBuckets,
    pub triage_quality: TriageQuality,
    pub first_time_issues: FirstTimeIssues,
}

/* -------------------------------------------------------------------------- */
/* Overview                                                                   */
/* -------------------------------------------------------------------------- */

/// Weekly creation counts, oldest to newest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTrend {
    pub weeks: Vec<String>,
    pub prs: Vec<i64>,
    pub issues: Vec<i64>,
}

/// Qualitative comparison of the most recent two weeks against the prior
/// two, per item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendNarrative {
    IssuesOutpacing,
    KeepingUp,
    Stalled,
    Stable,
}

impl TrendNarrative {
    /// Headline for the serving layer.
    pub fn title(self) -> &'static str {
        match self {
            Self::IssuesOutpacing => "In the last 2 weeks, issues increased faster than PRs.",
            Self::KeepingUp => "Maintainer throughput is keeping up with demand.",
            Self::Stalled => "Maintainer activity has stalled in the last 2 weeks.",
            Self::Stable => "Activity is stable.",
        }
    }

    /// Supporting sentence for the serving layer.
    pub fn description(self) -> &'static str {
        match self {
            Self::IssuesOutpacing => {
                "If this trend continues, response times may increase and satisfaction may decline."
            }
            Self::KeepingUp => {
                "PR closures and updates are trending positively compared to incoming issues."
            }
            Self::Stalled => "No PR activity recorded recently despite previous engagement.",
            Self::Stable => "Contributor demand and maintainer throughput are balanced.",
        }
    }
}

/// Repository overview report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewReport {
    pub active_contributors: i64,
    pub open_prs: i64,
    /// Open PRs whose review wait exceeds 336 hours. Only unreviewed PRs
    /// carry a wait time, so a reviewed-but-slow PR is never stale.
    pub stale_prs: i64,
    pub median_review_hours: f64,
    /// Human label: "N/A" when no sample, exact hours under 24h, days
    /// under 48h, weeks otherwise.
    pub median_review_label: String,
    pub unanswered_issues: i64,
    /// Histogram over unanswered issues only.
    pub issue_age_buckets: IssueAgeBuckets,
    pub activity_trend: ActivityTrend,
    pub narrative: TrendNarrative,
    pub last_updated: DateTime<Utc>,
}
