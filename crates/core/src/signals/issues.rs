//! Issue health computation
//!
//! Measures the unanswered backlog, how long open issues have been aging,
//! triage quality over the trailing window, and the first-time issue
//! author experience.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use repopulse_domain::constants::{
    ACTIVE_WINDOW_DAYS, ATTENTION_QUEUE_CAP, ATTENTION_WARNING_DAYS, FAST_RESPONSE_HOURS,
    TRAILING_WINDOW_DAYS,
};
use repopulse_domain::{
    Contributor, FirstTimeIssues, Issue, IssueAgeBuckets, IssueAttentionItem, IssueHealthSummary,
    IssueState, IssuesHealthReport, Repository, Result,
};

use super::author;
use super::pull_requests::attention_status;
use super::stats::{median, percentage};

/// Compute the issue health report from stored rows.
pub fn compute(
    repository: &Repository,
    issues: &[Issue],
    contributors: &HashMap<i64, Contributor>,
    now: DateTime<Utc>,
) -> Result<IssuesHealthReport> {
    let window_start = now - Duration::days(TRAILING_WINDOW_DAYS);

    let open: Vec<&Issue> = issues.iter().filter(|i| i.state == IssueState::Open).collect();
    let unanswered: Vec<&&Issue> =
        open.iter().filter(|i| !i.has_maintainer_response).collect();

    let older_than_30d = open
        .iter()
        .filter(|i| (now - i.created_at).num_days() > ACTIVE_WINDOW_DAYS)
        .count() as i64;

    // The responded trailing-90-day sample anchors both the median and the
    // fast-response share.
    let recent_responses: Vec<f64> = issues
        .iter()
        .filter(|i| i.created_at >= window_start)
        .filter_map(|i| i.time_to_first_response)
        .collect();

    let summary = IssueHealthSummary {
        open_issues: open.len() as i64,
        unanswered: unanswered.len() as i64,
        median_first_response_hours: median(recent_responses.clone()),
        older_than_30d,
    };

    let mut unanswered_rows = Vec::with_capacity(unanswered.len());
    for issue in &unanswered {
        let who = author(contributors, issue.author_id)?;
        let age_days = (now - issue.created_at).num_days();
        unanswered_rows.push(IssueAttentionItem {
            number: issue.number,
            title: issue.title.clone(),
            author: who.login.clone(),
            age_days,
            status: attention_status(age_days),
            html_url: format!("{}/issues/{}", repository.url, issue.number),
        });
    }
    unanswered_rows.sort_by(|a, b| b.age_days.cmp(&a.age_days));
    unanswered_rows.truncate(ATTENTION_QUEUE_CAP);

    let mut age_buckets = IssueAgeBuckets::default();
    for issue in &open {
        let age_days = (now - issue.created_at).num_days();
        if age_days < ATTENTION_WARNING_DAYS {
            age_buckets.under_7d += 1;
        } else if age_days <= ACTIVE_WINDOW_DAYS {
            age_buckets.from_7_to_30d += 1;
        } else {
            age_buckets.over_30d += 1;
        }
    }

    // Each author's earliest issue, across all stored states.
    let mut first_by_author: HashMap<i64, &Issue> = HashMap::new();
    for issue in issues {
        first_by_author
            .entry(issue.author_id)
            .and_modify(|current| {
                if issue.created_at < current.created_at {
                    *current = issue;
                }
            })
            .or_insert(issue);
    }

    let recent: Vec<&Issue> = issues.iter().filter(|i| i.created_at >= window_start).collect();
    let first_time_recent = recent
        .iter()
        .filter(|i| {
            first_by_author.get(&i.author_id).is_some_and(|first| first.id == i.id)
        })
        .count();

    let percent_fast_response = if recent_responses.is_empty() {
        None
    } else {
        let fast = recent_responses.iter().filter(|h| **h < FAST_RESPONSE_HOURS).count();
        Some(percentage(fast, recent_responses.len()))
    };

    let triage_quality = repopulse_domain::TriageQuality {
        percent_labelled: 0.0,
        percent_fast_response,
        percent_first_time: percentage(first_time_recent, recent.len()),
    };

    let first_unanswered = first_by_author
        .values()
        .filter(|i| i.state == IssueState::Open && !i.has_maintainer_response)
        .count() as i64;
    let first_responses: Vec<f64> =
        first_by_author.values().filter_map(|i| i.time_to_first_response).collect();

    let first_time_issues = FirstTimeIssues {
        unanswered_count: first_unanswered,
        median_response_hours: median(first_responses),
    };

    Ok(IssuesHealthReport {
        summary,
        unanswered_issues: unanswered_rows,
        age_buckets,
        triage_quality,
        first_time_issues,
    })
}
