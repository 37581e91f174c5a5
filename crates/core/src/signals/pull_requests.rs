//! Pull request bottleneck computation
//!
//! Surfaces where review capacity is falling behind: the stuck-PR counters,
//! an actionable attention queue, the first-time contributor experience,
//! and the trailing-90-day review flow.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use repopulse_domain::constants::{
    ATTENTION_CRITICAL_DAYS, ATTENTION_QUEUE_CAP, ATTENTION_WARNING_DAYS, TRAILING_WINDOW_DAYS,
};
use repopulse_domain::{
    Contributor, FirstTimePrs, HealthStatus, PrAttentionItem, PrBottleneckSummary,
    PrBottlenecksReport, PullRequest, PullRequestState, Repository, Result, ReviewFlow,
};

use super::author;
use super::stats::median_or_zero;

/// Age-only severity used by both attention queues.
pub(crate) fn attention_status(age_days: i64) -> HealthStatus {
    if age_days > ATTENTION_CRITICAL_DAYS {
        HealthStatus::Critical
    } else if age_days > ATTENTION_WARNING_DAYS {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

/// Compute the PR bottleneck report from stored rows.
pub fn compute(
    repository: &Repository,
    prs: &[PullRequest],
    contributors: &HashMap<i64, Contributor>,
    now: DateTime<Utc>,
) -> Result<PrBottlenecksReport> {
    let window_start = now - Duration::days(TRAILING_WINDOW_DAYS);

    let open_prs = prs.iter().filter(|pr| pr.state == PullRequestState::Open).count() as i64;
    let unreviewed: Vec<&PullRequest> = prs
        .iter()
        .filter(|pr| pr.state == PullRequestState::Open && !pr.review.has_review())
        .collect();

    let waiting_over_7d = unreviewed
        .iter()
        .filter(|pr| (now - pr.created_at).num_days() > ATTENTION_WARNING_DAYS)
        .count() as i64;

    let recent_latencies: Vec<f64> = prs
        .iter()
        .filter(|pr| pr.created_at >= window_start)
        .filter_map(|pr| pr.review.latency_hours())
        .collect();

    let summary = PrBottleneckSummary {
        open_prs,
        waiting_over_7d,
        median_review_hours: median_or_zero(recent_latencies),
        unreviewed_prs: unreviewed.len() as i64,
    };

    let mut attention_queue = Vec::with_capacity(unreviewed.len());
    for pr in &unreviewed {
        let who = author(contributors, pr.author_id)?;
        let age_days = (now - pr.created_at).num_days();
        attention_queue.push(PrAttentionItem {
            number: pr.number,
            title: pr.title.clone(),
            author: who.login.clone(),
            age_days,
            status: attention_status(age_days),
            html_url: format!("{}/pull/{}", repository.url, pr.number),
        });
    }
    attention_queue.sort_by(|a, b| b.age_days.cmp(&a.age_days));
    attention_queue.truncate(ATTENTION_QUEUE_CAP);

    // Each author's earliest PR is their first-time experience.
    let mut first_by_author: HashMap<i64, &PullRequest> = HashMap::new();
    for pr in prs {
        first_by_author
            .entry(pr.author_id)
            .and_modify(|current| {
                if pr.created_at < current.created_at {
                    *current = pr;
                }
            })
            .or_insert(pr);
    }

    let waiting_count = first_by_author
        .values()
        .filter(|pr| {
            pr.state == PullRequestState::Open
                && !pr.review.has_review()
                && (now - pr.created_at).num_days() > ATTENTION_WARNING_DAYS
        })
        .count() as i64;
    let first_latencies: Vec<f64> =
        first_by_author.values().filter_map(|pr| pr.review.latency_hours()).collect();

    let first_time_prs = FirstTimePrs {
        waiting_count,
        median_review_hours: median_or_zero(first_latencies),
    };

    let mut review_flow = ReviewFlow { waiting_for_review: 0, waiting_for_merge: 0, merged: 0 };
    for pr in prs.iter().filter(|pr| pr.created_at >= window_start) {
        if !pr.review.has_review() {
            review_flow.waiting_for_review += 1;
        } else if pr.state == PullRequestState::Open {
            review_flow.waiting_for_merge += 1;
        }
        if pr.merged_at.is_some() {
            review_flow.merged += 1;
        }
    }

    Ok(PrBottlenecksReport { summary, attention_queue, first_time_prs, review_flow })
}
