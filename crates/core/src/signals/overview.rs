//! Repository overview computation
//!
//! Headline counters plus a five-week activity trend and a qualitative
//! narrative comparing the most recent two weeks against the prior two.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use repopulse_domain::constants::{
    ACTIVE_WINDOW_DAYS, ATTENTION_WARNING_DAYS, ISSUE_OUTPACE_RATIO, PR_KEEPUP_RATIO,
    STALE_PR_THRESHOLD_HOURS, TRAILING_WINDOW_DAYS, TREND_WEEKS,
};
use repopulse_domain::{
    ActivityTrend, Contributor, Issue, IssueAgeBuckets, IssueState, OverviewReport, PullRequest,
    PullRequestState, Repository, Result, TrendNarrative,
};

use super::author;
use super::bots::BotPolicy;
use super::stats::{median_or_zero, round1};
use std::collections::HashMap;

/// Compute the overview report from stored rows.
pub fn compute(
    repository: &Repository,
    prs: &[PullRequest],
    issues: &[Issue],
    contributors: &HashMap<i64, Contributor>,
    bots: &dyn BotPolicy,
    now: DateTime<Utc>,
) -> Result<OverviewReport> {
    let active_cutoff = now - Duration::days(ACTIVE_WINDOW_DAYS);
    let window_start = now - Duration::days(TRAILING_WINDOW_DAYS);

    // Distinct human authors with an item created in the active window.
    let mut active_authors: HashSet<i64> = HashSet::new();
    for pr in prs.iter().filter(|pr| pr.created_at > active_cutoff) {
        if !bots.is_bot(&author(contributors, pr.author_id)?.login) {
            active_authors.insert(pr.author_id);
        }
    }
    for issue in issues.iter().filter(|i| i.created_at > active_cutoff) {
        if !bots.is_bot(&author(contributors, issue.author_id)?.login) {
            active_authors.insert(issue.author_id);
        }
    }

    let open_prs = prs.iter().filter(|pr| pr.state == PullRequestState::Open).count() as i64;

    // Only unreviewed PRs carry a wait time, so a reviewed-but-slow PR is
    // never stale.
    let stale_prs = prs
        .iter()
        .filter(|pr| pr.state == PullRequestState::Open)
        .filter(|pr| pr.review.wait_hours().is_some_and(|w| w > STALE_PR_THRESHOLD_HOURS))
        .count() as i64;

    let median_review_hours = median_or_zero(
        prs.iter()
            .filter(|pr| pr.created_at >= window_start)
            .filter_map(|pr| pr.review.latency_hours())
            .collect(),
    );

    let unanswered: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.state == IssueState::Open && !i.has_maintainer_response)
        .collect();

    let mut issue_age_buckets = IssueAgeBuckets::default();
    for issue in &unanswered {
        let age_days = (now - issue.created_at).num_days();
        if age_days < ATTENTION_WARNING_DAYS {
            issue_age_buckets.under_7d += 1;
        } else if age_days < ACTIVE_WINDOW_DAYS {
            issue_age_buckets.from_7_to_30d += 1;
        } else {
            issue_age_buckets.over_30d += 1;
        }
    }

    let activity_trend = weekly_trend(prs, issues, now);
    let narrative = narrative(&activity_trend);

    Ok(OverviewReport {
        active_contributors: active_authors.len() as i64,
        open_prs,
        stale_prs,
        median_review_hours,
        median_review_label: review_label(median_review_hours),
        unanswered_issues: unanswered.len() as i64,
        issue_age_buckets,
        activity_trend,
        narrative,
        last_updated: repository.last_synced_at.unwrap_or(now),
    })
}

/// Creation counts per week over the last five weeks, oldest first.
fn weekly_trend(prs: &[PullRequest], issues: &[Issue], now: DateTime<Utc>) -> ActivityTrend {
    let mut weeks = Vec::with_capacity(TREND_WEEKS as usize);
    let mut pr_counts = Vec::with_capacity(TREND_WEEKS as usize);
    let mut issue_counts = Vec::with_capacity(TREND_WEEKS as usize);

    for i in (0..TREND_WEEKS).rev() {
        let end = now - Duration::weeks(i);
        let start = now - Duration::weeks(i + 1);
        weeks.push(format!("W{}", TREND_WEEKS - i));
        pr_counts.push(
            prs.iter().filter(|pr| pr.created_at >= start && pr.created_at < end).count() as i64,
        );
        issue_counts.push(
            issues.iter().filter(|is| is.created_at >= start && is.created_at < end).count()
                as i64,
        );
    }

    ActivityTrend { weeks, prs: pr_counts, issues: issue_counts }
}

/// Velocity of the most recent two weeks against the prior two; a zero
/// prior period clamps the denominator to one.
fn velocity(counts: &[i64]) -> (i64, i64, f64) {
    let recent = counts[3] + counts[4];
    let prev = counts[1] + counts[2];
    (recent, prev, recent as f64 / prev.max(1) as f64)
}

fn narrative(trend: &ActivityTrend) -> TrendNarrative {
    let (recent_prs, prev_prs, pr_velocity) = velocity(&trend.prs);
    let (_, _, issue_velocity) = velocity(&trend.issues);

    if issue_velocity > ISSUE_OUTPACE_RATIO * pr_velocity {
        TrendNarrative::IssuesOutpacing
    } else if pr_velocity > PR_KEEPUP_RATIO * issue_velocity {
        TrendNarrative::KeepingUp
    } else if recent_prs == 0 && prev_prs > 0 {
        TrendNarrative::Stalled
    } else {
        TrendNarrative::Stable
    }
}

/// Human form of the median review figure.
fn review_label(hours: f64) -> String {
    if hours == 0.0 {
        "N/A".to_string()
    } else if hours < 24.0 {
        "< 24h".to_string()
    } else if hours < 48.0 {
        format!("{} days", round1(hours / 24.0))
    } else {
        format!("{} weeks", round1(hours / 168.0))
    }
}
