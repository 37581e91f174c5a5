//! Contributor health computation
//!
//! Aggregates per-author activity from stored PRs and issues, buckets the
//! population into new / returning / churned, and measures the review
//! latency first-time contributors experienced.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use repopulse_domain::constants::{
    ACTIVE_CRITICAL_DAYS, ACTIVE_WARNING_DAYS, ACTIVE_WINDOW_DAYS, CHURN_WINDOW_DAYS,
    FIRST_REVIEW_CRITICAL_HOURS, FIRST_REVIEW_WARNING_HOURS,
};
use repopulse_domain::{
    ActiveContributor, ActivityKind, Contributor, ContributorSummary, ContributorsHealthReport,
    FirstTimeExperience, HealthStatus, Issue, PullRequest, Result, ReviewState,
};

use super::author;
use super::bots::BotPolicy;
use super::stats::median_or_zero;

struct Activity {
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    last_kind: ActivityKind,
    /// Creation time and review state of the author's earliest PR.
    earliest_pr: Option<(DateTime<Utc>, ReviewState)>,
}

impl Activity {
    fn new(at: DateTime<Utc>, kind: ActivityKind) -> Self {
        Self { first: at, last: at, last_kind: kind, earliest_pr: None }
    }

    fn record(&mut self, at: DateTime<Utc>, kind: ActivityKind) {
        if at < self.first {
            self.first = at;
        }
        if at > self.last {
            self.last = at;
            self.last_kind = kind;
        }
    }
}

/// Compute the contributor health report from stored rows.
pub fn compute(
    prs: &[PullRequest],
    issues: &[Issue],
    contributors: &HashMap<i64, Contributor>,
    bots: &dyn BotPolicy,
    last_updated: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<ContributorsHealthReport> {
    let mut activity: HashMap<i64, Activity> = HashMap::new();

    for pr in prs {
        let who = author(contributors, pr.author_id)?;
        if bots.is_bot(&who.login) {
            continue;
        }
        let entry = activity
            .entry(pr.author_id)
            .and_modify(|a| a.record(pr.created_at, ActivityKind::PrOpened))
            .or_insert_with(|| Activity::new(pr.created_at, ActivityKind::PrOpened));
        match entry.earliest_pr {
            Some((at, _)) if at <= pr.created_at => {}
            _ => entry.earliest_pr = Some((pr.created_at, pr.review)),
        }
    }

    for issue in issues {
        let who = author(contributors, issue.author_id)?;
        if bots.is_bot(&who.login) {
            continue;
        }
        activity
            .entry(issue.author_id)
            .and_modify(|a| a.record(issue.created_at, ActivityKind::IssueOpened))
            .or_insert_with(|| Activity::new(issue.created_at, ActivityKind::IssueOpened));
    }

    let active_cutoff = now - Duration::days(ACTIVE_WINDOW_DAYS);
    let churn_cutoff = now - Duration::days(CHURN_WINDOW_DAYS);

    let mut summary = ContributorSummary { new: 0, returning: 0, churned: 0, active: 0 };
    let mut active_rows = Vec::new();

    for (author_id, agg) in &activity {
        // Exactly 30 days old is inactive; the 45-30 day band is neither
        // active nor churned.
        if agg.last > active_cutoff {
            summary.active += 1;
            if agg.first > active_cutoff {
                summary.new += 1;
            } else {
                summary.returning += 1;
            }

            let who = author(contributors, *author_id)?;
            let idle_days = (now - agg.last).num_days();
            let status = if idle_days <= ACTIVE_WARNING_DAYS {
                HealthStatus::Healthy
            } else if idle_days <= ACTIVE_CRITICAL_DAYS {
                HealthStatus::Warning
            } else {
                HealthStatus::Critical
            };
            active_rows.push(ActiveContributor {
                login: who.login.clone(),
                avatar_url: who.avatar_url.clone(),
                last_activity_at: agg.last,
                activity_kind: agg.last_kind,
                status,
            });
        } else if agg.last < churn_cutoff {
            summary.churned += 1;
        }
    }

    active_rows.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));

    let first_latencies: Vec<f64> = activity
        .values()
        .filter_map(|agg| agg.earliest_pr.as_ref())
        .filter_map(|(_, review)| review.latency_hours())
        .collect();

    let first_time_experience = if first_latencies.is_empty() {
        FirstTimeExperience {
            median_hours: 0.0,
            worst_case_hours: 0.0,
            severity: HealthStatus::Healthy,
        }
    } else {
        let worst = first_latencies.iter().copied().fold(f64::MIN, f64::max);
        let median = median_or_zero(first_latencies);
        let severity = if median > FIRST_REVIEW_CRITICAL_HOURS {
            HealthStatus::Critical
        } else if median > FIRST_REVIEW_WARNING_HOURS {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };
        FirstTimeExperience { median_hours: median, worst_case_hours: worst, severity }
    };

    Ok(ContributorsHealthReport {
        summary,
        first_time_experience,
        active_contributors: active_rows,
        last_updated,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use repopulse_domain::{IssueState, PullRequestState};

    use super::super::bots::LoginBotPolicy;
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn contributor(id: i64, login: &str) -> Contributor {
        Contributor {
            id,
            external_id: id * 10,
            login: login.to_string(),
            avatar_url: format!("https://avatars.test/{login}"),
            html_url: format!("https://github.test/{login}"),
        }
    }

    fn pr(author_id: i64, age_days: i64, review: ReviewState) -> PullRequest {
        let created = now() - Duration::days(age_days);
        PullRequest {
            id: 0,
            external_id: 0,
            number: 0,
            title: "pr".into(),
            state: PullRequestState::Open,
            created_at: created,
            updated_at: created,
            closed_at: None,
            merged_at: None,
            repository_id: 1,
            author_id,
            reviews_count: i64::from(review.has_review()),
            review,
        }
    }

    fn issue(author_id: i64, age_days: i64) -> Issue {
        let created = now() - Duration::days(age_days);
        Issue {
            id: 0,
            external_id: 0,
            number: 0,
            title: "issue".into(),
            state: IssueState::Open,
            created_at: created,
            updated_at: created,
            closed_at: None,
            repository_id: 1,
            author_id,
            comments_count: 0,
            has_maintainer_response: false,
            time_to_first_response: None,
        }
    }

    fn roster(logins: &[(i64, &str)]) -> HashMap<i64, Contributor> {
        logins.iter().map(|(id, login)| (*id, contributor(*id, login))).collect()
    }

    fn reviewed(hours: f64) -> ReviewState {
        ReviewState::Reviewed { latency_hours: hours }
    }

    fn unreviewed() -> ReviewState {
        ReviewState::Unreviewed { wait_hours: 1.0 }
    }

    #[test]
    fn buckets_partition_on_window_boundaries() {
        let map = roster(&[(1, "fresh"), (2, "edge"), (3, "quiet"), (4, "gone")]);
        // fresh: 29 days, edge: exactly 30 days, quiet: 40 days (gap band),
        // gone: 50 days.
        let issues = vec![issue(1, 29), issue(2, 30), issue(3, 40), issue(4, 50)];

        let report =
            compute(&[], &issues, &map, &LoginBotPolicy, now(), now()).expect("report");

        assert_eq!(report.summary.active, 1);
        assert_eq!(report.summary.churned, 1);
        assert_eq!(report.summary.new + report.summary.returning, report.summary.active);
        // "edge" and "quiet" land in no bucket.
        assert_eq!(report.active_contributors.len(), 1);
        assert_eq!(report.active_contributors[0].login, "fresh");
    }

    #[test]
    fn new_versus_returning_depends_on_first_activity() {
        let map = roster(&[(1, "newbie"), (2, "veteran")]);
        let issues = vec![
            issue(1, 5),
            // Veteran's first activity predates the window.
            issue(2, 60),
            issue(2, 3),
        ];

        let report =
            compute(&[], &issues, &map, &LoginBotPolicy, now(), now()).expect("report");

        assert_eq!(report.summary.new, 1);
        assert_eq!(report.summary.returning, 1);
        // Veteran is active, not churned, despite the 60-day-old issue.
        assert_eq!(report.summary.churned, 0);
    }

    #[test]
    fn active_rows_are_sorted_most_recent_first_with_day_based_status() {
        let map = roster(&[(1, "recent"), (2, "slipping"), (3, "fading")]);
        let issues = vec![issue(1, 2), issue(2, 16), issue(3, 25)];

        let report =
            compute(&[], &issues, &map, &LoginBotPolicy, now(), now()).expect("report");

        let logins: Vec<_> =
            report.active_contributors.iter().map(|c| c.login.as_str()).collect();
        assert_eq!(logins, vec!["recent", "slipping", "fading"]);

        assert_eq!(report.active_contributors[0].status, HealthStatus::Healthy);
        assert_eq!(report.active_contributors[1].status, HealthStatus::Warning);
        assert_eq!(report.active_contributors[2].status, HealthStatus::Critical);
    }

    #[test]
    fn bots_are_excluded_from_every_bucket() {
        let map = roster(&[(1, "alice"), (2, "dependabot[bot]")]);
        let issues = vec![issue(1, 3), issue(2, 1), issue(2, 50)];

        let report =
            compute(&[], &issues, &map, &LoginBotPolicy, now(), now()).expect("report");

        assert_eq!(report.summary.active, 1);
        assert_eq!(report.summary.churned, 0);
        assert_eq!(report.active_contributors.len(), 1);
    }

    #[test]
    fn first_time_experience_uses_each_authors_earliest_pr() {
        let map = roster(&[(1, "alice"), (2, "bob"), (3, "carol")]);
        let prs = vec![
            // Alice's earliest PR was reviewed in 10h; her later one in 100h
            // must not count.
            pr(1, 20, reviewed(10.0)),
            pr(1, 2, reviewed(100.0)),
            pr(2, 10, reviewed(30.0)),
            // Carol's earliest PR is unreviewed and is skipped.
            pr(3, 5, unreviewed()),
        ];

        let report = compute(&prs, &[], &map, &LoginBotPolicy, now(), now()).expect("report");

        let fte = &report.first_time_experience;
        assert!((fte.median_hours - 20.0).abs() < 1e-9);
        assert!((fte.worst_case_hours - 30.0).abs() < 1e-9);
        assert_eq!(fte.severity, HealthStatus::Healthy);
    }

    #[test]
    fn first_time_experience_severity_thresholds() {
        let map = roster(&[(1, "a"), (2, "b")]);

        let warning = compute(
            &[pr(1, 9, reviewed(30.0)), pr(2, 8, reviewed(40.0))],
            &[],
            &map,
            &LoginBotPolicy,
            now(),
            now(),
        )
        .expect("report");
        assert_eq!(warning.first_time_experience.severity, HealthStatus::Warning);

        let critical = compute(
            &[pr(1, 9, reviewed(80.0)), pr(2, 8, reviewed(90.0))],
            &[],
            &map,
            &LoginBotPolicy,
            now(),
            now(),
        )
        .expect("report");
        assert_eq!(critical.first_time_experience.severity, HealthStatus::Critical);
    }

    #[test]
    fn empty_first_pr_sample_reads_healthy_zero() {
        let map = roster(&[(1, "alice")]);
        let report =
            compute(&[], &[issue(1, 1)], &map, &LoginBotPolicy, now(), now()).expect("report");

        let fte = &report.first_time_experience;
        assert_eq!(fte.median_hours, 0.0);
        assert_eq!(fte.worst_case_hours, 0.0);
        assert_eq!(fte.severity, HealthStatus::Healthy);
    }

    #[test]
    fn missing_author_degrades_with_computation_error() {
        let map = roster(&[]);
        let err = compute(&[], &[issue(9, 1)], &map, &LoginBotPolicy, now(), now())
            .expect_err("must fail");
        assert!(matches!(err, repopulse_domain::RepoPulseError::Computation(_)));
    }
}
