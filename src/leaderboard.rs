// src/leaderboard.rs

//! Rankings and dashboard figures computed from stored submissions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::submission::Submission;

pub const DEFAULT_TOP: usize = 3;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Winner {
    pub rank: String,
    pub participant_name: String,
    pub mobile_number: String,
    pub panchayath: String,
    pub score: i32,
    pub total_questions: usize,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReferralChampion {
    pub rank: String,
    pub referrer_mobile: String,
    pub referral_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PanchayathRanking {
    pub panchayath: String,
    pub participants: usize,
    pub average_score: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardStats {
    pub total_submissions: usize,
    pub total_questions: i64,
    pub average_score: f64,
    pub top_panchayath: Option<String>,
    pub top_referrers: Vec<ReferralChampion>,
}

/// "1st", "2nd", "3rd", then "4th", "5th", ...
pub fn rank_label(position: usize) -> String {
    match position {
        1 => "1st".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        n => format!("{n}th"),
    }
}

/// Highest score first; equal scores go to whoever submitted earlier.
pub fn winners(submissions: &[Submission], limit: usize) -> Vec<Winner> {
    let mut ranked: Vec<&Submission> = submissions.iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.submitted_at.cmp(&b.submitted_at))
    });

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, s)| Winner {
            rank: rank_label(i + 1),
            participant_name: s.participant_name.clone(),
            mobile_number: mask_mobile(&s.mobile_number),
            panchayath: s.panchayath.clone(),
            score: s.score,
            total_questions: s.question_order.len(),
            submitted_at: s.submitted_at,
        })
        .collect()
}

/// Referrers with the most referred submissions.
pub fn referral_champions(submissions: &[Submission], limit: usize) -> Vec<ReferralChampion> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for referrer in submissions
        .iter()
        .filter_map(|s| s.referrer_mobile.as_deref())
        .map(str::trim)
        .filter(|m| !m.is_empty())
    {
        *counts.entry(referrer).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (mobile, count))| ReferralChampion {
            rank: rank_label(i + 1),
            referrer_mobile: mobile.to_string(),
            referral_count: count,
        })
        .collect()
}

pub fn panchayath_rankings(submissions: &[Submission]) -> Vec<PanchayathRanking> {
    let mut groups: HashMap<&str, (usize, i64)> = HashMap::new();
    for s in submissions {
        let entry = groups.entry(s.panchayath.as_str()).or_default();
        entry.0 += 1;
        entry.1 += i64::from(s.score);
    }

    let mut rankings: Vec<PanchayathRanking> = groups
        .into_iter()
        .map(|(name, (count, total))| PanchayathRanking {
            panchayath: name.to_string(),
            participants: count,
            average_score: round2(total as f64 / count as f64),
        })
        .collect();

    rankings.sort_by(|a, b| {
        b.participants
            .cmp(&a.participants)
            .then_with(|| b.average_score.total_cmp(&a.average_score))
            .then_with(|| a.panchayath.cmp(&b.panchayath))
    });
    rankings
}

pub fn dashboard(submissions: &[Submission], total_questions: i64) -> DashboardStats {
    let average_score = if submissions.is_empty() {
        0.0
    } else {
        let total: i64 = submissions.iter().map(|s| i64::from(s.score)).sum();
        round2(total as f64 / submissions.len() as f64)
    };

    DashboardStats {
        total_submissions: submissions.len(),
        total_questions,
        average_score,
        top_panchayath: panchayath_rankings(submissions)
            .into_iter()
            .next()
            .map(|r| r.panchayath),
        top_referrers: referral_champions(submissions, DEFAULT_TOP),
    }
}

/// Keeps the last four digits of a public mobile number.
pub fn mask_mobile(mobile: &str) -> String {
    let chars: Vec<char> = mobile.chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;
    std::iter::repeat_n('*', hidden)
        .chain(chars[hidden..].iter().copied())
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use sqlx::types::Json;
    use uuid::Uuid;

    use super::*;
    use crate::models::submission::AnswerSet;

    fn submission(
        name: &str,
        panchayath: &str,
        score: i32,
        minute: i64,
        referrer: Option<&str>,
    ) -> Submission {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        Submission {
            id: Uuid::new_v4(),
            quiz_id: Uuid::nil(),
            participant_name: name.to_string(),
            mobile_number: format!("98765{:05}", minute),
            panchayath: panchayath.to_string(),
            answers: Json(AnswerSet::new()),
            score,
            reference_code: format!("QZ-{name}"),
            referrer_mobile: referrer.map(str::to_string),
            question_order: Json(vec![Uuid::new_v4(); 5]),
            submitted_at: base + Duration::minutes(minute),
        }
    }

    #[test]
    fn rank_labels() {
        let labels: Vec<String> = (1..=5).map(rank_label).collect();
        assert_eq!(labels, ["1st", "2nd", "3rd", "4th", "5th"]);
    }

    #[test]
    fn earlier_submission_breaks_ties() {
        let rows = vec![
            submission("late", "Kumily", 4, 30, None),
            submission("early", "Kumily", 4, 5, None),
            submission("best", "Vandiperiyar", 5, 50, None),
            submission("low", "Kumily", 1, 1, None),
        ];

        let top = winners(&rows, DEFAULT_TOP);

        let names: Vec<&str> = top.iter().map(|w| w.participant_name.as_str()).collect();
        assert_eq!(names, ["best", "early", "late"]);
        assert_eq!(top[0].rank, "1st");
        assert_eq!(top[0].total_questions, 5);
        assert!(top[0].mobile_number.starts_with("******"));
    }

    #[test]
    fn referrals_ignore_blank_and_sort_by_count_then_mobile() {
        let rows = vec![
            submission("a", "X", 1, 1, Some("9000000002")),
            submission("b", "X", 1, 2, Some("9000000001")),
            submission("c", "X", 1, 3, Some("9000000002")),
            submission("d", "X", 1, 4, Some("9000000003")),
            submission("e", "X", 1, 5, Some("  ")),
            submission("f", "X", 1, 6, None),
        ];

        let champions = referral_champions(&rows, 10);

        assert_eq!(champions.len(), 3);
        assert_eq!(champions[0].referrer_mobile, "9000000002");
        assert_eq!(champions[0].referral_count, 2);
        assert_eq!(champions[1].referrer_mobile, "9000000001");
        assert_eq!(champions[2].referrer_mobile, "9000000003");
    }

    #[test]
    fn panchayaths_rank_by_count_then_average() {
        let rows = vec![
            submission("a", "Kumily", 2, 1, None),
            submission("b", "Kumily", 3, 2, None),
            submission("c", "Peerumade", 5, 3, None),
            submission("d", "Peerumade", 4, 4, None),
            submission("e", "Azhutha", 5, 5, None),
        ];

        let rankings = panchayath_rankings(&rows);

        let order: Vec<&str> = rankings.iter().map(|r| r.panchayath.as_str()).collect();
        assert_eq!(order, ["Peerumade", "Kumily", "Azhutha"]);
        assert_eq!(rankings[0].average_score, 4.5);
        assert_eq!(rankings[1].participants, 2);
    }

    #[test]
    fn dashboard_rounds_average() {
        let rows = vec![
            submission("a", "Kumily", 1, 1, Some("9000000001")),
            submission("b", "Kumily", 1, 2, None),
            submission("c", "Peerumade", 2, 3, None),
        ];

        let stats = dashboard(&rows, 12);

        assert_eq!(stats.total_submissions, 3);
        assert_eq!(stats.total_questions, 12);
        assert_eq!(stats.average_score, 1.33);
        assert_eq!(stats.top_panchayath.as_deref(), Some("Kumily"));
        assert_eq!(stats.top_referrers.len(), 1);
    }

    #[test]
    fn empty_dashboard() {
        let stats = dashboard(&[], 0);
        assert_eq!(stats.average_score, 0.0);
        assert!(stats.top_panchayath.is_none());
        assert!(stats.top_referrers.is_empty());
    }

    #[test]
    fn masking_keeps_last_four() {
        assert_eq!(mask_mobile("9876543210"), "******3210");
        assert_eq!(mask_mobile("123"), "123");
    }
}
