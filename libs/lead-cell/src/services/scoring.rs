// libs/lead-cell/src/services/scoring.rs
//
// Lead quality scoring. Each rule is evaluated independently against the same
// snapshot, contributions are summed, and the total is clamped to 0..=100.

use std::ops::RangeInclusive;

use serde::Serialize;

use crate::models::LeadScoringInput;

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

pub const IDEAL_AGE_RANGE: RangeInclusive<i32> = 26..=45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRule {
    MessagingReachability,
    IdealAgeBand,
    PriorProcedure,
    DeclaredInterest,
    QualifiedChannel,
}

impl ScoringRule {
    pub const ALL: [ScoringRule; 5] = [
        ScoringRule::MessagingReachability,
        ScoringRule::IdealAgeBand,
        ScoringRule::PriorProcedure,
        ScoringRule::DeclaredInterest,
        ScoringRule::QualifiedChannel,
    ];

    pub fn points(&self) -> i32 {
        match self {
            ScoringRule::MessagingReachability => 20,
            ScoringRule::IdealAgeBand => 15,
            ScoringRule::PriorProcedure => 25,
            ScoringRule::DeclaredInterest => 20,
            ScoringRule::QualifiedChannel => 20,
        }
    }

    pub fn applies(&self, input: &LeadScoringInput) -> bool {
        match self {
            ScoringRule::MessagingReachability => input.has_messaging_contact,
            ScoringRule::IdealAgeBand => input
                .age_bracket
                .is_some_and(|age| IDEAL_AGE_RANGE.contains(&age)),
            ScoringRule::PriorProcedure => input.has_prior_procedure,
            ScoringRule::DeclaredInterest => input
                .procedure_of_interest
                .as_deref()
                .is_some_and(|procedure| !procedure.is_empty()),
            ScoringRule::QualifiedChannel => input
                .source
                .as_ref()
                .is_some_and(|source| source.is_qualified()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub score: i32,
    pub raw_total: i32,
    pub matched_rules: Vec<ScoringRule>,
}

/// Deterministic lead score in `MIN_SCORE..=MAX_SCORE`.
pub fn compute_lead_score(input: &LeadScoringInput) -> i32 {
    score_breakdown(input).score
}

pub fn score_breakdown(input: &LeadScoringInput) -> ScoreBreakdown {
    let matched_rules: Vec<ScoringRule> = ScoringRule::ALL
        .into_iter()
        .filter(|rule| rule.applies(input))
        .collect();

    let raw_total: i32 = matched_rules.iter().map(ScoringRule::points).sum();

    ScoreBreakdown {
        score: raw_total.clamp(MIN_SCORE, MAX_SCORE),
        raw_total,
        matched_rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeadSource;

    fn full_lead() -> LeadScoringInput {
        LeadScoringInput {
            has_messaging_contact: true,
            age_bracket: Some(30),
            has_prior_procedure: true,
            procedure_of_interest: Some("Botox".to_string()),
            source: Some(LeadSource::Referral),
        }
    }

    #[test]
    fn every_rule_matched_scores_100() {
        assert_eq!(compute_lead_score(&full_lead()), 100);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(compute_lead_score(&LeadScoringInput::default()), 0);
    }

    #[test]
    fn age_outside_band_contributes_nothing() {
        let input = LeadScoringInput {
            age_bracket: Some(17),
            ..Default::default()
        };
        assert_eq!(compute_lead_score(&input), 0);
    }

    #[test]
    fn age_band_is_inclusive_on_both_ends() {
        for (age, expected) in [(25, 0), (26, 15), (45, 15), (46, 0)] {
            let input = LeadScoringInput {
                age_bracket: Some(age),
                ..Default::default()
            };
            assert_eq!(compute_lead_score(&input), expected, "age {}", age);
        }
    }

    #[test]
    fn empty_procedure_is_not_declared_interest() {
        let input = LeadScoringInput {
            procedure_of_interest: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(compute_lead_score(&input), 0);
    }

    #[test]
    fn only_referral_and_search_are_qualified_channels() {
        let score_for = |source: LeadSource| {
            compute_lead_score(&LeadScoringInput {
                source: Some(source),
                ..Default::default()
            })
        };

        assert_eq!(score_for(LeadSource::Referral), 20);
        assert_eq!(score_for(LeadSource::Search), 20);
        assert_eq!(score_for(LeadSource::Site), 0);
        assert_eq!(score_for(LeadSource::Instagram), 0);
        assert_eq!(score_for(LeadSource::Facebook), 0);
        assert_eq!(score_for(LeadSource::Other), 0);
    }

    #[test]
    fn breakdown_lists_matched_rules() {
        let input = LeadScoringInput {
            has_messaging_contact: true,
            has_prior_procedure: true,
            ..Default::default()
        };
        let breakdown = score_breakdown(&input);

        assert_eq!(breakdown.score, 45);
        assert_eq!(breakdown.raw_total, 45);
        assert_eq!(
            breakdown.matched_rules,
            vec![ScoringRule::MessagingReachability, ScoringRule::PriorProcedure]
        );
    }

    #[test]
    fn rule_points_sum_to_max_score() {
        let total: i32 = ScoringRule::ALL.iter().map(ScoringRule::points).sum();
        assert_eq!(total, MAX_SCORE);
    }

    #[test]
    fn scoring_is_repeatable() {
        let input = full_lead();
        assert_eq!(score_breakdown(&input), score_breakdown(&input));
    }
}
