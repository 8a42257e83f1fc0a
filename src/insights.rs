use crate::aggregate::MarkTotals;
use crate::calc::{format_marks, format_percent, percent_1dp};
use crate::index::{Diagnostics, GroupingIndex};
use crate::model::{StudentAnswer, Test};
use indexmap::IndexMap;
use serde::Serialize;

pub const NO_FOCUS_TOPICS: &str = "Good consistency across topics. Move on to next.";
pub const FOCUS_BULLET: &str = "\u{2022} ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionTier {
    Excellent,
    GoodEffort,
    NeedsImprovement,
}

impl SuggestionTier {
    /// Lower bounds are inclusive: 75.0 is excellent, 50.0 is good effort.
    pub fn for_percentage(p: f64) -> Self {
        if p >= 75.0 {
            SuggestionTier::Excellent
        } else if p >= 50.0 {
            SuggestionTier::GoodEffort
        } else {
            SuggestionTier::NeedsImprovement
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            SuggestionTier::Excellent => {
                "Excellent performance! Keep up the great work and keep challenging yourself with advanced problems."
            }
            SuggestionTier::GoodEffort => {
                "Good effort! There is room for improvement. Revise the topics listed above and practise them regularly."
            }
            SuggestionTier::NeedsImprovement => {
                "Needs significant improvement. Revisit the fundamentals of each weak topic and ask for help where concepts are unclear."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectScore {
    pub subject: String,
    pub marks: f64,
}

/// The four text blocks of the insights section, line by line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightReport {
    pub performance_summary: Vec<String>,
    pub category_performance: Vec<String>,
    pub focus_topics: Vec<String>,
    pub suggestion: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub obtained: f64,
    pub total: f64,
    pub percentage: f64,
    pub strongest: Option<SubjectScore>,
    pub weakest: Option<SubjectScore>,
    pub tier: SuggestionTier,
    pub report: InsightReport,
}

pub fn generate_insights(test: &Test, student_answer: &StudentAnswer) -> (Insights, Diagnostics) {
    let index = GroupingIndex::build(test);
    let resolution = index.resolve(&student_answer.answers);

    let mut obtained = 0.0_f64;
    let mut by_subject: IndexMap<&str, f64> = IndexMap::new();
    let mut by_category: IndexMap<&str, MarkTotals> = IndexMap::new();
    let mut focus: Vec<String> = Vec::new();

    for pair in &resolution.pairs {
        let q = pair.question;
        let marks = pair.obtained();
        obtained += marks;
        *by_subject.entry(q.subject.as_str()).or_insert(0.0) += marks;
        by_category
            .entry(q.category.as_str())
            .or_default()
            .add(pair.max(), marks);
        if marks < pair.max() / 2.0 {
            focus.push(format!("{FOCUS_BULLET}{}", q.topic));
        }
    }

    let total = test.total_marks();
    let percentage = percent_1dp(obtained, total);
    let strongest = extreme_subject(&by_subject, |candidate, best| candidate > best);
    let weakest = extreme_subject(&by_subject, |candidate, best| candidate < best);
    let tier = SuggestionTier::for_percentage(percentage);

    let performance_summary = vec![
        format!(
            "Total Score: {} / {} ({}%)",
            format_marks(obtained),
            format_marks(total),
            format_percent(percentage)
        ),
        subject_line("Best Subject", strongest.as_ref()),
        subject_line("Needs Improvement", weakest.as_ref()),
    ];

    let category_performance = if by_category.is_empty() {
        vec!["No category data available.".to_string()]
    } else {
        by_category
            .iter()
            .map(|(category, totals)| {
                format!(
                    "{}: {} / {} ({}%)",
                    category,
                    format_marks(totals.obtained),
                    format_marks(totals.max),
                    format_percent(totals.percentage())
                )
            })
            .collect()
    };

    if focus.is_empty() {
        focus.push(NO_FOCUS_TOPICS.to_string());
    }

    let insights = Insights {
        obtained,
        total,
        percentage,
        strongest,
        weakest,
        tier,
        report: InsightReport {
            performance_summary,
            category_performance,
            focus_topics: focus,
            suggestion: vec![tier.message().to_string()],
        },
    };
    (insights, resolution.diagnostics)
}

/// Walks subjects in first-seen order and only replaces the current pick
/// on a strict improvement, so the earliest subject wins ties.
fn extreme_subject(
    by_subject: &IndexMap<&str, f64>,
    better: impl Fn(f64, f64) -> bool,
) -> Option<SubjectScore> {
    let mut pick: Option<(&str, f64)> = None;
    for (subject, marks) in by_subject {
        match pick {
            Some((_, best)) if !better(*marks, best) => {}
            _ => pick = Some((*subject, *marks)),
        }
    }
    pick.map(|(subject, marks)| SubjectScore {
        subject: subject.to_string(),
        marks,
    })
}

fn subject_line(label: &str, score: Option<&SubjectScore>) -> String {
    match score {
        Some(s) => format!("{}: {} ({} marks)", label, s.subject, format_marks(s.marks)),
        None => format!("{}: n/a", label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{answer, physics_pair, question, student_answer, test_with};

    #[test]
    fn physics_pair_lands_on_good_effort() {
        let (test, sa) = physics_pair();
        let (ins, diag) = generate_insights(&test, &sa);

        assert_eq!(diag.unresolved_answers, 0);
        assert_eq!(ins.percentage, 50.0);
        assert_eq!(ins.tier, SuggestionTier::GoodEffort);
        assert_eq!(
            ins.report.performance_summary,
            vec![
                "Total Score: 5 / 10 (50.0%)".to_string(),
                "Best Subject: Physics (5 marks)".to_string(),
                "Needs Improvement: Physics (5 marks)".to_string(),
            ]
        );
        assert_eq!(
            ins.report.category_performance,
            vec![
                "Factual: 4 / 4 (100.0%)".to_string(),
                "Reasoning: 1 / 6 (16.7%)".to_string(),
            ]
        );
        assert_eq!(ins.report.focus_topics, vec!["\u{2022} Newton's Laws".to_string()]);
    }

    #[test]
    fn exactly_half_is_not_weak() {
        let test = test_with(vec![
            question("q1", "Maths", "Factual", "Quadratic", 4),
            question("q2", "Maths", "Factual", "Limits", 4),
        ]);
        let sa = student_answer(vec![answer("q1", 2.0), answer("q2", 1.999)]);
        let (ins, _) = generate_insights(&test, &sa);
        assert_eq!(ins.report.focus_topics, vec!["\u{2022} Limits".to_string()]);
    }

    #[test]
    fn no_weak_answers_emits_fixed_line() {
        let test = test_with(vec![question("q1", "Maths", "Factual", "Quadratic", 2)]);
        let sa = student_answer(vec![answer("q1", 1.0)]);
        let (ins, _) = generate_insights(&test, &sa);
        assert_eq!(ins.report.focus_topics, vec![NO_FOCUS_TOPICS.to_string()]);
    }

    #[test]
    fn ties_go_to_first_subject_in_answer_order() {
        let test = test_with(vec![
            question("p", "Physics", "Factual", "Sound", 5),
            question("c", "Chemistry", "Factual", "Organic", 5),
            question("b", "Biology", "Factual", "Ecology", 5),
        ]);
        let sa = student_answer(vec![answer("c", 3.0), answer("p", 3.0), answer("b", 3.0)]);
        for _ in 0..3 {
            let (ins, _) = generate_insights(&test, &sa);
            assert_eq!(ins.strongest.as_ref().map(|s| s.subject.as_str()), Some("Chemistry"));
            assert_eq!(ins.weakest.as_ref().map(|s| s.subject.as_str()), Some("Chemistry"));
        }
    }

    #[test]
    fn strongest_and_weakest_differ_when_scores_differ() {
        let test = test_with(vec![
            question("p", "Physics", "Factual", "Sound", 5),
            question("c", "Chemistry", "Factual", "Organic", 5),
            question("b", "Biology", "Factual", "Ecology", 5),
        ]);
        let sa = student_answer(vec![answer("p", 2.0), answer("c", 5.0), answer("b", 1.0)]);
        let (ins, _) = generate_insights(&test, &sa);
        assert_eq!(ins.strongest.map(|s| s.subject), Some("Chemistry".to_string()));
        assert_eq!(ins.weakest.map(|s| s.subject), Some("Biology".to_string()));
    }

    #[test]
    fn zero_total_marks_gives_zero_percent() {
        let test = test_with(vec![question("q0", "English", "Factual", "Tenses", 0)]);
        let sa = student_answer(vec![answer("q0", 0.0)]);
        let (ins, _) = generate_insights(&test, &sa);
        assert_eq!(ins.percentage, 0.0);
        assert_eq!(ins.report.performance_summary[0], "Total Score: 0 / 0 (0.0%)");
        assert_eq!(ins.report.category_performance, vec!["Factual: 0 / 0 (0.0%)".to_string()]);
        assert_eq!(ins.tier, SuggestionTier::NeedsImprovement);
    }

    #[test]
    fn unresolved_answer_is_skipped_and_counted() {
        let (test, mut sa) = physics_pair();
        sa.answers.insert(0, answer("deleted-question", 0.0));
        let (ins, diag) = generate_insights(&test, &sa);
        assert_eq!(diag.unresolved_answers, 1);
        assert_eq!(ins.obtained, 5.0);
        assert_eq!(ins.report.focus_topics.len(), 1);
    }

    #[test]
    fn empty_answer_list_has_no_subject_picks() {
        let (test, mut sa) = physics_pair();
        sa.answers.clear();
        let (ins, _) = generate_insights(&test, &sa);
        assert!(ins.strongest.is_none());
        assert_eq!(ins.report.performance_summary[1], "Best Subject: n/a");
        assert_eq!(ins.report.category_performance, vec!["No category data available.".to_string()]);
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(SuggestionTier::for_percentage(75.0), SuggestionTier::Excellent);
        assert_eq!(SuggestionTier::for_percentage(74.999), SuggestionTier::GoodEffort);
        assert_eq!(SuggestionTier::for_percentage(50.0), SuggestionTier::GoodEffort);
        assert_eq!(SuggestionTier::for_percentage(49.99), SuggestionTier::NeedsImprovement);
    }

    #[test]
    fn percentage_matches_rounded_ratio() {
        let test = test_with(vec![
            question("q1", "Physics", "Factual", "Sound", 3),
            question("q2", "Chemistry", "Applied", "Organic", 3),
            question("q3", "Maths", "Reasoning", "Limits", 3),
        ]);
        let sa = student_answer(vec![answer("q1", 1.0), answer("q2", 1.0), answer("q3", 0.5)]);
        let (ins, _) = generate_insights(&test, &sa);
        // 250 / 9 = 27.77...
        assert_eq!(ins.percentage, 27.8);
    }
}
