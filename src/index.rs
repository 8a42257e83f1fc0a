use crate::model::{Answer, Question, Test};
use serde::Serialize;
use std::collections::HashMap;

/// Question lookup for one test, keyed by question id.
#[derive(Debug)]
pub struct GroupingIndex<'a> {
    by_id: HashMap<&'a str, &'a Question>,
}

impl<'a> GroupingIndex<'a> {
    pub fn build(test: &'a Test) -> Self {
        let mut by_id = HashMap::with_capacity(test.questions.len());
        for q in &test.questions {
            // A repeated id keeps the first question, matching test order.
            by_id.entry(q.id.as_str()).or_insert(q);
        }
        Self { by_id }
    }

    pub fn lookup(&self, question_id: &str) -> Option<&'a Question> {
        self.by_id.get(question_id).copied()
    }

    /// Pairs each answer with its question, in answer order. Answers that
    /// do not resolve are left out and counted.
    pub fn resolve<'b>(&self, answers: &'b [Answer]) -> Resolution<'a, 'b> {
        let mut pairs = Vec::with_capacity(answers.len());
        let mut diagnostics = Diagnostics::default();
        for answer in answers {
            let Some(question) = self.lookup(&answer.question_id) else {
                diagnostics.unresolved_answers += 1;
                diagnostics
                    .unresolved_question_ids
                    .push(answer.question_id.clone());
                continue;
            };
            let max = question.max_marks as f64;
            if !answer.marks_awarded.is_finite()
                || answer.marks_awarded < 0.0
                || answer.marks_awarded > max
            {
                diagnostics.out_of_range_answers += 1;
            }
            pairs.push(ResolvedAnswer { question, answer });
        }
        Resolution { pairs, diagnostics }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedAnswer<'a, 'b> {
    pub question: &'a Question,
    pub answer: &'b Answer,
}

impl ResolvedAnswer<'_, '_> {
    pub fn max(&self) -> f64 {
        self.question.max_marks as f64
    }

    /// Non-finite marks count as 0 so no NaN reaches a sum.
    pub fn obtained(&self) -> f64 {
        if self.answer.marks_awarded.is_finite() {
            self.answer.marks_awarded
        } else {
            0.0
        }
    }
}

#[derive(Debug)]
pub struct Resolution<'a, 'b> {
    pub pairs: Vec<ResolvedAnswer<'a, 'b>>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub unresolved_answers: usize,
    pub unresolved_question_ids: Vec<String>,
    pub out_of_range_answers: usize,
}

impl Diagnostics {
    pub fn log(&self, student_answer_id: &str) {
        if self.unresolved_answers > 0 {
            tracing::warn!(
                student_answer = student_answer_id,
                count = self.unresolved_answers,
                question_ids = ?self.unresolved_question_ids,
                "answers reference questions missing from the test; skipped"
            );
        }
        if self.out_of_range_answers > 0 {
            tracing::warn!(
                student_answer = student_answer_id,
                count = self.out_of_range_answers,
                "answers awarded marks outside [0, maxMarks]"
            );
        }
    }
}
