use crate::calc::percent_1dp;
use crate::index::{Diagnostics, GroupingIndex, ResolvedAnswer};
use crate::model::Answer;
use indexmap::IndexMap;
use serde::Serialize;

/// Subject -> summed marks awarded, in first-seen answer order.
pub type SubjectAggregate = IndexMap<String, f64>;

/// Subject -> category -> totals, both levels in first-seen answer order.
pub type CategoryAggregate = IndexMap<String, IndexMap<String, MarkTotals>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MarkTotals {
    pub max: f64,
    pub obtained: f64,
}

impl MarkTotals {
    pub fn add(&mut self, max: f64, obtained: f64) {
        self.max += max;
        self.obtained += obtained;
    }

    pub fn percentage(&self) -> f64 {
        percent_1dp(self.obtained, self.max)
    }
}

/// One entry per resolved answer; repeated topics are not merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicEntry {
    pub topic: String,
    pub max: f64,
    pub obtained: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregates {
    pub subject_aggregate: SubjectAggregate,
    pub category_aggregate: CategoryAggregate,
    pub topic_aggregate: Vec<TopicEntry>,
}

pub fn aggregate(answers: &[Answer], index: &GroupingIndex<'_>) -> (Aggregates, Diagnostics) {
    let resolution = index.resolve(answers);
    (fold(&resolution.pairs), resolution.diagnostics)
}

/// Single pass over resolved answers. Marks are taken as awarded; there
/// is no low-score floor, so chart totals always match the headline score.
pub fn fold(pairs: &[ResolvedAnswer<'_, '_>]) -> Aggregates {
    let mut out = Aggregates::default();
    for pair in pairs {
        let q = pair.question;
        let obtained = pair.obtained();
        let max = pair.max();

        *out.subject_aggregate.entry(q.subject.clone()).or_insert(0.0) += obtained;

        out.category_aggregate
            .entry(q.subject.clone())
            .or_default()
            .entry(q.category.clone())
            .or_default()
            .add(max, obtained);

        out.topic_aggregate.push(TopicEntry {
            topic: q.topic.clone(),
            max,
            obtained,
        });
    }
    out
}
