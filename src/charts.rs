use crate::aggregate::Aggregates;
use crate::calc::percent_1dp;
use crate::error::ReportError;
use base64::Engine;
use serde::Serialize;
use std::collections::HashMap;

pub const SUBJECT_DISTRIBUTION_KEY: &str = "subject-distribution";
pub const TOPIC_BREAKDOWN_KEY: &str = "topic-breakdown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBar {
    pub category: String,
    pub max: f64,
    pub obtained: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSlice {
    pub subject: String,
    pub obtained: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicBar {
    pub topic: String,
    pub max: f64,
    pub obtained: f64,
}

/// What the charting side is asked to draw, with the series it needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChartSpec {
    SubjectCategory {
        subject: String,
        bars: Vec<CategoryBar>,
    },
    SubjectDistribution {
        slices: Vec<SubjectSlice>,
    },
    TopicBreakdown {
        bars: Vec<TopicBar>,
    },
}

impl ChartSpec {
    pub fn key(&self) -> String {
        match self {
            ChartSpec::SubjectCategory { subject, .. } => format!("subject-category:{subject}"),
            ChartSpec::SubjectDistribution { .. } => SUBJECT_DISTRIBUTION_KEY.to_string(),
            ChartSpec::TopicBreakdown { .. } => TOPIC_BREAKDOWN_KEY.to_string(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            ChartSpec::SubjectCategory { subject, .. } => {
                format!("{subject}: Category-wise Performance")
            }
            ChartSpec::SubjectDistribution { .. } => "Subject-wise Marks Distribution".to_string(),
            ChartSpec::TopicBreakdown { .. } => "Topic-wise Performance".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartEntry {
    pub key: String,
    pub title: String,
    pub spec: ChartSpec,
}

/// Document order: one section per subject (subject order), then the
/// subject distribution, then the topic breakdown.
pub fn chart_specs(agg: &Aggregates) -> Vec<ChartSpec> {
    let mut out: Vec<ChartSpec> = agg
        .category_aggregate
        .iter()
        .map(|(subject, categories)| ChartSpec::SubjectCategory {
            subject: subject.clone(),
            bars: categories
                .iter()
                .map(|(category, totals)| CategoryBar {
                    category: category.clone(),
                    max: totals.max,
                    obtained: totals.obtained,
                    percentage: percent_1dp(totals.obtained, totals.max),
                })
                .collect(),
        })
        .collect();
    out.push(ChartSpec::SubjectDistribution {
        slices: agg
            .subject_aggregate
            .iter()
            .map(|(subject, obtained)| SubjectSlice {
                subject: subject.clone(),
                obtained: *obtained,
            })
            .collect(),
    });
    out.push(ChartSpec::TopicBreakdown {
        bars: agg
            .topic_aggregate
            .iter()
            .map(|t| TopicBar {
                topic: t.topic.clone(),
                max: t.max,
                obtained: t.obtained,
            })
            .collect(),
    });
    out
}

pub fn chart_entries(agg: &Aggregates) -> Vec<ChartEntry> {
    chart_specs(agg)
        .into_iter()
        .map(|spec| ChartEntry {
            key: spec.key(),
            title: spec.title(),
            spec,
        })
        .collect()
}

/// A decoded raster: 8-bit RGB, row-major, no padding.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Snapshot {
    /// Height over width; 0 for a degenerate image.
    pub fn aspect(&self) -> f64 {
        if self.width == 0 {
            0.0
        } else {
            self.height as f64 / self.width as f64
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ReportError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ReportError::Snapshot(e.to_string()))?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Self {
            width,
            height,
            rgb: rgb.into_raw(),
        })
    }

    pub fn decode_base64(data: &str) -> Result<Self, ReportError> {
        // Accept data URLs as produced by canvas.toDataURL().
        let payload = match data.split_once(";base64,") {
            Some((_, rest)) => rest,
            None => data,
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ReportError::Snapshot(format!("invalid base64: {e}")))?;
        Self::decode(&bytes)
    }
}

/// Boundary to whatever draws the charts. `None` means no image; the
/// section is then left out of the document.
pub trait ChartRenderer {
    fn render(&self, key: &str, spec: &ChartSpec) -> Option<Snapshot>;
}

/// Snapshots rendered by the UI and shipped with the export request.
#[derive(Debug, Default)]
pub struct ProvidedSnapshots {
    by_key: HashMap<String, Snapshot>,
    rejected: Vec<String>,
}

impl ProvidedSnapshots {
    /// Undecodable images are dropped and remembered, never fatal.
    pub fn from_base64_map<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut out = Self::default();
        for (key, data) in entries {
            match Snapshot::decode_base64(data) {
                Ok(snapshot) if snapshot.width > 0 && snapshot.height > 0 => {
                    out.by_key.insert(key.to_string(), snapshot);
                }
                Ok(_) => {
                    tracing::warn!(chart = key, "snapshot has zero size; ignored");
                    out.rejected.push(key.to_string());
                }
                Err(e) => {
                    tracing::warn!(chart = key, error = %e, "snapshot could not be decoded; ignored");
                    out.rejected.push(key.to_string());
                }
            }
        }
        out
    }

    #[cfg(test)]
    pub fn insert(&mut self, key: impl Into<String>, snapshot: Snapshot) {
        self.by_key.insert(key.into(), snapshot);
    }

    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }
}

impl ChartRenderer for ProvidedSnapshots {
    fn render(&self, key: &str, _spec: &ChartSpec) -> Option<Snapshot> {
        self.by_key.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::fixtures::{answer, question, student_answer, test_with};
    use crate::index::GroupingIndex;
    use std::io::Cursor;

    fn png_base64(w: u32, h: u32) -> String {
        let img = image::RgbImage::from_pixel(w, h, image::Rgb([10, 20, 30]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png)
            .expect("encode png");
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    }

    #[test]
    fn specs_follow_subject_then_distribution_then_topics() {
        let test = test_with(vec![
            question("c1", "Chemistry", "Applied", "Organic", 3),
            question("p1", "Physics", "Factual", "Sound", 2),
        ]);
        let sa = student_answer(vec![answer("p1", 1.0), answer("c1", 3.0)]);
        let index = GroupingIndex::build(&test);
        let (agg, _) = aggregate(&sa.answers, &index);
        let keys: Vec<String> = chart_specs(&agg).iter().map(ChartSpec::key).collect();
        assert_eq!(
            keys,
            vec![
                "subject-category:Physics".to_string(),
                "subject-category:Chemistry".to_string(),
                SUBJECT_DISTRIBUTION_KEY.to_string(),
                TOPIC_BREAKDOWN_KEY.to_string(),
            ]
        );
    }

    #[test]
    fn provided_snapshots_decode_data_urls_and_skip_garbage() {
        let url = format!("data:image/png;base64,{}", png_base64(40, 20));
        let provided = ProvidedSnapshots::from_base64_map([
            (SUBJECT_DISTRIBUTION_KEY, url.as_str()),
            (TOPIC_BREAKDOWN_KEY, "!!not-base64!!"),
        ]);
        let spec = ChartSpec::SubjectDistribution { slices: vec![] };
        let snap = provided
            .render(SUBJECT_DISTRIBUTION_KEY, &spec)
            .expect("decoded snapshot");
        assert_eq!((snap.width, snap.height), (40, 20));
        assert_eq!(snap.rgb.len(), 40 * 20 * 3);
        assert_eq!(snap.aspect(), 0.5);
        assert!(provided.render(TOPIC_BREAKDOWN_KEY, &spec).is_none());
        assert_eq!(provided.rejected(), &[TOPIC_BREAKDOWN_KEY.to_string()]);
    }
}
