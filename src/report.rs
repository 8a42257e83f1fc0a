use crate::aggregate::{fold, Aggregates};
use crate::calc::{format_marks, format_percent, ScoreBand};
use crate::charts::{chart_entries, ChartEntry, ChartRenderer};
use crate::error::ReportError;
use crate::fonts::FontSet;
use crate::index::{Diagnostics, GroupingIndex};
use crate::insights::{generate_insights, Insights};
use crate::layout::geometry::PageGeometry;
use crate::layout::{Canvas, LayoutEngine, LayoutSummary};
use crate::model::{Student, StudentAnswer, Test};
use crate::pdf::PdfCanvas;
use chrono::{DateTime, NaiveDate};
use serde::Serialize;

pub const INSIGHT_TITLES: [&str; 4] = [
    "Performance Summary",
    "Category-wise Performance",
    "Topics to Focus On",
    "Suggestion",
];

/// `MMM d, yyyy` for RFC 3339 or `YYYY-MM-DD` input; anything else as given.
pub fn format_short_date(raw: &str) -> String {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.format("%b %-d, %Y").to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.format("%b %-d, %Y").to_string();
    }
    s.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionStatus {
    Full,
    Partial,
    None,
}

impl QuestionStatus {
    pub fn label(self) -> &'static str {
        match self {
            QuestionStatus::Full => "Full marks",
            QuestionStatus::Partial => "Partial marks",
            QuestionStatus::None => "No marks",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRow {
    pub number: usize,
    pub question_id: String,
    pub subject: String,
    pub chapter: String,
    pub topic: String,
    pub category: String,
    pub max_marks: u32,
    pub marks_awarded: f64,
    pub status: Option<QuestionStatus>,
    pub status_label: Option<&'static str>,
}

/// One row per test question, in test order. The first answer for a
/// question is the one shown; unanswered questions show 0 and no status.
pub fn question_rows(test: &Test, student_answer: &StudentAnswer) -> Vec<QuestionRow> {
    test.questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let answer = student_answer
                .answers
                .iter()
                .find(|a| a.question_id == q.id);
            let status = answer.map(|a| {
                if a.marks_awarded == q.max_marks as f64 {
                    QuestionStatus::Full
                } else if a.marks_awarded > 0.0 {
                    QuestionStatus::Partial
                } else {
                    QuestionStatus::None
                }
            });
            QuestionRow {
                number: i + 1,
                question_id: q.id.clone(),
                subject: q.subject.clone(),
                chapter: q.chapter.clone(),
                topic: q.topic.clone(),
                category: q.category.clone(),
                max_marks: q.max_marks,
                marks_awarded: answer.map(|a| a.marks_awarded).unwrap_or(0.0),
                status,
                status_label: status.map(QuestionStatus::label),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportHeader {
    pub title: String,
    pub subtitle: String,
    pub info: Vec<(String, String)>,
}

pub fn report_header(test: &Test, student_answer: &StudentAnswer, student_name: &str) -> ReportHeader {
    let date = if student_answer.date.trim().is_empty() {
        &test.date
    } else {
        &student_answer.date
    };
    ReportHeader {
        title: format!("{student_name}'s Test Report"),
        subtitle: test.name.clone(),
        info: vec![
            ("Course".to_string(), test.course.clone()),
            ("Batch".to_string(), test.batch.clone()),
            ("Exam".to_string(), test.exam.clone()),
            ("Date".to_string(), format_short_date(date)),
            ("Total Marks".to_string(), format_marks(test.total_marks())),
            (
                "Marks Obtained".to_string(),
                format!(
                    "{} ({}%)",
                    format_marks(student_answer.total_marks),
                    format_percent(student_answer.percentage)
                ),
            ),
        ],
    }
}

/// Everything the report screen and the exporter need, computed in one
/// pass from the immutable inputs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportModel {
    pub student_name: String,
    pub header: ReportHeader,
    pub score_band: ScoreBand,
    pub questions: Vec<QuestionRow>,
    pub aggregates: Aggregates,
    pub insights: Insights,
    pub charts: Vec<ChartEntry>,
    pub diagnostics: Diagnostics,
}

pub fn build_model(test: &Test, student_answer: &StudentAnswer, student: Option<&Student>) -> ReportModel {
    let student_name = crate::model::student_display_name(student, student_answer);
    let index = GroupingIndex::build(test);
    let resolution = index.resolve(&student_answer.answers);
    let aggregates = fold(&resolution.pairs);
    let (insights, _) = generate_insights(test, student_answer);
    let diagnostics = resolution.diagnostics;
    diagnostics.log(&student_answer.id);

    ReportModel {
        header: report_header(test, student_answer, &student_name),
        student_name,
        score_band: ScoreBand::for_percentage(student_answer.percentage),
        questions: question_rows(test, student_answer),
        charts: chart_entries(&aggregates),
        aggregates,
        insights,
        diagnostics,
    }
}

/// Lays the whole document out on `canvas`. Charts the renderer has no
/// image for are skipped and their keys returned.
pub fn lay_out<C: Canvas>(
    canvas: &mut C,
    geometry: &PageGeometry,
    model: &ReportModel,
    renderer: &dyn ChartRenderer,
) -> (LayoutSummary, Vec<String>) {
    let mut omitted = Vec::new();
    let mut engine = LayoutEngine::new(canvas, geometry);
    engine.header(&model.header.title, &model.header.subtitle);
    engine.info_box(&model.header.info);

    for chart in &model.charts {
        match renderer.render(&chart.key, &chart.spec) {
            Some(snapshot) if snapshot.width > 0 && snapshot.height > 0 => {
                engine.chart_section(&chart.title, &snapshot);
            }
            _ => {
                tracing::debug!(chart = %chart.key, "no snapshot; section omitted");
                omitted.push(chart.key.clone());
            }
        }
    }

    let report = &model.insights.report;
    let blocks = [
        &report.performance_summary,
        &report.category_performance,
        &report.focus_topics,
        &report.suggestion,
    ];
    for (title, body) in INSIGHT_TITLES.iter().zip(blocks) {
        engine.text_block(title, body);
    }

    (engine.finish(), omitted)
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub layout: LayoutSummary,
    pub omitted_charts: Vec<String>,
}

pub fn render_pdf(
    model: &ReportModel,
    renderer: &dyn ChartRenderer,
    geometry: &PageGeometry,
    fonts: &FontSet,
) -> Result<RenderedReport, ReportError> {
    geometry.validate()?;
    let mut canvas = PdfCanvas::new(geometry, fonts);
    let (layout, omitted_charts) = lay_out(&mut canvas, geometry, model, renderer);
    let bytes = canvas.finish(&model.header.title)?;
    Ok(RenderedReport {
        bytes,
        layout,
        omitted_charts,
    })
}
