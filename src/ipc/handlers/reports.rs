use crate::aggregate::aggregate;
use crate::charts::{chart_entries, ProvidedSnapshots};
use crate::error::ReportError;
use crate::export;
use crate::fonts::FontSet;
use crate::index::GroupingIndex;
use crate::insights::generate_insights;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::layout::geometry::PageGeometry;
use crate::model::{Student, StudentAnswer, Test};
use crate::report::{build_model, render_pdf};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::PathBuf;
use uuid::Uuid;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<ReportError> for HandlerErr {
    fn from(e: ReportError) -> Self {
        HandlerErr {
            code: e.code(),
            message: e.to_string(),
            details: None,
        }
    }
}

fn optional_param<T: DeserializeOwned>(req: &Request, key: &str) -> Result<Option<T>, HandlerErr> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| HandlerErr {
                code: "bad_params",
                message: format!("invalid {}: {}", key, e),
                details: Some(json!({ "param": key })),
            }),
    }
}

fn required_param<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, HandlerErr> {
    optional_param(req, key)?.ok_or_else(|| HandlerErr {
        code: "bad_params",
        message: format!("missing {}", key),
        details: Some(json!({ "param": key })),
    })
}

fn report_inputs(req: &Request) -> Result<(Test, StudentAnswer), HandlerErr> {
    Ok((
        required_param(req, "test")?,
        required_param(req, "studentAnswer")?,
    ))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })
}

fn reports_aggregate(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (test, sa) = report_inputs(req)?;
    let index = GroupingIndex::build(&test);
    let (agg, diagnostics) = aggregate(&sa.answers, &index);
    diagnostics.log(&sa.id);
    Ok(json!({
        "subjectAggregate": to_json(&agg.subject_aggregate)?,
        "categoryAggregate": to_json(&agg.category_aggregate)?,
        "topicAggregate": to_json(&agg.topic_aggregate)?,
        "diagnostics": to_json(&diagnostics)?,
    }))
}

fn reports_insights(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (test, sa) = report_inputs(req)?;
    let (insights, diagnostics) = generate_insights(&test, &sa);
    diagnostics.log(&sa.id);
    Ok(json!({
        "percentage": insights.percentage,
        "tier": to_json(&insights.tier)?,
        "insights": to_json(&insights)?,
        "diagnostics": to_json(&diagnostics)?,
    }))
}

fn reports_model(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (test, sa) = report_inputs(req)?;
    let student: Option<Student> = optional_param(req, "student")?;
    to_json(&build_model(&test, &sa, student.as_ref()))
}

fn reports_charts(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (test, sa) = report_inputs(req)?;
    let index = GroupingIndex::build(&test);
    let (agg, _) = aggregate(&sa.answers, &index);
    Ok(json!({ "charts": to_json(&chart_entries(&agg))? }))
}

fn reports_export_pdf(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (test, sa) = report_inputs(req)?;
    let student: Option<Student> = optional_param(req, "student")?;
    let snapshots: IndexMap<String, String> = optional_param(req, "snapshots")?.unwrap_or_default();
    let geometry: PageGeometry = optional_param(req, "geometry")?.unwrap_or_default();
    let out_dir: Option<PathBuf> = optional_param::<String>(req, "outDir")?.map(PathBuf::from);
    let font_paths: Vec<String> = optional_param(req, "fonts")?.unwrap_or_default();

    let Some(dir) = out_dir.or_else(|| state.workspace.clone()) else {
        return Err(HandlerErr {
            code: "no_workspace",
            message: "select a workspace or pass outDir".to_string(),
            details: None,
        });
    };

    let Some(_guard) = state.export.try_begin() else {
        return Err(HandlerErr {
            code: "export_in_progress",
            message: "an export is already running".to_string(),
            details: None,
        });
    };

    let fonts = FontSet::load_paths(font_paths.into_iter().map(PathBuf::from))?.then(&state.fonts);
    let model = build_model(&test, &sa, student.as_ref());
    let provided =
        ProvidedSnapshots::from_base64_map(snapshots.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let rendered = render_pdf(&model, &provided, &geometry, &fonts)?;

    let file_name = export::report_file_name(&model.student_name);
    let path = export::write_document(&dir, &file_name, &rendered.bytes).map_err(ReportError::from)?;
    let sha256 = export::sha256_hex(&rendered.bytes);

    tracing::info!(
        path = %path.to_string_lossy(),
        pages = rendered.layout.page_count,
        bytes = rendered.bytes.len(),
        omitted = rendered.omitted_charts.len(),
        "report exported"
    );

    Ok(json!({
        "reportId": Uuid::new_v4().to_string(),
        "path": path.to_string_lossy(),
        "fileName": file_name,
        "pageCount": rendered.layout.page_count,
        "byteCount": rendered.bytes.len(),
        "sha256": sha256,
        "generatedAt": chrono::Utc::now().to_rfc3339(),
        "sections": to_json(&rendered.layout.sections)?,
        "omittedCharts": rendered.omitted_charts,
        "rejectedSnapshots": provided.rejected(),
        "diagnostics": to_json(&model.diagnostics)?,
    }))
}

fn respond(req: &Request, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "report.aggregate" => Some(respond(req, reports_aggregate(req))),
        "report.insights" => Some(respond(req, reports_insights(req))),
        "report.model" => Some(respond(req, reports_model(req))),
        "report.charts" => Some(respond(req, reports_charts(req))),
        "report.exportPdf" => Some(respond(req, reports_export_pdf(state, req))),
        _ => None,
    }
}
