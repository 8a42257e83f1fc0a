use std::path::PathBuf;

use crate::export::ExportFlag;
use crate::fonts::FontSet;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Per-process state. Reports themselves are computed fresh per request.
#[derive(Debug, Default)]
pub struct AppState {
    /// Default output directory for exported documents.
    pub workspace: Option<PathBuf>,
    pub export: ExportFlag,
    /// Fonts from `REPORTD_FONTS`, tried after any a request names.
    pub fonts: FontSet,
}
