use anyhow::Context;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const FILE_SUFFIX: &str = "_Report.pdf";

/// Collapses every run of non-alphanumeric characters into a single `_`
/// and trims them from both ends.
pub fn sanitize_file_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        "student".to_string()
    } else {
        out
    }
}

pub fn report_file_name(student_name: &str) -> String {
    format!("{}{}", sanitize_file_stem(student_name), FILE_SUFFIX)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Writes beside the target and renames into place so a failed export
/// never leaves a truncated document under the final name.
pub fn write_document(dir: &Path, file_name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.to_string_lossy()))?;

    let dst = dir.join(file_name);
    let tmp = dir.join(format!("{file_name}.writing"));
    if tmp.exists() {
        let _ = std::fs::remove_file(&tmp);
    }

    let written = write_and_rename(&tmp, &dst, bytes);
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    written?;
    Ok(dst)
}

fn write_and_rename(tmp: &Path, dst: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut out = std::fs::File::create(tmp)
        .with_context(|| format!("failed to create output file {}", tmp.to_string_lossy()))?;
    out.write_all(bytes)
        .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
    out.sync_all()
        .with_context(|| format!("failed to flush {}", tmp.to_string_lossy()))?;
    drop(out);

    std::fs::rename(tmp, dst).with_context(|| {
        format!(
            "failed to move {} into place as {}",
            tmp.to_string_lossy(),
            dst.to_string_lossy()
        )
    })
}

/// Marks an export as running. Cleared when the guard drops, whatever the
/// outcome of the export.
#[derive(Debug, Clone, Default)]
pub struct ExportFlag(Arc<AtomicBool>);

impl ExportFlag {
    pub fn try_begin(&self) -> Option<ExportGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportGuard(self.0.clone()))
    }

    pub fn is_exporting(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct ExportGuard(Arc<AtomicBool>);

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
