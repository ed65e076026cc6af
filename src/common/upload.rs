// src/common/upload.rs

use std::{collections::HashMap, path::Path};

use axum::extract::Multipart;
use uuid::Uuid;

use crate::common::error::AppError;

/// Name of the multipart field that carries the file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub original_name: String,
    /// Path relative to the upload root, e.g. `products/<uuid>.png`.
    pub relative_path: String,
}

/// Reads a multipart body, writes the `file` field under `<root>/<kind>/` and
/// returns it together with every other text field of the form.
pub async fn save_multipart_file(
    mut multipart: Multipart,
    upload_root: &Path,
    kind: &str,
) -> Result<(StoredFile, HashMap<String, String>), AppError> {
    let mut stored = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Could not read file: {}", e)))?;

            if bytes.is_empty() {
                return Err(AppError::BadRequest("Uploaded file is empty".into()));
            }

            let dir = upload_root.join(kind);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| anyhow::anyhow!("Could not create upload dir: {}", e))?;

            let file_name = generated_file_name(&original_name);
            tokio::fs::write(dir.join(&file_name), &bytes)
                .await
                .map_err(|e| anyhow::anyhow!("Could not write upload: {}", e))?;

            tracing::info!("📎 Stored upload {}/{} ({} bytes)", kind, file_name, bytes.len());

            stored = Some(StoredFile {
                original_name,
                relative_path: format!("{}/{}", kind, file_name),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Could not read field '{}': {}", name, e)))?;
            fields.insert(name, value);
        }
    }

    let stored = stored.ok_or_else(|| {
        AppError::invalid_field(FILE_FIELD, "A file is required in the 'file' form field")
    })?;

    Ok((stored, fields))
}

/// Best-effort removal of a previously stored upload.
pub async fn remove_stored_file(upload_root: &Path, relative_path: &str) {
    if relative_path.contains("..") {
        return;
    }
    if let Err(e) = tokio::fs::remove_file(upload_root.join(relative_path)).await {
        tracing::warn!("Could not remove upload {}: {}", relative_path, e);
    }
}

pub(crate) fn generated_file_name(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_a_sane_extension() {
        let name = generated_file_name("Invoice Scan.PDF");
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), 36 + 4);
    }

    #[test]
    fn drops_suspicious_extensions() {
        assert!(!generated_file_name("evil.p$p").contains('.'));
        assert!(!generated_file_name("noext").contains('.'));
        assert!(!generated_file_name("../../etc/passwd").contains('/'));
    }
}
