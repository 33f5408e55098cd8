use std::fs;
use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageReader;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use vidaudit_contracts::attachment::{Attachment, AttachmentId, PreviewHandle};

const FALLBACK_MIME: &str = "image/png";

/// Ordered collection of user-supplied images.
///
/// Ids are handed out from a per-store counter and never reused, so an id
/// held by the presentation layer can't silently point at a newer file.
#[derive(Debug, Clone, Default)]
pub struct AttachmentStore {
    items: IndexMap<AttachmentId, Attachment>,
    next_id: u64,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, data: Vec<u8>, mime_type: &str) -> Option<Attachment> {
        self.add_named(data, mime_type, None)
    }

    /// Unreadable (empty) blobs are dropped with a warning instead of failing
    /// the whole batch.
    pub fn add_named(
        &mut self,
        data: Vec<u8>,
        mime_type: &str,
        file_name: Option<&str>,
    ) -> Option<Attachment> {
        if data.is_empty() {
            warn!(
                file = file_name.unwrap_or("<unnamed>"),
                "skipping unreadable attachment"
            );
            return None;
        }

        self.next_id += 1;
        let id = AttachmentId(self.next_id);
        let mime_type = resolve_mime(mime_type, &data);
        let label = file_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("attachment-{id}"));
        let preview = PreviewHandle {
            label,
            fingerprint: fingerprint(&data),
            byte_len: data.len(),
            dimensions: probe_dimensions(&data),
        };
        let attachment = Attachment {
            id,
            encoded: BASE64.encode(&data),
            data,
            mime_type,
            preview,
        };
        debug!(
            id = %attachment.id,
            mime = %attachment.mime_type,
            bytes = attachment.preview.byte_len,
            "attachment added"
        );
        self.items.insert(id, attachment.clone());
        Some(attachment)
    }

    pub fn add_path(&mut self, path: &Path) -> Option<Attachment> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable attachment");
                return None;
            }
        };
        let file_name = path.file_name().and_then(|name| name.to_str());
        self.add_named(data, mime_for_path(path).unwrap_or(""), file_name)
    }

    /// Returns whether anything was removed.
    pub fn remove(&mut self, id: AttachmentId) -> bool {
        let removed = self.items.shift_remove(&id);
        if let Some(attachment) = &removed {
            debug!(id = %id, label = %attachment.preview.label, "attachment released");
        }
        removed.is_some()
    }

    pub fn release(&mut self, ids: &[AttachmentId]) {
        for id in ids {
            self.remove(*id);
        }
    }

    pub fn list(&self) -> Vec<Attachment> {
        self.items.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

fn resolve_mime(declared: &str, data: &[u8]) -> String {
    let declared = declared.trim();
    if !declared.is_empty() {
        return declared.to_ascii_lowercase();
    }
    image::guess_format(data)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME.to_string())
}

fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn fingerprint(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(&digest[..4])
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}
