use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display-only description of an attachment. Never sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewHandle {
    pub label: String,
    pub fingerprint: String,
    pub byte_len: usize,
    pub dimensions: Option<(u32, u32)>,
}

impl PreviewHandle {
    pub fn describe(&self) -> String {
        match self.dimensions {
            Some((width, height)) => format!(
                "{} ({}x{}, {} bytes, {})",
                self.label, width, height, self.byte_len, self.fingerprint
            ),
            None => format!("{} ({} bytes, {})", self.label, self.byte_len, self.fingerprint),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: AttachmentId,
    pub data: Vec<u8>,
    /// Standard-alphabet base64 of `data`, ready for an `inlineData` part.
    pub encoded: String,
    pub mime_type: String,
    pub preview: PreviewHandle,
}

#[cfg(test)]
mod tests {
    use super::PreviewHandle;

    #[test]
    fn preview_description_includes_dimensions_when_known() {
        let mut preview = PreviewHandle {
            label: "stats.png".to_string(),
            fingerprint: "deadbeef".to_string(),
            byte_len: 2048,
            dimensions: Some((1280, 720)),
        };
        assert_eq!(preview.describe(), "stats.png (1280x720, 2048 bytes, deadbeef)");

        preview.dimensions = None;
        assert_eq!(preview.describe(), "stats.png (2048 bytes, deadbeef)");
    }
}
