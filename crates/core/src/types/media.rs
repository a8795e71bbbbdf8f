//! Product media attachments.

use serde::{Deserialize, Serialize};

/// Kind of media attached to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    /// A 3D model (e.g. `.glb`) rendered with a model viewer.
    Model,
}

impl MediaKind {
    /// Storage folder uploads of this kind are placed in.
    #[must_use]
    pub const fn folder(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Video => "videos",
            Self::Model => "models",
        }
    }
}

/// One media entry, in the order it is displayed on the product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Public URL of the stored object.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl MediaItem {
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_json_shape() {
        let item = MediaItem {
            kind: MediaKind::Video,
            path: "https://cdn.example.com/videos/a.mp4".to_string(),
            alt: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "video");
        assert!(json.get("alt").is_none());
    }

    #[test]
    fn test_media_parse_with_alt() {
        let item: MediaItem =
            serde_json::from_str(r#"{"type":"image","path":"/a.jpg","alt":"Front"}"#).unwrap();
        assert!(item.is_image());
        assert_eq!(item.alt.as_deref(), Some("Front"));
    }
}
