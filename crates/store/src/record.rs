use markup_model::AnnotationId;
use serde::{Deserialize, Serialize};

fn first_page() -> u32 {
    1
}

/// One annotation row as exchanged with the persistence API.
///
/// The remote schema only has scalar columns; anything else travels in `text`
/// (see [`crate::codec`]). Unknown response fields such as `user_name` or
/// `created_at` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AnnotationId>,
    pub project_id: i64,
    pub file_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    pub color: String,
    #[serde(default = "first_page")]
    pub page: u32,
}

impl AnnotationRecord {
    /// Same row without its identifier, as sent on create.
    pub fn without_id(&self) -> Self {
        Self { id: None, ..self.clone() }
    }

    pub fn with_id(&self, id: AnnotationId) -> Self {
        Self { id: Some(id), ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_rows_with_extra_fields() {
        let json = r##"{
            "id": 12, "project_id": 1, "file_id": 4, "user_id": 9, "user_name": "Sam",
            "type": "rectangle", "x": 50.0, "y": 50.0, "width": 100.0, "height": 50.0,
            "text": "", "color": "#FF0000", "page": 2, "created_at": "2024-03-01T10:00:00"
        }"##;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, Some(AnnotationId(12)));
        assert_eq!(record.kind, "rectangle");
        assert_eq!(record.page, 2);
    }

    #[test]
    fn missing_page_defaults_to_first() {
        let json = r##"{"id": 1, "project_id": 1, "file_id": 1, "type": "line",
            "x": 0, "y": 0, "width": null, "height": null, "text": null, "color": "#000000"}"##;
        let record: AnnotationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.page, 1);
        assert_eq!(record.width, None);
    }

    #[test]
    fn create_payload_omits_id() {
        let record = AnnotationRecord {
            id: Some(AnnotationId(3)),
            project_id: 1,
            file_id: 2,
            kind: "text".into(),
            x: 1.0,
            y: 2.0,
            width: Some(0.0),
            height: Some(0.0),
            text: Some("hi".into()),
            color: "#FF0000".into(),
            page: 1,
        };
        let value = serde_json::to_value(record.without_id()).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["type"], "text");
    }
}
