//! System font lookup for text annotations and measurement labels.

use std::fs;
use std::sync::OnceLock;

use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use rusttype::{point, Font, Scale};

/// Sans-serif face used for every painted string.
///
/// `None` when the host has no usable font. Text then only reaches the
/// invisible text layer of exported PDFs.
pub fn label_font() -> Option<&'static Font<'static>> {
    static FONT: OnceLock<Option<Font<'static>>> = OnceLock::new();
    FONT.get_or_init(load_sans_serif).as_ref()
}

fn load_sans_serif() -> Option<Font<'static>> {
    let mut db = Database::new();
    db.load_system_fonts();

    let families = [
        Family::Name("Inter"),
        Family::Name("Arial"),
        Family::Name("DejaVu Sans"),
        Family::Name("Liberation Sans"),
        Family::SansSerif,
    ];
    let query = Query {
        families: &families,
        weight: Weight::NORMAL,
        stretch: Stretch::Normal,
        style: Style::Normal,
    };

    let Some(id) = db.query(&query) else {
        tracing::warn!(faces = db.len(), "no sans-serif system font; text will not be rasterized");
        return None;
    };
    let face = db.face(id)?;
    let font = match &face.source {
        Source::File(path) | Source::SharedFile(path, _) => fs::read(path)
            .ok()
            .and_then(|bytes| Font::try_from_vec_and_index(bytes, face.index)),
        Source::Binary(bytes) => {
            Font::try_from_vec_and_index(bytes.as_ref().as_ref().to_vec(), face.index)
        }
    };

    match &font {
        Some(_) => tracing::debug!(family = ?face.families.first(), "label font loaded"),
        None => tracing::warn!(family = ?face.families.first(), "label font could not be parsed"),
    }
    font
}

/// Advance width of `text` at `size` pixels.
///
/// Without a font the width is estimated at 0.6 em per character.
pub fn text_width(font: Option<&Font<'_>>, text: &str, size: f32) -> f32 {
    let Some(font) = font else {
        return text.chars().count() as f32 * size * 0.6;
    };
    font.layout(text, Scale::uniform(size), point(0.0, 0.0))
        .last()
        .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_width_scales_with_length_and_size() {
        assert_eq!(text_width(None, "", 14.0), 0.0);
        assert!((text_width(None, "abcd", 10.0) - 24.0).abs() < 1e-4);
        assert!(text_width(None, "abcdefgh", 10.0) > text_width(None, "abcd", 10.0));
    }

    #[test]
    fn measured_width_grows_with_text() {
        // Hosts without fonts only exercise the estimate above.
        let Some(font) = label_font() else {
            return;
        };
        let short = text_width(Some(font), "ab", 16.0);
        let long = text_width(Some(font), "abababab", 16.0);
        assert!(short > 0.0);
        assert!(long > short);
    }
}
