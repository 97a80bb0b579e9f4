//! Presentation sinks.
//!
//! A sink is the engine's one-way attachment point to whatever displays a
//! variable: it receives decorated option lists, the current value, and
//! tooltips. Frontend events travel the other way through
//! [`crate::Engine::frontend_change`]. The engine itself never depends on a
//! real widget toolkit; [`NullSink`] serves headless use.

/// Marker prepended to option display strings that are currently valid.
pub const VALID_GLYPH: char = '\u{2713}';

/// Marker prepended to option display strings that are currently invalid.
pub const INVALID_GLYPH: char = '\u{274C}';

/// The abstract display surface of one variable.
pub trait PresentationSink {
    /// Replace the displayed options list (already decorated with marker
    /// glyphs, and filtered when the variable hides invalid options).
    fn set_options(&mut self, options: Vec<String>);

    /// Replace the displayed value; `None` is the unset sentinel.
    fn set_value(&mut self, value: Option<String>);

    /// Replace the per-option tooltips.
    fn set_tooltips(&mut self, tooltips: Vec<String>);
}

/// A sink that discards everything; the default for headless engines.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn set_options(&mut self, _options: Vec<String>) {}
    fn set_value(&mut self, _value: Option<String>) {}
    fn set_tooltips(&mut self, _tooltips: Vec<String>) {}
}

/// Decorate a display string with its validity marker.
pub(crate) fn decorate(valid: bool, display: &str) -> String {
    let glyph = if valid { VALID_GLYPH } else { INVALID_GLYPH };
    format!("{} {}", glyph, display)
}

/// Split a display string into its marker (if any) and the payload.
///
/// Returns `Some(true)` for the valid glyph, `Some(false)` for the invalid
/// glyph, `None` when the string carries no marker.
pub(crate) fn strip_marker(display: &str) -> (Option<bool>, &str) {
    let mut chars = display.chars();
    match chars.next() {
        Some(VALID_GLYPH) => (Some(true), chars.as_str().trim_start()),
        Some(INVALID_GLYPH) => (Some(false), chars.as_str().trim_start()),
        _ => (None, display),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorate_and_strip_round_trip() {
        let shown = decorate(true, "cam");
        assert_eq!(strip_marker(&shown), (Some(true), "cam"));

        let shown = decorate(false, "dice");
        assert_eq!(strip_marker(&shown), (Some(false), "dice"));

        assert_eq!(strip_marker("bare"), (None, "bare"));
    }
}
