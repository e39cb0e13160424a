use super::settings::IdStyle;

/// Largest sequence value the legacy style can express before wrapping.
pub const LEGACY_WRAP: u64 = 99_999;

/// Builds record identifiers: a one-letter prefix plus a zero-padded sequence number.
#[derive(Debug, Clone)]
pub struct IdFormatter {
    prefix: char,
    style: IdStyle,
    width: usize,
    offset: u64,
}

impl IdFormatter {
    pub fn new(prefix: char, style: IdStyle, width: usize, offset: u64) -> Self {
        Self {
            prefix,
            style,
            width,
            offset,
        }
    }

    pub fn format(&self, index: u64) -> String {
        let sequence = match self.style {
            IdStyle::Sequential => self.offset.saturating_add(index),
            IdStyle::LegacyWrap => self.offset.saturating_add(index) % LEGACY_WRAP,
        };
        format!("{}{:0width$}", self.prefix, sequence, width = self.width)
    }
}
