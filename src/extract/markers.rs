//! Open/close marker accounting shared by extraction and truncation recovery

/// Pair of characters delimiting a nested structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralMarkers {
    pub open: char,
    pub close: char,
}

impl StructuralMarkers {
    /// Curly braces, used for both JSON payloads and TypeScript sources
    pub const BRACES: StructuralMarkers = StructuralMarkers {
        open: '{',
        close: '}',
    };

    pub fn new(open: char, close: char) -> Self {
        Self { open, close }
    }

    pub fn count_open(&self, text: &str) -> usize {
        text.chars().filter(|c| *c == self.open).count()
    }

    pub fn count_close(&self, text: &str) -> usize {
        text.chars().filter(|c| *c == self.close).count()
    }

    /// Number of close markers missing to balance the text
    pub fn deficit(&self, text: &str) -> usize {
        self.count_open(text).saturating_sub(self.count_close(text))
    }

    pub fn starts_with_open(&self, text: &str) -> bool {
        text.trim_start().starts_with(self.open)
    }

    pub fn ends_with_open(&self, text: &str) -> bool {
        text.trim_end().ends_with(self.open)
    }

    /// Balanced counts and the last non-whitespace character is a close marker
    pub fn is_complete(&self, text: &str) -> bool {
        self.count_open(text) == self.count_close(text) && text.trim_end().ends_with(self.close)
    }

    /// Appends exactly the missing close markers on a new line
    pub fn force_close(&self, text: &str) -> String {
        let missing = self.deficit(text);
        if missing == 0 {
            return text.to_string();
        }
        let mut closed = String::with_capacity(text.len() + missing + 1);
        closed.push_str(text);
        closed.push('\n');
        closed.extend(std::iter::repeat(self.close).take(missing));
        closed
    }
}

impl Default for StructuralMarkers {
    fn default() -> Self {
        Self::BRACES
    }
}
