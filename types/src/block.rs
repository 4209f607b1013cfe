/// One rendered section of a model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayBlock {
    pub label: Option<String>,
    pub text: String,
    pub back_translation: Option<String>,
}

impl DisplayBlock {
    #[must_use]
    pub fn unlabeled(text: impl Into<String>) -> Self {
        Self {
            label: None,
            text: text.into(),
            back_translation: None,
        }
    }

    #[must_use]
    pub fn labeled(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            text: text.into(),
            back_translation: None,
        }
    }

    /// Whether the block has primary text. A back-translation alone does not count.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
