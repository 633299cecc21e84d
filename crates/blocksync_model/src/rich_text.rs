//! Rich text runs.

/// Inline formatting flags of a [`RichTextRun`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Annotations {
    /// Bold.
    pub bold: bool,
    /// Italic.
    pub italic: bool,
    /// Strikethrough.
    pub strikethrough: bool,
    /// Underline.
    pub underline: bool,
    /// Inline code.
    pub code: bool,
}

impl Annotations {
    /// Returns true when no flag is set.
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// One formatted span of inline text.
///
/// A text block's content is an ordered sequence of runs whose
/// concatenation is the block's plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichTextRun {
    /// Literal text of the span.
    pub text: String,
    /// Formatting flags.
    pub annotations: Annotations,
    /// Optional hyperlink target.
    pub href: Option<String>,
}

impl RichTextRun {
    /// Creates an unformatted run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotations: Annotations::default(),
            href: None,
        }
    }

    /// Creates a run with the given annotations.
    pub fn styled(text: impl Into<String>, annotations: Annotations) -> Self {
        Self {
            text: text.into(),
            annotations,
            href: None,
        }
    }

    /// Marks the run bold.
    pub fn bold(mut self) -> Self {
        self.annotations.bold = true;
        self
    }

    /// Marks the run italic.
    pub fn italic(mut self) -> Self {
        self.annotations.italic = true;
        self
    }

    /// Marks the run struck through.
    pub fn strikethrough(mut self) -> Self {
        self.annotations.strikethrough = true;
        self
    }

    /// Marks the run underlined.
    pub fn underline(mut self) -> Self {
        self.annotations.underline = true;
        self
    }

    /// Marks the run as inline code.
    pub fn code(mut self) -> Self {
        self.annotations.code = true;
        self
    }

    /// Attaches a hyperlink.
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Returns true if both runs carry the same formatting and link.
    pub fn same_format(&self, other: &RichTextRun) -> bool {
        self.annotations == other.annotations && self.href == other.href
    }
}

/// Concatenates the text of every run.
pub fn plain_text(runs: &[RichTextRun]) -> String {
    runs.iter().map(|run| run.text.as_str()).collect()
}
