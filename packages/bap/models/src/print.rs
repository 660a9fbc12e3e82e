//! Print document nodes.
//!
//! The report is a flat list of nodes shaped for a pdfmake-style document
//! definition: styled text blocks (optionally nested into runs) and SVG
//! chart images. Field names serialize exactly as the PDF library expects.

use serde::{Deserialize, Serialize};

/// One node of a print document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrintNode {
    Text(TextBlock),
    Svg(SvgBlock),
}

impl From<TextBlock> for PrintNode {
    fn from(block: TextBlock) -> Self {
        Self::Text(block)
    }
}

impl From<SvgBlock> for PrintNode {
    fn from(block: SvgBlock) -> Self {
        Self::Svg(block)
    }
}

/// Text content: a single string or a list of styled runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrintText {
    Plain(String),
    Runs(Vec<TextBlock>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageBreak {
    Before,
    After,
}

/// A styled text block. `margin` is `[left, top, right, bottom]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub text: PrintText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italics: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_leading_spaces: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_break: Option<PageBreak>,
}

impl TextBlock {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_text(PrintText::Plain(text.into()))
    }

    #[must_use]
    pub fn runs(runs: Vec<Self>) -> Self {
        Self::with_text(PrintText::Runs(runs))
    }

    const fn with_text(text: PrintText) -> Self {
        Self {
            text,
            style: None,
            margin: None,
            link: None,
            decoration: None,
            bold: None,
            italics: None,
            preserve_leading_spaces: None,
            page_break: None,
        }
    }

    #[must_use]
    pub fn style(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }

    #[must_use]
    pub const fn margin(mut self, margin: [f64; 4]) -> Self {
        self.margin = Some(margin);
        self
    }

    #[must_use]
    pub fn link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    #[must_use]
    pub fn underline(mut self) -> Self {
        self.decoration = Some("underline".to_string());
        self
    }

    #[must_use]
    pub const fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    #[must_use]
    pub const fn italics(mut self) -> Self {
        self.italics = Some(true);
        self
    }

    #[must_use]
    pub const fn preserve_leading_spaces(mut self) -> Self {
        self.preserve_leading_spaces = Some(true);
        self
    }

    #[must_use]
    pub const fn page_break(mut self, page_break: PageBreak) -> Self {
        self.page_break = Some(page_break);
        self
    }

    /// Plain text of the block (runs concatenated).
    #[must_use]
    pub fn plain_text(&self) -> String {
        match &self.text {
            PrintText::Plain(text) => text.clone(),
            PrintText::Runs(runs) => runs.iter().map(Self::plain_text).collect(),
        }
    }
}

/// A chart rendered as an SVG image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvgBlock {
    pub svg: String,
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<[f64; 4]>,
}
