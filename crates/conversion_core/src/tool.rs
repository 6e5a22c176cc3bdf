//! Conversion tool catalogue and per-tool form options.

use std::fmt;

/// How a tool names its download when the response carries no filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputNaming {
    /// `{stem}{suffix}.{extension}` where `stem` is everything before the first `.`.
    Stem { suffix: String, extension: String },
    /// `{prefix}{source_name}.{extension}`.
    Prefixed { prefix: String, extension: String },
}

impl OutputNaming {
    pub fn new(suffix: impl Into<String>, extension: impl Into<String>) -> Self {
        OutputNaming::Stem {
            suffix: suffix.into(),
            extension: extension.into(),
        }
    }

    pub fn prefixed(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        OutputNaming::Prefixed {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn apply(&self, source_name: &str) -> String {
        match self {
            OutputNaming::Stem { suffix, extension } => {
                let stem = source_name.split('.').next().unwrap_or_default().trim();
                let stem = if stem.is_empty() { "converted" } else { stem };
                format!("{stem}{suffix}.{extension}")
            }
            OutputNaming::Prefixed { prefix, extension } => {
                format!("{prefix}{source_name}.{extension}")
            }
        }
    }
}

/// One conversion endpoint and its client-side conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub id: String,
    pub title: String,
    pub endpoint: String,
    pub accept: Vec<String>,
    pub naming: OutputNaming,
}

impl ToolSpec {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        endpoint: impl Into<String>,
        accept: &[&str],
        naming: OutputNaming,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            endpoint: endpoint.into(),
            accept: accept.iter().map(|ext| ext.to_string()).collect(),
            naming,
        }
    }

    /// Client-side extension pre-check. The server stays authoritative.
    pub fn accepts(&self, file_name: &str) -> bool {
        if self.accept.is_empty() {
            return true;
        }
        let lower = file_name.to_ascii_lowercase();
        self.accept
            .iter()
            .any(|ext| lower.ends_with(&ext.to_ascii_lowercase()))
    }
}

/// Every tool the conversion API exposes.
pub fn catalogue() -> Vec<ToolSpec> {
    let pdf = || OutputNaming::new("", "pdf");
    vec![
        ToolSpec::new("word-to-pdf", "Word to PDF", "/convert/docx", &[".docx"], pdf()),
        ToolSpec::new("excel-to-pdf", "Excel to PDF", "/convert/xlsx", &[".xlsx"], pdf()),
        ToolSpec::new(
            "image-to-pdf",
            "Image to PDF",
            "/convert/image",
            &[".jpg", ".jpeg", ".png"],
            pdf(),
        ),
        ToolSpec::new(
            "ppt-to-pdf",
            "PowerPoint to PDF",
            "/convert/pptx",
            &[".pptx", ".ppt"],
            pdf(),
        ),
        ToolSpec::new("html-to-pdf", "HTML to PDF", "/convert/html", &[".html"], pdf()),
        ToolSpec::new(
            "pdf-to-word",
            "PDF to Word",
            "/convert/pdf-to-word",
            &[".pdf"],
            OutputNaming::new("", "docx"),
        ),
        ToolSpec::new(
            "pdf-to-excel",
            "PDF to Excel",
            "/convert/pdf-to-excel",
            &[".pdf"],
            OutputNaming::new("", "xlsx"),
        ),
        ToolSpec::new(
            "pdf-to-jpg",
            "PDF to JPG",
            "/convert/pdf-to-jpg",
            &[".pdf"],
            OutputNaming::new("", "jpg"),
        ),
        ToolSpec::new(
            "pdf-to-ppt",
            "PDF to PowerPoint",
            "/convert/pdf-to-pptx",
            &[".pdf"],
            OutputNaming::new("", "pptx"),
        ),
        ToolSpec::new(
            "compress-pdf",
            "Compress PDF",
            "/compress/pdf",
            &[".pdf"],
            OutputNaming::new("_compressed", "pdf"),
        ),
        ToolSpec::new(
            "rotate-pdf",
            "Rotate PDF",
            "/edit/rotate-pdf",
            &[".pdf"],
            OutputNaming::new("_rotated", "pdf"),
        ),
        ToolSpec::new(
            "watermark-pdf",
            "Watermark PDF",
            "/edit/watermark-pdf",
            &[".pdf"],
            OutputNaming::new("_watermarked", "pdf"),
        ),
        ToolSpec::new(
            "page-numbers-pdf",
            "Page Numbers",
            "/edit/page-numbers-pdf",
            &[".pdf"],
            OutputNaming::new("_numbered", "pdf"),
        ),
        ToolSpec::new(
            "crop-pdf",
            "Crop PDF",
            "/edit/crop-pdf",
            &[".pdf"],
            OutputNaming::new("_cropped", "pdf"),
        ),
        ToolSpec::new(
            "add-text-pdf",
            "Edit PDF",
            "/edit/add-text-pdf",
            &[".pdf"],
            OutputNaming::new("_edited", "pdf"),
        ),
    ]
}

pub fn find_tool(id: &str) -> Option<ToolSpec> {
    catalogue().into_iter().find(|tool| tool.id == id)
}

/// A scalar multipart field sent alongside the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberPosition {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

impl NumberPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            NumberPosition::TopLeft => "top-left",
            NumberPosition::TopCenter => "top-center",
            NumberPosition::TopRight => "top-right",
            NumberPosition::BottomLeft => "bottom-left",
            NumberPosition::BottomCenter => "bottom-center",
            NumberPosition::BottomRight => "bottom-right",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let position = match raw.trim().to_ascii_lowercase().as_str() {
            "top-left" => NumberPosition::TopLeft,
            "top-center" => NumberPosition::TopCenter,
            "top-right" => NumberPosition::TopRight,
            "bottom-left" => NumberPosition::BottomLeft,
            "bottom-center" => NumberPosition::BottomCenter,
            "bottom-right" => NumberPosition::BottomRight,
            _ => return None,
        };
        Some(position)
    }
}

impl fmt::Display for NumberPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionLevel::Low => "low",
            CompressionLevel::Medium => "medium",
            CompressionLevel::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(CompressionLevel::Low),
            "medium" => Some(CompressionLevel::Medium),
            "high" => Some(CompressionLevel::High),
            _ => None,
        }
    }
}

/// Auxiliary inputs for tools that take more than the file.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ToolOptions {
    #[default]
    None,
    TextOverlay {
        text: String,
        x: f64,
        y: f64,
    },
    PageNumbering {
        position: NumberPosition,
        start_from: u32,
        end_at: Option<u32>,
    },
    Rotation {
        degrees: u16,
    },
    Watermark {
        text: String,
    },
    CropMargin {
        margin: u32,
    },
    Compression {
        level: CompressionLevel,
    },
}

impl ToolOptions {
    /// Ordered form fields; coordinates are rounded to whole points.
    pub fn form_fields(&self) -> Vec<FormField> {
        match self {
            ToolOptions::None => Vec::new(),
            ToolOptions::TextOverlay { text, x, y } => vec![
                FormField::new("text", text),
                FormField::new("x", x.round() as i64),
                FormField::new("y", y.round() as i64),
            ],
            ToolOptions::PageNumbering {
                position,
                start_from,
                end_at,
            } => {
                let mut fields = vec![
                    FormField::new("position", position),
                    FormField::new("start_from", start_from),
                ];
                if let Some(end_at) = end_at {
                    fields.push(FormField::new("end_at", end_at));
                }
                fields
            }
            ToolOptions::Rotation { degrees } => vec![FormField::new("rotation", degrees)],
            ToolOptions::Watermark { text } => vec![FormField::new("text", text)],
            ToolOptions::CropMargin { margin } => vec![FormField::new("margin", margin)],
            ToolOptions::Compression { level } => {
                vec![FormField::new("compression_level", level.as_str())]
            }
        }
    }
}
