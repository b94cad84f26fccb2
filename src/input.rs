use std::path::Path;

use log::{ debug, info };

use crate::error::{ HarnessError, Result };
use crate::skills::SkillTestDescriptor;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];
const DOCUMENT_EXTENSIONS: [&str; 4] = ["pdf", "docx", "xlsx", "pptx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    Image,
    Document,
}

/// The single test input uploaded for a skill run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillInput {
    Text(String),
    Binary {
        bytes: Vec<u8>,
        kind: BinaryKind,
    },
}

impl SkillInput {
    pub fn text(text: impl Into<String>) -> Self {
        SkillInput::Text(text.into())
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        SkillInput::Binary { bytes, kind: BinaryKind::Image }
    }

    /// Reads a local file: images and office/PDF documents as raw bytes, anything else
    /// as UTF-8 text.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let read_bytes = || {
            std::fs::read(path).map_err(|e|
                HarnessError::Input(format!("cannot read {}: {}", path.display(), e))
            )
        };

        let input = if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            SkillInput::Binary { bytes: read_bytes()?, kind: BinaryKind::Image }
        } else if DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
            SkillInput::Binary { bytes: read_bytes()?, kind: BinaryKind::Document }
        } else {
            let text = String::from_utf8(read_bytes()?).map_err(|_| {
                HarnessError::Input(format!("{} is not UTF-8 text", path.display()))
            })?;
            SkillInput::Text(text)
        };

        info!("Loaded {} ({} bytes) from {}", input.describe(), input.len(), path.display());
        Ok(input)
    }

    pub fn len(&self) -> usize {
        match self {
            SkillInput::Text(text) => text.len(),
            SkillInput::Binary { bytes, .. } => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn describe(&self) -> &'static str {
        match self {
            SkillInput::Text(_) => "text input",
            SkillInput::Binary { kind: BinaryKind::Image, .. } => "image input",
            SkillInput::Binary { kind: BinaryKind::Document, .. } => "document input",
        }
    }

    /// Blob file extension, sniffed from magic bytes for binaries.
    pub fn extension(&self) -> &'static str {
        match self {
            SkillInput::Text(_) => "txt",
            SkillInput::Binary { bytes, kind } => {
                match sniff(bytes) {
                    Some(ext) => ext,
                    None if *kind == BinaryKind::Image => "jpg",
                    None => "bin",
                }
            }
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.extension() {
            "txt" => "text/plain; charset=utf-8",
            "png" => "image/png",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "tiff" => "image/tiff",
            "jpg" => "image/jpeg",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            SkillInput::Text(text) => text.into_bytes(),
            SkillInput::Binary { bytes, .. } => bytes,
        }
    }
}

fn sniff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF8") {
        Some("gif")
    } else if bytes.starts_with(b"BM") {
        Some("bmp")
    } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        Some("tiff")
    } else if bytes.starts_with(b"%PDF") {
        Some("pdf")
    } else {
        None
    }
}

/// Picks the run input (explicit text, then file, then the descriptor's sample) and checks
/// it suits the skill.
pub fn resolve_input(
    descriptor: &SkillTestDescriptor,
    text: Option<String>,
    file: Option<&Path>
) -> Result<SkillInput> {
    let input = if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
        SkillInput::Text(text)
    } else if let Some(path) = file {
        SkillInput::from_path(path)?
    } else {
        debug!("Using built-in sample input for {}", descriptor.name());
        descriptor.sample_input.to_input()
    };
    validate_input(descriptor, &input)?;
    Ok(input)
}

pub fn validate_input(descriptor: &SkillTestDescriptor, input: &SkillInput) -> Result<()> {
    if input.is_empty() {
        return Err(HarnessError::Input(format!("empty input for {}", descriptor.name())));
    }
    if descriptor.requires_image_input && !matches!(input, SkillInput::Binary { .. }) {
        return Err(
            HarnessError::Input(format!("{} needs an image or document input, got text", descriptor.name()))
        );
    }
    Ok(())
}
