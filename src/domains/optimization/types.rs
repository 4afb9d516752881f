//! Type definitions for the optimization domain.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{DomainError, ValidationError};

pub const DEFAULT_QUALITY: u8 = 80;
pub const DEFAULT_SCALE: u8 = 100;
pub const DEFAULT_DIMENSION: u32 = 100;

pub const QUALITY_MIN: u8 = 60;
pub const QUALITY_MAX: u8 = 100;
pub const SCALE_MIN: u8 = 10;
pub const SCALE_MAX: u8 = 100;

/// Target encodings supported by the transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Png,
    Jpg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
        }
    }

    /// File extension for outputs in this format.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "image/webp",
            OutputFormat::Png => "image/png",
            OutputFormat::Jpg => "image/jpeg",
        }
    }

    /// Resolve a caller-supplied format string. Unrecognized or absent
    /// values select webp.
    pub fn resolve(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("jpg") | Some("jpeg") => OutputFormat::Jpg,
            Some("png") => OutputFormat::Png,
            _ => OutputFormat::Webp,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "webp" => Ok(OutputFormat::Webp),
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpg),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "format",
                &format!("unknown output format: {}", s),
            ))),
        }
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.as_str().to_string()
    }
}

/// Per-item transformation parameters.
///
/// Quality and scale are clamped into their valid ranges at construction.
/// Source dimensions are caller-supplied and trusted; they are never checked
/// against the decoded pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeParams {
    pub format: OutputFormat,
    pub quality: u8,
    pub scale: u8,
    pub source_width: u32,
    pub source_height: u32,
}

impl Default for OptimizeParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::Webp,
            quality: DEFAULT_QUALITY,
            scale: DEFAULT_SCALE,
            source_width: DEFAULT_DIMENSION,
            source_height: DEFAULT_DIMENSION,
        }
    }
}

impl OptimizeParams {
    /// Build parameters from raw form field values.
    ///
    /// Absent fields take their defaults. Numeric fields outside their valid
    /// range are clamped; values that do not parse as numbers are rejected
    /// so they never reach the encoder.
    pub fn from_fields(
        format: Option<&str>,
        quality: Option<&str>,
        scale: Option<&str>,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            format: OutputFormat::resolve(format),
            quality: parse_clamped("quality", quality, QUALITY_MIN, QUALITY_MAX, DEFAULT_QUALITY)?,
            scale: parse_clamped("scale", scale, SCALE_MIN, SCALE_MAX, DEFAULT_SCALE)?,
            source_width: parse_dimension("width", width)?,
            source_height: parse_dimension("height", height)?,
        })
    }

    /// Effective output dimensions: `floor(scale/100 * source)`, per axis.
    pub fn output_dimensions(&self) -> (u32, u32) {
        let factor = self.scale as f64 / 100.0;
        let width = (factor * self.source_width as f64).floor() as u32;
        let height = (factor * self.source_height as f64).floor() as u32;
        (width, height)
    }
}

/// Parse a numeric field, clamping into `[min, max]`.
fn parse_clamped(
    field: &str,
    raw: Option<&str>,
    min: u8,
    max: u8,
    default: u8,
) -> Result<u8, ValidationError> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return Ok(default),
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| ValidationError::invalid_value(field, &format!("not a number: '{}'", raw)))?;
    if !value.is_finite() {
        return Err(ValidationError::invalid_value(field, "not a finite number"));
    }
    let value = value.floor();
    Ok(value.clamp(min as f64, max as f64) as u8)
}

/// Parse a caller-supplied source dimension. Must be a positive number.
fn parse_dimension(field: &str, raw: Option<&str>) -> Result<u32, ValidationError> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return Ok(DEFAULT_DIMENSION),
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| ValidationError::invalid_value(field, &format!("not a number: '{}'", raw)))?;
    if !value.is_finite() || value < 1.0 {
        return Err(ValidationError::invalid_value(
            field,
            &format!("must be a positive number, got '{}'", raw),
        ));
    }
    Ok(value.floor().min(u32::MAX as f64) as u32)
}

/// Outcome of one item in a batch, tagged with its submission index so
/// input/output correspondence survives skipped and failed items.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub index: usize,
    pub result: ItemResult,
}

#[derive(Debug, Clone)]
pub enum ItemResult {
    Ok(OptimizedImage),
    Skipped,
    Failed(String),
}

impl ItemOutcome {
    pub fn ok(index: usize, image: OptimizedImage) -> Self {
        Self {
            index,
            result: ItemResult::Ok(image),
        }
    }

    pub fn skipped(index: usize) -> Self {
        Self {
            index,
            result: ItemResult::Skipped,
        }
    }

    pub fn failed(index: usize, error: String) -> Self {
        Self {
            index,
            result: ItemResult::Failed(error),
        }
    }
}

/// A transcoded image buffer plus what it was encoded as.
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// One entry of a batch submission: the raw file blob (if any arrived) and
/// the per-item parameter parse result.
#[derive(Debug)]
pub struct BatchItem {
    pub index: usize,
    pub file: Option<Vec<u8>>,
    pub params: Result<OptimizeParams, ValidationError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_resolution_defaults_to_webp() {
        assert_eq!(OutputFormat::resolve(Some("jpg")), OutputFormat::Jpg);
        assert_eq!(OutputFormat::resolve(Some("png")), OutputFormat::Png);
        assert_eq!(OutputFormat::resolve(Some("webp")), OutputFormat::Webp);
        // Anything unrecognized, including other real image formats, maps to webp
        assert_eq!(OutputFormat::resolve(Some("gif")), OutputFormat::Webp);
        assert_eq!(OutputFormat::resolve(Some("avif")), OutputFormat::Webp);
        assert_eq!(OutputFormat::resolve(Some("")), OutputFormat::Webp);
        assert_eq!(OutputFormat::resolve(None), OutputFormat::Webp);
    }

    #[test]
    fn test_defaults_apply_when_fields_absent() {
        let params = OptimizeParams::from_fields(None, None, None, None, None).unwrap();
        assert_eq!(params.format, OutputFormat::Webp);
        assert_eq!(params.quality, DEFAULT_QUALITY);
        assert_eq!(params.scale, DEFAULT_SCALE);
        assert_eq!(params.source_width, DEFAULT_DIMENSION);
        assert_eq!(params.source_height, DEFAULT_DIMENSION);
    }

    #[test]
    fn test_quality_and_scale_are_clamped() {
        let params = OptimizeParams::from_fields(
            Some("png"),
            Some("5"),
            Some("150"),
            Some("800"),
            Some("600"),
        )
        .unwrap();
        assert_eq!(params.quality, QUALITY_MIN);
        assert_eq!(params.scale, SCALE_MAX);

        let params =
            OptimizeParams::from_fields(None, Some("200"), Some("3"), None, None).unwrap();
        assert_eq!(params.quality, QUALITY_MAX);
        assert_eq!(params.scale, SCALE_MIN);
    }

    #[test]
    fn test_non_numeric_values_are_rejected() {
        assert!(OptimizeParams::from_fields(None, Some("best"), None, None, None).is_err());
        assert!(OptimizeParams::from_fields(None, None, Some("half"), None, None).is_err());
        assert!(OptimizeParams::from_fields(None, None, None, Some("NaN"), None).is_err());
        assert!(OptimizeParams::from_fields(None, None, None, None, Some("-20")).is_err());
    }

    #[test]
    fn test_output_dimensions_floor() {
        let params = OptimizeParams {
            scale: 50,
            source_width: 800,
            source_height: 600,
            ..Default::default()
        };
        assert_eq!(params.output_dimensions(), (400, 300));

        // Identity at scale=100
        let params = OptimizeParams {
            scale: 100,
            source_width: 1920,
            source_height: 1080,
            ..Default::default()
        };
        assert_eq!(params.output_dimensions(), (1920, 1080));

        // Minimum scale, with flooring of fractional results
        let params = OptimizeParams {
            scale: 10,
            source_width: 123,
            source_height: 45,
            ..Default::default()
        };
        assert_eq!(params.output_dimensions(), (12, 4));
    }

    #[test]
    fn test_fractional_field_values_floor() {
        let params = OptimizeParams::from_fields(
            None,
            Some("80.9"),
            Some("50.5"),
            Some("801.7"),
            Some("600"),
        )
        .unwrap();
        assert_eq!(params.quality, 80);
        assert_eq!(params.scale, 50);
        assert_eq!(params.source_width, 801);
        assert_eq!(params.output_dimensions(), (400, 300));
    }
}
