//! QR code rendering of payload strings.

use qrcode::render::{svg, unicode};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while producing a QR image.
#[derive(Debug, Error)]
pub enum QrError {
	#[error("QR encoding failed: {0}")]
	Encode(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Error-correction level of the generated symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
	Low,
	#[default]
	Medium,
	Quartile,
	High,
}

impl From<ErrorCorrection> for EcLevel {
	fn from(level: ErrorCorrection) -> Self {
		match level {
			ErrorCorrection::Low => EcLevel::L,
			ErrorCorrection::Medium => EcLevel::M,
			ErrorCorrection::Quartile => EcLevel::Q,
			ErrorCorrection::High => EcLevel::H,
		}
	}
}

impl FromStr for ErrorCorrection {
	type Err = QrError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"low" | "l" => Ok(ErrorCorrection::Low),
			"medium" | "m" => Ok(ErrorCorrection::Medium),
			"quartile" | "q" => Ok(ErrorCorrection::Quartile),
			"high" | "h" => Ok(ErrorCorrection::High),
			other => Err(QrError::Encode(format!(
				"Unknown error correction level '{}'",
				other
			))),
		}
	}
}

/// Renders payloads as QR symbols.
#[derive(Debug, Clone)]
pub struct QrRenderer {
	level: ErrorCorrection,
	min_dimension: u32,
}

impl Default for QrRenderer {
	fn default() -> Self {
		Self::new(ErrorCorrection::default(), 300)
	}
}

impl QrRenderer {
	/// `min_dimension` is the minimum SVG width/height in pixels.
	pub fn new(level: ErrorCorrection, min_dimension: u32) -> Self {
		Self {
			level,
			min_dimension,
		}
	}

	fn code(&self, data: &str) -> Result<QrCode, QrError> {
		QrCode::with_error_correction_level(data, self.level.into())
			.map_err(|e| QrError::Encode(e.to_string()))
	}

	/// SVG document bytes.
	pub fn svg(&self, data: &str) -> Result<Vec<u8>, QrError> {
		let image = self
			.code(data)?
			.render::<svg::Color>()
			.min_dimensions(self.min_dimension, self.min_dimension)
			.build();
		Ok(image.into_bytes())
	}

	/// Writes the SVG document to `path`.
	pub fn save_svg(&self, data: &str, path: impl AsRef<Path>) -> Result<(), QrError> {
		let image = self.svg(data)?;
		std::fs::write(path.as_ref(), image)?;
		tracing::info!(path = %path.as_ref().display(), "Wrote QR code");
		Ok(())
	}

	/// Half-block unicode rendering for terminals.
	pub fn terminal(&self, data: &str) -> Result<String, QrError> {
		Ok(self
			.code(data)?
			.render::<unicode::Dense1x2>()
			.dark_color(unicode::Dense1x2::Light)
			.light_color(unicode::Dense1x2::Dark)
			.build())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	fn payload() -> String {
		format!(
			"0x70997970C51812dc3A010C7d01b50e0d17dc79C8:0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC:20000000000000000000:3:1700000000:0x{}",
			"11".repeat(65)
		)
	}

	#[test]
	fn test_svg_output() {
		let image = QrRenderer::default().svg(&payload()).unwrap();
		let text = String::from_utf8(image).unwrap();
		assert!(text.contains("<svg"));
	}

	#[test]
	fn test_save_svg() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("transfer.svg");

		QrRenderer::new(ErrorCorrection::High, 200)
			.save_svg(&payload(), &path)
			.unwrap();
		assert!(std::fs::metadata(&path).unwrap().len() > 0);
	}

	#[test]
	fn test_terminal_output() {
		let art = QrRenderer::new(ErrorCorrection::Low, 0)
			.terminal(&payload())
			.unwrap();
		assert!(art.lines().count() > 10);
	}

	#[test]
	fn test_level_parsing() {
		assert_eq!("high".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::High);
		assert_eq!("Q".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::Quartile);
		assert!("ultra".parse::<ErrorCorrection>().is_err());
	}

	#[test]
	fn test_oversized_payload_fails() {
		let huge = "1".repeat(8000);
		assert!(matches!(
			QrRenderer::new(ErrorCorrection::High, 100).svg(&huge),
			Err(QrError::Encode(_))
		));
	}
}
