use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, Luma};
use qrcode::QrCode;

use crate::error::{PaymentError, Result};

/// Renders payment links as QR codes
pub struct QrCodeService;

impl QrCodeService {
    pub fn generate_qr_code(payment_url: &str) -> Result<DynamicImage> {
        if payment_url.is_empty() {
            return Err(PaymentError::QrCode("Payment URL cannot be empty".to_string()));
        }

        let qr = QrCode::new(payment_url.as_bytes())
            .map_err(|e| PaymentError::QrCode(format!("Failed to generate QR code: {}", e)))?;

        let image = qr
            .render::<Luma<u8>>()
            .min_dimensions(256, 256)
            .build();

        Ok(DynamicImage::ImageLuma8(image))
    }

    pub fn generate_qr_code_png(payment_url: &str) -> Result<Vec<u8>> {
        let image = Self::generate_qr_code(payment_url)?;

        let mut png_bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut png_bytes),
                image::ImageFormat::Png,
            )
            .map_err(|e| PaymentError::QrCode(format!("Failed to encode PNG: {}", e)))?;

        Ok(png_bytes)
    }

    /// `data:image/png;base64,…` rendering for inline display
    pub fn generate_qr_code_data_url(payment_url: &str) -> Result<String> {
        let png_bytes = Self::generate_qr_code_png(payment_url)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png_bytes)))
    }

    /// Decode the first QR code found in PNG bytes
    pub fn scan_qr_code_from_png(png_bytes: &[u8]) -> Result<String> {
        let image = image::load_from_memory_with_format(png_bytes, image::ImageFormat::Png)
            .map_err(|e| PaymentError::QrCode(format!("Failed to load PNG: {}", e)))?;

        let mut prepared = rqrr::PreparedImage::prepare(image.to_luma8());
        let grids = prepared.detect_grids();
        let grid = grids
            .first()
            .ok_or_else(|| PaymentError::QrCode("No QR code found in image".to_string()))?;

        let (_, content) = grid
            .decode()
            .map_err(|e| PaymentError::QrCode(format!("Failed to decode QR code: {:?}", e)))?;

        Ok(content)
    }
}
