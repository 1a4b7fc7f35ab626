//! QR codes for the custom capture URL

use qrcode::render::unicode;
use qrcode::QrCode;

/// Compact QR code (two modules per character row) for the dashboard
pub fn qr_code_lines(url: &str) -> Vec<String> {
    let code = match QrCode::new(url) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!("Failed to generate QR code: {}", e);
            return Vec::new();
        }
    };

    code.render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(false)
        .build()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Print a QR code for the given URL
pub fn print_qr_code(url: &str) {
    let code = match QrCode::new(url) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!("Failed to generate QR code: {}", e);
            return;
        }
    };

    let string = code
        .render::<char>()
        .quiet_zone(false)
        .module_dimensions(2, 1)
        .build();

    println!();
    println!("{}", console::style("  Scan to open:").dim());
    for line in string.lines() {
        println!("  {}", line);
    }
}
