//! Upload progress tracking and human-readable formatting.

use std::time::Instant;
use tracing::debug;

/// Tracks a single upload and reports it at debug level.
#[derive(Debug)]
pub struct UploadProgress {
    name: String,
    total_bytes: u64,
    transferred_bytes: u64,
    started: Instant,
}

impl UploadProgress {
    pub fn new(name: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            name: name.into(),
            total_bytes,
            transferred_bytes: 0,
            started: Instant::now(),
        }
    }

    /// Record the running byte count and log it.
    pub fn update(&mut self, transferred_bytes: u64) {
        self.transferred_bytes = transferred_bytes;
        debug!(
            "   {}: {} / {} ({:.1}%, {})",
            self.name,
            format_bytes(self.transferred_bytes),
            format_bytes(self.total_bytes),
            self.percent_complete(),
            format_speed(self.average_speed())
        );
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    pub fn percent_complete(&self) -> f64 {
        if self.total_bytes > 0 {
            ((self.transferred_bytes as f64 / self.total_bytes as f64) * 100.0).min(100.0)
        } else {
            100.0
        }
    }

    /// Average speed since start, bytes per second
    pub fn average_speed(&self) -> u64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            (self.transferred_bytes as f64 / elapsed) as u64
        } else {
            0
        }
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format speed as human-readable string
pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}
