// src/services/block.rs

//! Block page detection.
//!
//! A plain substring scan for challenge-page signatures. No DOM parsing, so it
//! is cheap enough to run on every response. Legitimate pages that happen to
//! contain a marker are misclassified as blocked; reworded challenge pages
//! slip through as content.

use crate::models::DetectionConfig;

/// Classification of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClass {
    Content,
    Blocked,
}

/// Classifies response bodies as content or block pages.
#[derive(Debug, Clone)]
pub struct BlockDetector {
    markers: Vec<String>,
}

impl BlockDetector {
    /// Create a detector matching any of the given markers.
    pub fn new(markers: Vec<String>) -> Self {
        Self {
            markers: markers.into_iter().filter(|m| !m.is_empty()).collect(),
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.block_markers.clone())
    }

    pub fn classify(&self, body: &str) -> PageClass {
        if self.markers.iter().any(|marker| body.contains(marker.as_str())) {
            PageClass::Blocked
        } else {
            PageClass::Content
        }
    }

    pub fn is_blocked(&self, body: &str) -> bool {
        self.classify(body) == PageClass::Blocked
    }
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}
