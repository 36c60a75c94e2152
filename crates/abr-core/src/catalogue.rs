//! Immutable per-quality segment table: the read-only "bitrate ladder" shared
//! across every session.

use serde::Deserialize;
use tracing::warn;

use crate::error::AbrError;

/// A single segment's static description at a given quality.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VideoInfo {
    pub start_time: f64,
    pub vmaf: f64,
    pub size: u64,
}

/// One quality's configuration entry, as supplied by the host descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoConfigEntry {
    pub resource: String,
    #[serde(default)]
    pub path: String,
    /// Nominal bitrate in kbps; used only to order the ladder.
    pub quality: i64,
    pub video_info: Vec<VideoInfo>,
}

/// The full catalogue descriptor a host constructs once, at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogueConfig {
    #[serde(default)]
    pub domain: String,
    pub segments: usize,
    pub video_configs: Vec<VideoConfigEntry>,
}

/// Immutable, shared, read-only segment table.
///
/// `segments[q][i]` is the `VideoInfo` for quality index `q` (ascending
/// bitrate) and segment index `i` (0-based internally; the telemetry's
/// 1-based `index` is translated at the call sites that read the catalogue).
/// `bitrate_array[q]` is the matching nominal bitrate in kbps.
#[derive(Debug, Clone)]
pub struct Catalogue {
    segments: Vec<Vec<VideoInfo>>,
    bitrate_array: Vec<i64>,
}

impl Catalogue {
    /// Builds the catalogue from a host descriptor.
    ///
    /// Resources are matched by name `"/video{i}"` for `i` in
    /// `0..video_configs.len()`, in insertion order; entries whose resource
    /// name doesn't match any expected slot are dropped with a warning.
    /// Matched entries are then sorted by `quality` ascending so that outer
    /// index `q` consistently identifies the same quality across
    /// `segments`, `bitrate_array`, and every policy's output, even when
    /// the descriptor didn't list qualities in bitrate order.
    pub fn from_config(config: &CatalogueConfig) -> Result<Self, AbrError> {
        if config.video_configs.is_empty() {
            return Err(AbrError::EmptyCatalogue);
        }

        let mut matched: Vec<&VideoConfigEntry> = Vec::with_capacity(config.video_configs.len());
        for i in 0..config.video_configs.len() {
            let expected = format!("/video{i}");
            match config
                .video_configs
                .iter()
                .find(|vc| vc.resource == expected)
            {
                Some(vc) => matched.push(vc),
                None => warn!(resource = %expected, "no catalogue entry for expected video resource"),
            }
        }
        for vc in &config.video_configs {
            if !matched.iter().any(|m| std::ptr::eq(*m, vc)) {
                warn!(resource = %vc.resource, "catalogue entry does not match any expected /video{{i}} slot, dropping");
            }
        }

        if matched.is_empty() {
            return Err(AbrError::EmptyCatalogue);
        }

        matched.sort_by_key(|vc| vc.quality);

        let expected_len = config.segments;
        for vc in &matched {
            if vc.video_info.len() != expected_len {
                return Err(AbrError::MismatchedSegmentCount {
                    quality: vc.quality as usize,
                    expected: expected_len,
                    actual: vc.video_info.len(),
                });
            }
        }

        let segments = matched.iter().map(|vc| vc.video_info.clone()).collect();
        let bitrate_array = matched.iter().map(|vc| vc.quality).collect();

        Ok(Self { segments, bitrate_array })
    }

    /// Number of qualities in the ladder (`K`).
    pub fn quality_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of segments per quality (`N`).
    pub fn segment_count(&self) -> usize {
        self.segments.first().map_or(0, Vec::len)
    }

    pub fn bitrate_array(&self) -> &[i64] {
        &self.bitrate_array
    }

    /// Segment info at quality `q`, 0-based segment `index`. `None` for an
    /// out-of-range index rather than panicking.
    pub fn info(&self, q: usize, index: usize) -> Option<&VideoInfo> {
        self.segments.get(q)?.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(resource: &str, quality: i64, n: usize) -> VideoConfigEntry {
        VideoConfigEntry {
            resource: resource.to_string(),
            path: String::new(),
            quality,
            video_info: (0..n)
                .map(|i| VideoInfo {
                    start_time: i as f64 * 4.0,
                    vmaf: 50.0 + quality as f64 / 100.0,
                    size: 100_000,
                })
                .collect(),
        }
    }

    #[test]
    fn test_sorts_qualities_ascending_regardless_of_descriptor_order() {
        let config = CatalogueConfig {
            domain: "example.com".into(),
            segments: 3,
            video_configs: vec![
                entry("/video0", 4000, 3),
                entry("/video1", 500, 3),
                entry("/video2", 1500, 3),
            ],
        };
        let cat = Catalogue::from_config(&config).unwrap();
        assert_eq!(cat.bitrate_array(), &[500, 1500, 4000]);
        assert_eq!(cat.quality_count(), 3);
    }

    #[test]
    fn test_drops_unmatched_resource_names() {
        let config = CatalogueConfig {
            domain: "example.com".into(),
            segments: 2,
            video_configs: vec![entry("/video0", 500, 2), entry("/bogus", 999, 2)],
        };
        let cat = Catalogue::from_config(&config).unwrap();
        assert_eq!(cat.quality_count(), 1);
        assert_eq!(cat.bitrate_array(), &[500]);
    }

    #[test]
    fn test_empty_catalogue_is_fatal() {
        let config = CatalogueConfig { domain: String::new(), segments: 0, video_configs: vec![] };
        assert!(matches!(Catalogue::from_config(&config), Err(AbrError::EmptyCatalogue)));
    }

    #[test]
    fn test_mismatched_segment_count_is_fatal() {
        let config = CatalogueConfig {
            domain: String::new(),
            segments: 3,
            video_configs: vec![entry("/video0", 500, 2)],
        };
        assert!(matches!(
            Catalogue::from_config(&config),
            Err(AbrError::MismatchedSegmentCount { .. })
        ));
    }

    #[test]
    fn test_out_of_range_lookups_return_none_not_panic() {
        let config = CatalogueConfig {
            domain: String::new(),
            segments: 2,
            video_configs: vec![entry("/video0", 500, 2)],
        };
        let cat = Catalogue::from_config(&config).unwrap();
        assert!(cat.info(0, 99).is_none());
        assert!(cat.info(99, 0).is_none());
    }
}
