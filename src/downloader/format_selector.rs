// FormatSelector - turns a raw format listing into a selectable catalog
//
// Handles:
// - Dedup by format id (first occurrence wins)
// - Dropping audio-only renditions (playlist downloads always carry video)
// - Human labels (container, resolution, fps, codecs, bitrate, size)
// - Ranking by height, then audio presence, then fps

use std::collections::HashSet;

use super::models::{CatalogEntry, FormatDescriptor};

const CODEC_LABEL_MAX: usize = 20;

/// Format selector for playlist downloads
pub struct FormatSelector;

impl FormatSelector {
    /// Build the catalog for one representative video.
    /// An empty result is valid and means nothing downloadable was listed.
    pub fn build_catalog(formats: &[FormatDescriptor]) -> Vec<CatalogEntry> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut catalog = Vec::new();

        for format in formats {
            let id = format.format_id.trim();
            if id.is_empty() || !seen.insert(id) {
                continue;
            }
            if format.is_audio_only() {
                continue;
            }

            let height = format.height.unwrap_or(0);
            let fps = format.fps.map(|f| f as u32).unwrap_or(0);

            catalog.push(CatalogEntry {
                format_id: id.to_string(),
                display_label: Self::label(id, format, height, fps),
                is_video_only: format.is_video_only(),
                height,
                fps,
            });
        }

        // stable: equal keys keep listing order
        catalog.sort_by(|a, b| b.rank_key().cmp(&a.rank_key()));
        catalog
    }

    /// Look up an entry by its format id
    pub fn find<'a>(catalog: &'a [CatalogEntry], format_id: &str) -> Option<&'a CatalogEntry> {
        catalog.iter().find(|e| e.format_id == format_id)
    }

    fn label(id: &str, format: &FormatDescriptor, height: u32, fps: u32) -> String {
        let resolution = if height > 0 {
            format!("{}p", height)
        } else {
            "?p".to_string()
        };
        let fps_part = if fps > 0 {
            format!("/{}fps", fps)
        } else {
            String::new()
        };
        let bitrate_part = format
            .tbr
            .map(|tbr| format!(" | ~{}kbps", tbr.round()))
            .unwrap_or_default();
        let size_part = format
            .effective_size()
            .map(|bytes| format!(" | ~{}MB", (bytes as f64 / 1_048_576.0).round()))
            .unwrap_or_default();

        format!(
            "{} | {} | {}{} | v:{} a:{}{}{}",
            id,
            format.ext,
            resolution,
            fps_part,
            Self::codec_label(format.vcodec.as_deref()),
            Self::codec_label(format.acodec.as_deref()),
            bitrate_part,
            size_part
        )
    }

    /// Codec shorthand: "?" when unknown, long strings cut with an ellipsis
    fn codec_label(codec: Option<&str>) -> String {
        match codec.map(str::trim) {
            None | Some("") => "?".to_string(),
            Some(c) if c.chars().count() > CODEC_LABEL_MAX => {
                let head: String = c.chars().take(CODEC_LABEL_MAX).collect();
                format!("{}…", head)
            }
            Some(c) => c.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_format(id: &str, height: Option<u32>, vcodec: &str, acodec: &str) -> FormatDescriptor {
        FormatDescriptor {
            format_id: id.to_string(),
            ext: "mp4".to_string(),
            vcodec: Some(vcodec.to_string()),
            acodec: Some(acodec.to_string()),
            height,
            fps: Some(30.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let mut second = make_format("137", Some(720), "vp9", "none");
        second.ext = "webm".to_string();
        let formats = vec![make_format("137", Some(1080), "avc1.640028", "none"), second];

        let catalog = FormatSelector::build_catalog(&formats);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].height, 1080);
        assert!(catalog[0].display_label.contains("| mp4 |"));
    }

    #[test]
    fn test_audio_only_and_empty_ids_are_skipped() {
        let formats = vec![
            make_format("140", None, "none", "mp4a.40.2"),
            make_format("", Some(720), "avc1", "mp4a.40.2"),
            make_format("  ", Some(720), "avc1", "mp4a.40.2"),
            make_format("22", Some(720), "avc1.64001F", "mp4a.40.2"),
        ];

        let catalog = FormatSelector::build_catalog(&formats);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].format_id, "22");
    }

    #[test]
    fn test_ranking_height_then_audio_then_fps() {
        let mut fast = make_format("299", Some(1080), "avc1", "none");
        fast.fps = Some(60.0);
        let formats = vec![
            make_format("136", Some(720), "avc1", "none"),
            make_format("137", Some(1080), "avc1", "none"),
            make_format("37", Some(1080), "avc1", "mp4a"),
            fast,
            make_format("18", Some(360), "avc1", "mp4a"),
        ];

        let ids: Vec<String> = FormatSelector::build_catalog(&formats)
            .into_iter()
            .map(|e| e.format_id)
            .collect();

        assert_eq!(ids, vec!["37", "299", "137", "136", "18"]);
    }

    #[test]
    fn test_ties_keep_listing_order() {
        let formats = vec![
            make_format("a", Some(480), "vp9", "none"),
            make_format("b", Some(480), "avc1", "none"),
            make_format("c", Some(480), "av01", "none"),
        ];

        let ids: Vec<String> = FormatSelector::build_catalog(&formats)
            .into_iter()
            .map(|e| e.format_id)
            .collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_full_label() {
        let format = FormatDescriptor {
            format_id: "137".to_string(),
            ext: "mp4".to_string(),
            vcodec: Some("avc1.640028".to_string()),
            acodec: Some("none".to_string()),
            height: Some(1080),
            fps: Some(29.97),
            tbr: Some(4400.6),
            filesize: None,
            filesize_approx: Some(220_200_960),
        };

        let catalog = FormatSelector::build_catalog(&[format]);

        assert_eq!(
            catalog[0].display_label,
            "137 | mp4 | 1080p/29fps | v:avc1.640028 a:none | ~4401kbps | ~210MB"
        );
        assert!(catalog[0].is_video_only);
    }

    #[test]
    fn test_label_omits_unknown_parts() {
        let format = FormatDescriptor {
            format_id: "hls-1".to_string(),
            ext: "mp4".to_string(),
            vcodec: Some("avc1".to_string()),
            ..Default::default()
        };

        let catalog = FormatSelector::build_catalog(&[format]);

        assert_eq!(catalog[0].display_label, "hls-1 | mp4 | ?p | v:avc1 a:?");
        assert!(!catalog[0].is_video_only);
    }

    #[test]
    fn test_exact_size_preferred_over_approx() {
        let mut format = make_format("22", Some(720), "avc1", "mp4a");
        format.filesize = Some(10 * 1_048_576);
        format.filesize_approx = Some(99 * 1_048_576);

        let catalog = FormatSelector::build_catalog(&[format]);

        assert!(catalog[0].display_label.ends_with("~10MB"));
    }

    #[test]
    fn test_long_codec_is_truncated() {
        let long = "avc1.64002a.extra.long.codec";
        let format = make_format("x", Some(720), long, "mp4a");

        let catalog = FormatSelector::build_catalog(&[format]);

        assert!(catalog[0].display_label.contains("v:avc1.64002a.extra.lo… a:mp4a"));
    }

    #[test]
    fn test_empty_listing_gives_empty_catalog() {
        assert!(FormatSelector::build_catalog(&[]).is_empty());
        let only_audio = vec![make_format("140", None, "none", "mp4a")];
        assert!(FormatSelector::build_catalog(&only_audio).is_empty());
    }

    #[test]
    fn test_find_by_id() {
        let catalog = FormatSelector::build_catalog(&[make_format("22", Some(720), "avc1", "mp4a")]);
        assert!(FormatSelector::find(&catalog, "22").is_some());
        assert!(FormatSelector::find(&catalog, "23").is_none());
    }
}
