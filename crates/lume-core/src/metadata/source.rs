/// Source label for files no rule recognises.
pub const FALLBACK_SOURCE: &str = "Other_Imports";

/// Filename patterns (lowercase) and the origin they indicate.
/// Checked in order; the first matching rule wins.
const SOURCE_RULES: &[(&str, &str)] = &[
    ("whatsapp", "WhatsApp"),
    ("-wa", "WhatsApp"),
    ("telegram", "Telegram"),
    ("screenshot", "Screenshots"),
    ("ekran", "Screenshots"), // TR
    ("instagram", "Instagram"),
    ("ig_", "Instagram"),
    ("twitter", "Twitter"),
    ("facebook", "Facebook"),
    ("snapchat", "Snapchat"),
    ("camera", "Camera"),
    ("dcim", "Camera"),
    ("pxl_", "Camera"),
    ("img_", "Camera"),
    ("vid_", "Camera"),
];

/// Classify where a file came from by its name.
pub fn detect_source(filename: &str) -> &'static str {
    let lower = filename.trim().to_lowercase();
    SOURCE_RULES
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map_or(FALLBACK_SOURCE, |(_, label)| *label)
}

/// Whether a label is one of the known classifications.
pub fn is_known_source(label: &str) -> bool {
    label != FALLBACK_SOURCE && SOURCE_RULES.iter().any(|(_, l)| *l == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_source() {
        assert_eq!(detect_source("IMG_0001.jpg"), "Camera");
        assert_eq!(detect_source("PXL_20230101_120000.jpg"), "Camera");
        assert_eq!(detect_source("VID_20200101.mp4"), "Camera");
        assert_eq!(detect_source("WhatsApp Image 2023-01-01.jpeg"), "WhatsApp");
        assert_eq!(detect_source("IMG-20230101-WA0001.jpg"), "WhatsApp");
        assert_eq!(detect_source("Screenshot_2023.png"), "Screenshots");
        assert_eq!(detect_source("Ekran görüntüsü 2023.png"), "Screenshots");
        assert_eq!(detect_source("ig_story.mp4"), "Instagram");
        assert_eq!(detect_source("holiday.jpg"), FALLBACK_SOURCE);
    }

    #[test]
    fn test_first_rule_wins() {
        assert_eq!(detect_source("Screenshot_WhatsApp.png"), "WhatsApp");
        assert_eq!(detect_source("telegram_camera.jpg"), "Telegram");
        assert_eq!(detect_source("instagram_IMG_1.jpg"), "Instagram");
    }

    #[test]
    fn test_is_known_source() {
        assert!(is_known_source("Camera"));
        assert!(!is_known_source(FALLBACK_SOURCE));
        assert!(!is_known_source("Pixel 6"));
    }
}
