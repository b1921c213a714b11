use image::{DynamicImage, GenericImageView};
use img_compressor::batch::CandidateFile;
use img_compressor::compressor::resize_image;
use img_compressor::notify::CollectingNotifier;
use img_compressor::{size_reduction_percent, Batch, CompressionOptions, CompressionProfile};
use proptest::prelude::*;

const DECLARED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/svg+xml",
    "image/webp",
    "image/jpg",
    "image/bmp",
    "text/plain",
    "application/pdf",
];

proptest! {
    #[test]
    fn compression_options_quality_in_range(quality in 1u8..=100u8) {
        let options = CompressionOptions::new(Some(quality), None, None, None);
        assert!(options.is_ok());
    }

    #[test]
    fn compression_options_invalid_quality(quality in 0u8..=255u8) {
        let result = CompressionOptions::new(Some(quality), None, None, None);
        if quality == 0 || quality > 100 {
            assert!(result.is_err());
        } else {
            assert!(result.is_ok());
        }
    }

    #[test]
    fn size_reduction_never_exceeds_100(
        original in 1u64..=50_000_000u64,
        compressed in 0u64..=50_000_000u64
    ) {
        let percent = size_reduction_percent(original, compressed);
        assert!(percent <= 100);
        if compressed <= original {
            assert!(percent >= 0);
        } else {
            assert!(percent <= 0);
        }
    }

    #[test]
    fn size_reduction_matches_byte_ratio(
        original in 1u64..=10_000_000u64,
        compressed in 0u64..=10_000_000u64
    ) {
        // KiB scaling cancels out of the ratio.
        let ratio = (original as f64 - compressed as f64) / original as f64;
        let expected = (ratio * 100.0 + 0.5).floor() as i64;
        assert_eq!(size_reduction_percent(original, compressed), expected);
    }

    #[test]
    fn size_reduction_rounds_only_once(kib_tenths in 11u64..=14u64, compressed_tenths in 5u64..=9u64) {
        // Below 1.5 KiB and at least 0.5 KiB both sides round to 1 KiB,
        // which would report 0% if rounding happened before the ratio.
        let original = kib_tenths * 1024 / 10;
        let compressed = compressed_tenths * 1024 / 10;
        prop_assume!(compressed < original);
        assert!(size_reduction_percent(original, compressed) > 0);
    }

    #[test]
    fn upload_accepts_exactly_the_allow_list(
        picks in prop::collection::vec(0usize..DECLARED_TYPES.len(), 0..20),
        size_budget in any::<bool>()
    ) {
        let profile = if size_budget {
            CompressionProfile::SizeBudget
        } else {
            CompressionProfile::Quality
        };
        let candidates: Vec<CandidateFile> = picks
            .iter()
            .enumerate()
            .map(|(i, &p)| CandidateFile::new(format!("file{}", i), Some(DECLARED_TYPES[p]), vec![0u8; 4]))
            .collect();
        let expected_accepted: Vec<String> = picks
            .iter()
            .enumerate()
            .filter(|(_, &p)| profile.allowed_mime_types().contains(&DECLARED_TYPES[p]))
            .map(|(i, _)| format!("file{}", i))
            .collect();

        let notifier = CollectingNotifier::new();
        let mut batch = Batch::new();
        let report = batch.add_files(candidates, profile, &notifier);

        let names: Vec<String> = batch.items().iter().map(|item| item.name.clone()).collect();
        assert_eq!(names, expected_accepted);
        assert_eq!(report.rejected.len(), picks.len() - expected_accepted.len());
        assert_eq!(notifier.errors().len(), report.rejected.len());
        assert!(!batch.is_complete());
    }
}

// Resizing real buffers is slow in debug builds.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn quality_profile_never_upscales_or_exceeds_width(
        width in 1u32..=1200u32,
        height in 1u32..=1200u32
    ) {
        let img = DynamicImage::new_rgb8(width, height);
        let options = CompressionProfile::Quality.options();
        let (w, h) = resize_image(img, &options).dimensions();

        assert!(w <= 800);
        assert!(w <= width);
        assert!(h <= height);
        if width <= 800 {
            assert_eq!((w, h), (width, height));
        }
    }

    #[test]
    fn size_budget_profile_caps_longest_side(
        width in 1u32..=1200u32,
        height in 1u32..=1200u32
    ) {
        let img = DynamicImage::new_rgb8(width, height);
        let options = CompressionProfile::SizeBudget.options();
        let (w, h) = resize_image(img, &options).dimensions();

        assert!(w.max(h) <= 800);
        assert!(w <= width && h <= height);
    }
}
