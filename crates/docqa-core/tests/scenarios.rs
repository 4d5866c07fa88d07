//! End-to-end analysis scenarios on synthetic captures.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use docqa_core::{
    Analyzer, BatchOptions, BatchProcessor, Category, ComplianceLevel, ConfigurationProfile,
    FailureKind, FailureStage, Status,
};
use docqa_test_support::{
    MockImageSource, MockProgressSink, MockResultOutput, SyntheticDocumentBuilder,
};

fn analyzer() -> Analyzer {
    Analyzer::new(ConfigurationProfile::default()).expect("default profile is valid")
}

#[test]
fn test_good_document_passes_everything() {
    let image = SyntheticDocumentBuilder::good().name("good.png").build();
    let result = analyzer().analyze(&image);

    for metric in result.metrics.values() {
        assert_eq!(metric.status, Status::Pass, "{metric:?}");
    }
    assert_eq!(result.metrics.len(), 12);
    assert_eq!(result.global.status, Status::Pass);
    assert_eq!(result.global.stars, 4);
    assert!(result.global.score >= 0.9);
    assert_eq!(
        result.sla.compliance.map(|c| c.level),
        Some(ComplianceLevel::Excellent)
    );
    assert!(result.metadata.document_bbox.is_some());
}

#[test]
fn test_uniform_gray_finds_no_document() {
    let image = SyntheticDocumentBuilder::uniform_gray(400, 300, 128);
    let result = analyzer().analyze(&image);

    assert!(result.metadata.document_bbox.is_none());
    assert_eq!(result.global.status, Status::Fail);
    let completeness = &result.metrics[&Category::Completeness];
    assert_eq!(completeness.status, Status::Fail);
    assert!(completeness.beyond_fail_threshold);
    assert!(completeness.diagnostic.is_some());
    assert!((0.0..=1.0).contains(&result.global.score));
    assert_eq!(result.global.stars, 1);
}

#[test]
fn test_five_degree_skew_forces_global_fail() {
    let image = SyntheticDocumentBuilder::new(800, 1000)
        .margin(50)
        .skew(5.0)
        .name("skewed.png")
        .build();
    let result = analyzer().analyze(&image);

    let geometry = &result.metrics[&Category::Geometry];
    let skew = geometry.primary_value().expect("skew measured");
    assert!((4.0..=6.0).contains(&skew), "skew = {skew}");
    assert_eq!(geometry.status, Status::Fail);
    assert!(geometry.beyond_fail_threshold);

    for metric in result.metrics.values() {
        if metric.category != Category::Geometry {
            assert_eq!(metric.status, Status::Pass, "{metric:?}");
        }
    }
    assert_eq!(result.global.status, Status::Fail);
    assert_ne!(result.global.score_status, Status::Fail);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.starts_with("Required:")));
}

#[test]
fn test_finger_entering_from_edge_fails_foreign_objects() {
    let image = SyntheticDocumentBuilder::new(600, 500)
        .occluder(0, 200, 160, 70)
        .name("finger.png")
        .build();
    let result = analyzer().analyze(&image);

    let foreign = &result.metrics[&Category::ForeignObjects];
    assert_eq!(foreign.status, Status::Fail, "{foreign:?}");
    assert!(foreign.measurement("dark_object_count").unwrap_or(0.0) >= 1.0);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r == &format!("Required: {}", Category::ForeignObjects.action())));
}

#[test]
fn test_small_document_trips_completeness_override() {
    let image = SyntheticDocumentBuilder::new(800, 1000).margin(220).build();
    let result = analyzer().analyze(&image);

    let completeness = &result.metrics[&Category::Completeness];
    assert_eq!(completeness.status, Status::Fail);
    assert!(completeness.beyond_fail_threshold);
    assert_eq!(result.global.status, Status::Fail);
}

#[test]
fn test_blur_lowers_sharpness_monotonically() {
    let analyzer = analyzer();
    let sharpness = |sigma: f32| {
        let image = SyntheticDocumentBuilder::new(480, 400).blur(sigma).build();
        analyzer.analyze(&image).metrics[&Category::Sharpness]
            .primary_value()
            .expect("measured")
    };

    let values: Vec<f64> = [0.0, 1.0, 2.0, 4.0].into_iter().map(sharpness).collect();
    for pair in values.windows(2) {
        assert!(pair[1] < pair[0], "{values:?}");
    }
}

#[test]
fn test_scores_and_stars_stay_in_range() {
    let analyzer = analyzer();
    let captures = [
        SyntheticDocumentBuilder::good().build(),
        SyntheticDocumentBuilder::new(400, 300).noise(40).build(),
        SyntheticDocumentBuilder::new(400, 300).blur(3.0).build(),
        SyntheticDocumentBuilder::new(400, 300).occluder(120, 100, 60, 60).build(),
        SyntheticDocumentBuilder::new(400, 300).dpi(None).format(None).build(),
        SyntheticDocumentBuilder::uniform_gray(64, 64, 0),
    ];

    for image in &captures {
        let result = analyzer.analyze(image);
        assert!((0.0..=1.0).contains(&result.global.score));
        assert!((1..=4).contains(&result.global.stars));
        for metric in result.metrics.values() {
            assert!((0.0..=1.0).contains(&metric.score));
        }
    }
}

#[test]
fn test_result_json_shape() {
    let result = analyzer().analyze(&SyntheticDocumentBuilder::new(300, 240).build());
    let json = serde_json::to_value(&result).unwrap();

    for key in ["metadata", "global", "metrics", "recommendations", "sla"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert!(json["metrics"].get("border_background").is_some());
    assert!(json["global"]["status"].is_string());
}

#[test]
fn test_batch_with_one_corrupt_image() {
    let source = MockImageSource::new(vec![
        SyntheticDocumentBuilder::new(320, 240).name("a.png").build(),
        SyntheticDocumentBuilder::new(320, 240).name("b.png").build(),
    ])
    .with_corrupt("c.jpg");
    let progress = MockProgressSink::new();

    let report = BatchProcessor::new(analyzer(), BatchOptions::default()).run(&source, &progress);

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!((report.success_rate - 66.7).abs() < f64::EPSILON);

    let failure = &report.failures[0];
    assert_eq!(failure.filename, "c.jpg");
    assert_eq!(failure.stage, FailureStage::Load);
    assert_eq!(failure.error_type, FailureKind::Decode);

    assert_eq!(progress.finished_counts(), Some((2, 1)));
    assert_eq!(progress.started_count(), 2);
    assert_eq!(progress.completed_count(), 2);
    assert_eq!(progress.failures().len(), 1);
    assert_eq!(source.iteration_count(), 1);
    assert!(report.sla_summary.is_some());
}

#[test]
fn test_empty_source_still_finishes() {
    let progress = MockProgressSink::new();
    let report = BatchProcessor::new(analyzer(), BatchOptions::default())
        .run(&MockImageSource::empty(), &progress);

    assert!(report.results.is_empty());
    assert!(report.failures.is_empty());
    assert!(report.success_rate.abs() < f64::EPSILON);
    assert!(progress.has_finished());
    assert_eq!(progress.events().len(), 1);
}

#[test]
fn test_memory_bound_batch_keeps_source_order() {
    let source = MockImageSource::empty()
        .with_image(SyntheticDocumentBuilder::new(240, 200).name("a.png").build())
        .with_image(SyntheticDocumentBuilder::new(240, 200).name("b.png").build())
        .with_image(SyntheticDocumentBuilder::new(240, 200).name("c.png").build())
        .with_largest_image_bytes(1_000_000);
    let options = BatchOptions {
        max_workers: 4,
        memory_budget_bytes: Some(1_500_000),
        ..BatchOptions::default()
    };
    let progress = MockProgressSink::new();

    let report = BatchProcessor::new(analyzer(), options).run(&source, &progress);
    let output = MockResultOutput::new();
    report.write_to(&output).expect("mock output never fails");

    let written: Vec<String> = output
        .results()
        .into_iter()
        .map(|r| r.metadata.source_id)
        .collect();
    assert_eq!(written, ["a.png", "b.png", "c.png"]);
    assert_eq!(output.flush_count(), 1);
    assert_eq!(progress.started_count(), 3);
}
