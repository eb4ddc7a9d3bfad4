use nerfpose_3d::quality::{analyze, CameraRays};
use nerfpose_validation::{
    compare, diagnose, diagnostics::check_frame_count, QualityThresholds, ReportBuilder, Status,
};

#[test]
fn full_report() -> Result<(), Box<dyn std::error::Error>> {
    let positions = [[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let directions = [[0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]];
    let metrics = analyze(&positions, &directions)?;
    let thresholds = QualityThresholds::default();

    let diff = compare(["a", "b", "c"], ["a", "b"], ["a", "b"]);

    let mut builder = ReportBuilder::new();
    builder
        .extend("consistency", diff.findings())
        .extend("quality", diagnose(&metrics, &thresholds))
        .push("quality", check_frame_count(3, &thresholds))
        .metrics(metrics)
        .cameras(CameraRays {
            positions: positions.to_vec(),
            directions: directions.to_vec(),
            up_vectors: vec![[0.0, 1.0, 0.0]; 3],
        });
    let report = builder.build();

    assert_eq!(report.status(), Status::Warning);
    assert!(report.is_ok());
    assert!(report
        .section("quality")
        .iter()
        .any(|f| f.title == "Too few frames"));

    let tmp_dir = tempfile::tempdir()?;
    let path = tmp_dir.path().join("report.json");
    report.write_json(&path)?;

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(value["metrics"]["num_cameras"], 3);
    assert_eq!(value["cameras"]["positions"].as_array().map(Vec::len), Some(3));
    assert_eq!(
        value["sections"]["consistency"][1]["details"]["names"][0],
        "c"
    );
    Ok(())
}
