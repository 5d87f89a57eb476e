use std::fs;

use clap::Parser;
use proctorwatch::cli::Cli;

fn recording() -> String {
    let mut lines = Vec::new();
    // 0-2s: one face, then the face detector stalls (focus event at 7s),
    // 8s: two faces, 9-21s: empty chair
    for s in 0..=2 {
        lines.push(format!(
            r#"{{"type":"faces","count":1,"observedAt":"2024-05-01T10:00:{s:02}Z"}}"#
        ));
    }
    lines.push(r#"{"type":"faces","count":2,"observedAt":"2024-05-01T10:00:08Z"}"#.to_string());
    for s in 9..=21 {
        lines.push(format!(
            r#"{{"type":"faces","count":0,"observedAt":"2024-05-01T10:00:{s:02}Z"}}"#
        ));
    }
    for s in (0..=20).step_by(2) {
        let detections = if s == 4 || s == 6 {
            r#"[{"label":"cell phone","confidence":0.82},{"label":"person","confidence":0.97}]"#
        } else {
            r#"[{"label":"person","confidence":0.97}]"#
        };
        lines.push(format!(
            r#"{{"type":"objects","detections":{detections},"observedAt":"2024-05-01T10:00:{s:02}Z"}}"#
        ));
    }
    lines.push(r#"{"type":"faces","count":-4,"observedAt":"2024-05-01T10:00:22Z"}"#.to_string());
    lines.push("{ truncated".to_string());
    lines.join("\n")
}

#[tokio::test]
async fn replay_writes_the_csv_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("session.jsonl");
    let output = dir.path().join("report.csv");
    fs::write(&input, recording()).unwrap();

    let cli = Cli::try_parse_from([
        "proctorwatch",
        "replay",
        input.to_str().unwrap(),
        "--subject",
        "Jane Doe",
        "--session-id",
        "session001",
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();
    proctorwatch::run(cli).await.unwrap();

    // 1 focus (2) + 1 crowd (5) + 1 absence (5) + 2 phones (10) = 22
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Candidate Name,Jane Doe\n\
         Interview Duration,0m 21s\n\
         Focus Lost Count,1\n\
         Multiple Faces Count,1\n\
         No Face Count,1\n\
         Suspicious Items Count,2\n\
         Final Integrity Score,78"
    );
}

#[tokio::test]
async fn replay_honours_custom_weights_and_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("session.jsonl");
    let config = dir.path().join("settings.json");
    let output = dir.path().join("report.json");
    fs::write(&input, recording()).unwrap();
    fs::write(
        &config,
        r#"{"scoring":{"prohibitedItem":20},"items":{"disallowedLabels":["cell phone"]}}"#,
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "proctorwatch",
        "--config",
        config.to_str().unwrap(),
        "replay",
        input.to_str().unwrap(),
        "--format",
        "json",
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();
    proctorwatch::run(cli).await.unwrap();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["subjectLabel"], "Candidate");
    assert_eq!(report["durationSeconds"], 21);
    assert_eq!(report["eventCounts"]["prohibitedItem"], 2);
    assert_eq!(report["finalScore"], 100 - 2 - 5 - 5 - 40);
}

#[tokio::test]
async fn init_config_writes_loadable_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let cli = Cli::try_parse_from(["proctorwatch", "init-config", path.to_str().unwrap()]).unwrap();
    proctorwatch::run(cli).await.unwrap();

    let loaded = proctorwatch::settings::MonitorSettings::load(&path).unwrap();
    assert_eq!(loaded, proctorwatch::settings::MonitorSettings::default());
}
