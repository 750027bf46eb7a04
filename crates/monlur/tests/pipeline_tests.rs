//! End-to-end tests for the obfuscation job pipeline.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use common::TestHarness;
use monlur::pipeline::NoopProgress;
use monlur::{
    EngineOutput, EngineRequest, ErrorKind, Job, JobError, JobStatus, ObfuscateRequest, Preset,
    ProvenanceHeader, TransformEngine,
};

const HEADER: &str = "-- This file was protected using Mønlur Obfuscator [v1.0]\n\n";

const SAMPLE: &str = r#"local greeting = "Hello, World!"
local count = 3
for i = 1, count do
  print(greeting, i)
end
"#;

/// A single preset run through the built-in engine.
struct PresetCase {
    preset: Option<&'static str>,
    renames: bool,
    junk: bool,
}

const PRESET_CASES: &[PresetCase] = &[
    PresetCase {
        preset: Some("Weak"),
        renames: false,
        junk: false,
    },
    PresetCase {
        preset: Some("Medium"),
        renames: true,
        junk: false,
    },
    PresetCase {
        preset: Some("Strong"),
        renames: true,
        junk: true,
    },
    PresetCase {
        preset: Some("Minify"),
        renames: true,
        junk: false,
    },
    PresetCase {
        preset: Some("strong"),
        renames: true,
        junk: true,
    },
    PresetCase {
        preset: Some("unknown"),
        renames: true,
        junk: false,
    },
    PresetCase {
        preset: None,
        renames: true,
        junk: false,
    },
];

#[tokio::test]
async fn test_builtin_presets() {
    for case in PRESET_CASES {
        let harness = TestHarness::new();
        let pipeline = harness.builtin_pipeline();

        let result = pipeline
            .run(SAMPLE, case.preset)
            .await
            .unwrap_or_else(|e| panic!("{:?} failed: {}", case.preset, e));

        assert!(result.code.starts_with(HEADER), "{:?}", case.preset);
        assert_eq!(result.code.matches(HEADER).count(), 1, "{:?}", case.preset);
        assert!(!result.code.contains("\"Hello, World!\""), "{:?}", case.preset);
        assert_eq!(
            result.code.contains("local greeting"),
            !case.renames,
            "{:?}",
            case.preset
        );
        assert_eq!(
            result.code[HEADER.len()..].starts_with("local _"),
            case.junk || case.renames,
            "{:?}",
            case.preset
        );
        assert_eq!(
            result.code.contains("=function()return nil end;"),
            case.junk,
            "{:?}",
            case.preset
        );
        assert_eq!(result.original_size, SAMPLE.len());
        assert_eq!(result.obfuscated_size, result.code.len());
        harness.assert_no_artifacts();
    }
}

#[tokio::test]
async fn test_empty_input_is_rejected_without_storage() {
    for source in ["", "   ", "\n\t\r\n"] {
        let harness = TestHarness::new();
        let pipeline = harness.builtin_pipeline();

        let err = pipeline.run(source, Some("Strong")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInput);
        assert!(!harness.workspace_root.exists());
    }
}

#[tokio::test]
async fn test_custom_header_is_used() {
    let harness = TestHarness::new();
    let config = harness.config().header("Acme Shield", "v9").build();
    let pipeline = harness.pipeline(&config);

    let result = pipeline.run("print(1)", None).await.unwrap();
    assert!(result
        .code
        .starts_with("-- This file was protected using Acme Shield [v9]\n\n"));
}

#[tokio::test]
async fn test_concurrent_jobs_are_isolated() {
    let harness = TestHarness::new();
    let pipeline = Arc::new(harness.builtin_pipeline());

    let mut tasks = Vec::new();
    for n in 0..16 {
        let pipeline = Arc::clone(&pipeline);
        tasks.push(tokio::spawn(async move {
            let source = format!("local value = {}\nprint(value)\n", n);
            let result = pipeline.run(&source, Some("Weak")).await.unwrap();
            (n, result)
        }));
    }

    for task in tasks {
        let (n, result) = task.await.unwrap();
        assert!(result.code.ends_with(&format!("local value = {}\nprint(value)\n", n)));
    }
    harness.assert_no_artifacts();
}

#[tokio::test]
async fn test_respond_shapes() {
    let harness = TestHarness::new();
    let pipeline = harness.builtin_pipeline();

    let ok = pipeline
        .respond(ObfuscateRequest::new("print('hello there')", Some("weak")))
        .await;
    let json = serde_json::to_value(&ok).unwrap();
    assert_eq!(json["success"], true);
    assert!(json["code"].as_str().unwrap().starts_with(HEADER));
    assert!(json["processingTimeMs"].is_u64());
    assert_eq!(json["originalSize"], 20);

    let err = pipeline.respond(ObfuscateRequest::new(" ", None)).await;
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["kind"], "EmptyInput");
}

struct BrokenEngine;

#[async_trait]
impl TransformEngine for BrokenEngine {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn invoke(&self, request: EngineRequest<'_>) -> Result<EngineOutput, JobError> {
        // Leave a partial output behind to prove release cleans it up.
        request
            .manager
            .write(request.workspace, monlur::workspace::ArtifactRole::Output, "partial")?;
        Err(JobError::EngineExecutionFailed {
            status: "exit status: 2".to_string(),
            diagnostics: "unexpected symbol near 'end'".to_string(),
        })
    }
}

#[tokio::test]
async fn test_engine_failure_is_recorded_and_cleaned_up() {
    let harness = TestHarness::new();
    let pipeline = harness.pipeline_with_engine(Arc::new(BrokenEngine));

    let job = pipeline
        .execute(Job::new("print(1)", Preset::Strong), &NoopProgress)
        .await;

    assert_eq!(job.status(), JobStatus::Failed);
    let failure = job.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::EngineExecutionFailed);
    assert!(failure.message.contains("unexpected symbol"));
    assert!(job.result().is_none());
    harness.assert_no_artifacts();
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_engine_round_trip() {
    let harness = TestHarness::new();
    let config = harness
        .config()
        .shell_engine("tr 'a-z' 'A-Z' < \"{input}\" > \"{output}\"")
        .build();
    let pipeline = harness.pipeline(&config);

    let result = pipeline.run("print('abc')", Some("Weak")).await.unwrap();
    assert_eq!(result.code, format!("{}PRINT('ABC')", HEADER));
    harness.assert_no_artifacts();
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_output_already_stamped_is_not_stamped_again() {
    let harness = TestHarness::new();
    let header = ProvenanceHeader::default().render();
    let script = format!(
        "printf '%s\\n\\n' '{}' > \"{{output}}\"\ncat \"{{input}}\" >> \"{{output}}\"",
        header.trim_end()
    );
    let config = harness.config().shell_engine(&script).build();
    let pipeline = harness.pipeline(&config);

    let result = pipeline.run("print(1)", None).await.unwrap();
    assert_eq!(result.code.matches("-- This file was protected").count(), 1);
    assert!(result.code.ends_with("print(1)"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_unsupported_preset_falls_back_to_medium() {
    let harness = TestHarness::new();
    let config = harness
        .config()
        .shell_engine("printf '%s' '{preset}' > \"{output}\"")
        .supported_presets(&[Preset::Weak, Preset::Medium])
        .build();
    let pipeline = harness.pipeline(&config);

    let result = pipeline.run("print(1)", Some("Strong")).await.unwrap();
    assert_eq!(result.code, format!("{}Medium", HEADER));
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_failure_kinds() {
    struct FailureCase {
        name: &'static str,
        script: &'static str,
        kind: ErrorKind,
    }

    let cases = [
        FailureCase {
            name: "nonzero_exit",
            script: "echo 'lua: input:1: syntax error' >&2\nexit 1",
            kind: ErrorKind::EngineExecutionFailed,
        },
        FailureCase {
            name: "silent_success",
            script: "exit 0",
            kind: ErrorKind::ArtifactMissing,
        },
    ];

    for case in &cases {
        let harness = TestHarness::new();
        let config = harness.config().shell_engine(case.script).build();
        let pipeline = harness.pipeline(&config);

        let err = pipeline.run("print(1)", None).await.unwrap_err();
        assert_eq!(err.kind(), case.kind, "case {}", case.name);
        harness.assert_no_artifacts();
    }
}

#[tokio::test]
async fn test_missing_engine_program_is_unavailable() {
    let harness = TestHarness::new();
    let mut config = harness.config().shell_engine("true").build();
    config.engine.external.program = "/no/such/monlur-engine".to_string();
    let pipeline = harness.pipeline(&config);

    let err = pipeline.run("print(1)", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineUnavailable);
    harness.assert_no_artifacts();
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_deadline_is_enforced() {
    let harness = TestHarness::new();
    let config = harness
        .config()
        .deadline_secs(1)
        .shell_engine("exec sleep 30")
        .build();
    let pipeline = harness.pipeline(&config);

    let started = Instant::now();
    let err = pipeline.run("print(1)", None).await.unwrap_err();

    assert!(matches!(err, JobError::EngineTimeout(d) if d == Duration::from_secs(1)));
    assert!(started.elapsed() < Duration::from_secs(5));
    harness.assert_no_artifacts();
}
