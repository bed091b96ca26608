// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::output::OutputFormat;
use strata_adapters::FsArtifactStore;
use strata_core::resource::LayerSpec;
use strata_core::{Config, ObjectMeta, SystemClock};
use strata_storage::{FsStore, ResourceStore};
use tempfile::TempDir;

fn context(dir: &TempDir) -> Context {
    Context {
        store: FsStore::open(dir.path().join("store")).unwrap(),
        artifacts: FsArtifactStore::new(dir.path().join("artifacts")),
        config: Config::default(),
        namespace: "infra".to_string(),
        format: OutputFormat::Text,
        clock: SystemClock,
    }
}

async fn seed(ctx: &Context, action: Action, retries: u32) -> Run {
    let layer = Layer::new(
        ObjectMeta::new("infra", "network"),
        LayerSpec {
            repository: "platform".to_string(),
            path: "network".to_string(),
            branch: "main".to_string(),
            terraform: Default::default(),
            opentofu: Default::default(),
            remediation_strategy: Default::default(),
            runner: Default::default(),
            keep_last_runs: None,
        },
    );
    let mut layer = ctx.store.create(layer).await.unwrap();
    layer.annotations.last_relevant_commit = Some("abc".to_string());
    let name = Run::name_for("network", action, "1");
    let mut run = Run::for_layer(&layer, name, action, ctx.clock.now());
    run.status.retries = retries;
    ctx.store.create(run).await.unwrap()
}

#[tokio::test]
async fn plan_report_updates_layer_and_stores_summary() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let run = seed(&ctx, Action::Plan, 2).await;

    handle(
        ReportCommand::Plan {
            run: run.metadata.name.clone(),
            checksum: "sum1".to_string(),
            summary: Some("Plan: 1 to add".to_string()),
            summary_file: None,
            artifacts: vec![],
        },
        &ctx,
    )
    .await
    .unwrap();

    let layer: Layer = ctx.get("layer", "network").await.unwrap();
    assert_eq!(layer.annotations.last_plan_commit.as_deref(), Some("abc"));
    assert_eq!(layer.annotations.last_plan_checksum.as_deref(), Some("sum1"));
    assert!(layer.annotations.last_plan_date.is_some());

    let plan = PlanRef::new("infra", "network", &run.metadata.name, 2);
    let summary = ctx.artifacts.get_plan(&plan, PlanFormat::Short).await.unwrap();
    assert_eq!(summary, "Plan: 1 to add");
}

#[tokio::test]
async fn plan_report_stores_extra_artifacts() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let run = seed(&ctx, Action::Plan, 0).await;
    let log = dir.path().join("plan.log");
    std::fs::write(&log, "full plan output").unwrap();

    handle(
        ReportCommand::Plan {
            run: run.metadata.name.clone(),
            checksum: "sum1".to_string(),
            summary: None,
            summary_file: None,
            artifacts: vec![(PlanFormat::Text, log)],
        },
        &ctx,
    )
    .await
    .unwrap();

    let plan = PlanRef::new("infra", "network", &run.metadata.name, 0);
    let text = ctx.artifacts.get_plan(&plan, PlanFormat::Text).await.unwrap();
    assert_eq!(text, "full plan output");
}

#[tokio::test]
async fn apply_report_records_checksum() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let run = seed(&ctx, Action::Apply, 0).await;

    handle(
        ReportCommand::Apply {
            run: run.metadata.name.clone(),
            checksum: "sum1".to_string(),
        },
        &ctx,
    )
    .await
    .unwrap();

    let layer: Layer = ctx.get("layer", "network").await.unwrap();
    assert_eq!(layer.annotations.last_apply_checksum.as_deref(), Some("sum1"));
}

#[tokio::test]
async fn apply_report_rejects_plan_run() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let run = seed(&ctx, Action::Plan, 0).await;

    let err = handle(
        ReportCommand::Apply {
            run: run.metadata.name.clone(),
            checksum: "sum1".to_string(),
        },
        &ctx,
    )
    .await
    .unwrap_err();

    let err = err.downcast::<CliError>().unwrap();
    assert!(err.message.contains("cannot report apply"));
    let layer: Layer = ctx.get("layer", "network").await.unwrap();
    assert_eq!(layer.annotations.last_apply_checksum, None);
}

#[tokio::test]
async fn report_for_missing_run_is_not_found() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let err = handle(
        ReportCommand::Apply {
            run: "ghost".to_string(),
            checksum: "sum1".to_string(),
        },
        &ctx,
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("run 'infra/ghost' not found"));
}

#[test]
fn artifact_argument_parses_format_and_path() {
    let (format, path) = parse_artifact("json=/tmp/plan.json").unwrap();
    assert_eq!(format, PlanFormat::Json);
    assert_eq!(path, PathBuf::from("/tmp/plan.json"));

    assert!(parse_artifact("plan.json").is_err());
    assert!(parse_artifact("yaml=plan.yaml").is_err());
}
