//! Behaviour-driven tests for release pipeline orchestration.
//!
//! Scenarios run the built-in pipelines against a temporary release checkout
//! with stubbed `dotnet` and `makensis` invocations. Tests use the rstest-bdd
//! v0.5.0 mutable world pattern.

use release_installer::error::{PipelineError, Result as PipelineResult};
use release_installer::interrupt::InterruptFlag;
use release_installer::pipeline::{Pipeline, PipelineKind, RunSummary};
use release_installer::test_utils::{ExpectedCall, ReleaseWorkspace, StubExecutor};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::fs;

// ---------------------------------------------------------------------------
// World types
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PipelineWorld {
    workspace: Option<ReleaseWorkspace>,
    expected_calls: Vec<ExpectedCall>,
    executor: Option<StubExecutor>,
    interrupt: InterruptFlag,
    result: Option<PipelineResult<RunSummary>>,
}

#[fixture]
fn world() -> PipelineWorld {
    PipelineWorld::default()
}

fn workspace(world: &PipelineWorld) -> &ReleaseWorkspace {
    world.workspace.as_ref().expect("workspace set")
}

fn run_error(world: &PipelineWorld) -> &PipelineError {
    match world.result.as_ref().expect("pipeline has run") {
        Ok(summary) => panic!("expected the run to fail, got {summary:?}"),
        Err(err) => err,
    }
}

fn pipeline_kind(name: &str) -> PipelineKind {
    match name {
        "all" => PipelineKind::All,
        "update" => PipelineKind::Update,
        "installer" => PipelineKind::Installer,
        other => panic!("unknown pipeline {other}"),
    }
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("a complete release checkout")]
fn given_complete_checkout(world: &mut PipelineWorld) {
    world.workspace = Some(ReleaseWorkspace::complete());
}

#[given("the build succeeds")]
fn given_build_succeeds(world: &mut PipelineWorld) {
    let calls = workspace(world).successful_build_calls();
    world.expected_calls.extend(calls);
}

#[given("the installer compiler succeeds")]
fn given_compiler_succeeds(world: &mut PipelineWorld) {
    let invocation = workspace(world).compiler_invocation();
    world.expected_calls.push(ExpectedCall::success(invocation));
}

#[given("the installer compiler fails with \"{message}\"")]
fn given_compiler_fails(world: &mut PipelineWorld, message: String) {
    let invocation = workspace(world).compiler_invocation();
    world
        .expected_calls
        .push(ExpectedCall::failure(invocation, &message));
}

#[given("the application has been published")]
fn given_published(world: &mut PipelineWorld) {
    workspace(world).with_published_output();
}

#[given("the staged icon is missing")]
fn given_staged_icon_missing(world: &mut PipelineWorld) {
    fs::remove_file(&workspace(world).config.icon_destination).expect("remove staged icon");
}

#[given("the installer compiler is not installed")]
fn given_compiler_missing(world: &mut PipelineWorld) {
    fs::remove_file(&workspace(world).config.compiler).expect("remove compiler");
}

#[given("the operator has interrupted the run")]
fn given_interrupted(world: &mut PipelineWorld) {
    world.interrupt.raise();
}

#[when("the \"{name}\" pipeline runs")]
fn when_pipeline_runs(world: &mut PipelineWorld, name: String) {
    let executor = StubExecutor::new(std::mem::take(&mut world.expected_calls));
    let pipeline = Pipeline::for_kind(pipeline_kind(&name));
    let mut progress = Vec::new();
    let result = pipeline.run(
        &workspace(world).config,
        &executor,
        &world.interrupt,
        &mut progress,
        false,
    );
    world.result = Some(result);
    world.executor = Some(executor);
}

#[then("the run succeeds")]
fn then_run_succeeds(world: &mut PipelineWorld) {
    match world.result.as_ref().expect("pipeline has run") {
        Ok(_) => {}
        Err(err) => panic!("expected success, got {err}"),
    }
    world.executor.as_ref().expect("executor set").assert_finished();
}

#[then("the installer is named \"{name}\"")]
fn then_installer_named(world: &mut PipelineWorld, name: String) {
    let summary = match world.result.as_ref().expect("pipeline has run") {
        Ok(summary) => summary,
        Err(err) => panic!("expected success, got {err}"),
    };
    assert_eq!(summary.artifact.as_deref(), Some(name.as_str()));
}

#[then("the transient script is absent")]
fn then_script_absent(world: &mut PipelineWorld) {
    assert!(!workspace(world).config.transient_script.exists());
}

#[then("the run fails in stage \"{stage}\"")]
fn then_run_fails_in_stage(world: &mut PipelineWorld, stage: String) {
    let err = run_error(world);
    assert!(
        matches!(err, PipelineError::StageFailed { .. }),
        "expected StageFailed, got {err:?}"
    );
    assert_eq!(err.stage(), Some(stage.as_str()));
}

#[then("the error names the staged icon")]
fn then_error_names_icon(world: &mut PipelineWorld) {
    let icon = workspace(world).config.icon_destination.clone();
    match run_error(world).root_cause() {
        PipelineError::MissingArtifact { path, .. } => assert_eq!(*path, icon),
        other => panic!("expected MissingArtifact, got {other:?}"),
    }
}

#[then("the error mentions \"{text}\"")]
fn then_error_mentions(world: &mut PipelineWorld, text: String) {
    let message = run_error(world).to_string();
    assert!(message.contains(&text), "{message:?} should mention {text:?}");
}

#[then("the installer compiler was never invoked")]
fn then_compiler_not_invoked(world: &mut PipelineWorld) {
    let compiler = workspace(world).config.compiler.to_string();
    let calls = world.executor.as_ref().expect("executor set").calls();
    assert!(calls.iter().all(|call| call.program != compiler));
}

#[then("the staged icon exists")]
fn then_staged_icon_exists(world: &mut PipelineWorld) {
    assert!(workspace(world).config.icon_destination.is_file());
}

#[then("the run is reported as interrupted")]
fn then_run_interrupted(world: &mut PipelineWorld) {
    assert!(matches!(
        run_error(world),
        PipelineError::Interrupted { .. }
    ));
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/pipeline.feature",
    name = "Build-all produces the named installer"
)]
fn scenario_build_all(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline.feature",
    name = "A missing staged icon stops the installer pipeline"
)]
fn scenario_missing_icon(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline.feature",
    name = "A compiler failure still removes the patched script"
)]
fn scenario_compiler_failure(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline.feature",
    name = "Update refreshes the publish output without packaging"
)]
fn scenario_update(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline.feature",
    name = "A missing installer compiler is reported before any script is written"
)]
fn scenario_missing_compiler(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline.feature",
    name = "An interrupted run reports the interruption"
)]
fn scenario_interrupted(world: PipelineWorld) {
    let _ = world;
}
