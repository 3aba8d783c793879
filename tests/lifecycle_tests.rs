//! Tests for lifecycle operations through the public API.
//!
//! Tests cover: identifier validation as a hard boundary, stop-all batch
//! semantics, exit-code reduction and the argument vectors sent to the
//! runtime.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use dockdash::docker::{DockerCli, LifecycleError, Operation, is_valid_identifier};
use dockdash::test_utils::FakeExecutor;

fn cli_with(fake: FakeExecutor) -> (Arc<FakeExecutor>, DockerCli) {
    let fake = Arc::new(fake);
    (Arc::clone(&fake), DockerCli::new(fake, "/usr/bin/docker"))
}

// ============================================================================
// Validation boundary
// ============================================================================

#[test]
fn test_hostile_identifiers_never_reach_runtime() {
    let (fake, cli) = cli_with(FakeExecutor::new().respond(&[], "", 0));

    let hostile = [
        "",
        "web; rm -rf /",
        "$(shutdown)",
        "`id`",
        "a'b",
        "a\"b",
        "a b",
        "a|b",
        "a&&b",
    ];

    for token in hostile {
        assert!(!is_valid_identifier(token));
        for op in [
            Operation::Stop(token.to_string()),
            Operation::RemoveContainer(token.to_string()),
            Operation::RemoveImage(token.to_string()),
            Operation::RemoveVolume(token.to_string()),
        ] {
            assert_eq!(
                cli.perform(&op),
                Err(LifecycleError::InvalidIdentifier(token.to_string())),
                "{} accepted {:?}",
                op.label(),
                token
            );
        }
    }

    assert_eq!(fake.call_count(), 0);
}

#[test]
fn test_overlong_identifier_rejected() {
    let (fake, cli) = cli_with(FakeExecutor::new().respond(&[], "", 0));

    let long = "a".repeat(257);
    assert!(cli.stop_container(&long).is_err());
    assert!(cli.stop_container(&"a".repeat(256)).is_ok());
    assert_eq!(fake.call_count(), 1);
}

#[test]
fn test_dash_prefixed_identifier_is_not_an_option() {
    let (fake, cli) = cli_with(FakeExecutor::new().respond(&[], "", 0));

    assert!(is_valid_identifier("--help"));
    assert!(cli.perform(&Operation::RemoveContainer("--help".to_string())).is_ok());

    let call = &fake.calls()[0];
    let marker = call.iter().position(|arg| arg == "--").expect("end-of-options marker");
    assert_eq!(call[..marker], ["rm"]);
    assert_eq!(call[marker + 1..], ["--help"]);
}

// ============================================================================
// Stop all
// ============================================================================

#[test]
fn test_stop_all_nothing_running_issues_no_stop() {
    let (fake, cli) = cli_with(
        FakeExecutor::new()
            .respond(&["ps", "--quiet"], "", 0)
            .respond(&["stop"], "", 0),
    );

    assert_eq!(cli.stop_all(), Err(LifecycleError::NothingToStop));
    assert_eq!(fake.calls(), vec![vec!["ps", "--quiet"]]);
}

#[test]
fn test_stop_all_batches_ids() {
    let (fake, cli) = cli_with(
        FakeExecutor::new()
            .respond(&["ps", "--quiet"], "aaa111\nbbb222\nccc333\n", 0)
            .respond(&["stop"], "", 0),
    );

    assert!(cli.perform(&Operation::StopAll).is_ok());
    assert_eq!(fake.count_calls(&["stop"]), 1);
    assert_eq!(fake.calls()[1], ["stop", "--", "aaa111", "bbb222", "ccc333"]);
}

#[test]
fn test_stop_all_stop_failure() {
    let (_, cli) = cli_with(
        FakeExecutor::new()
            .respond(&["ps", "--quiet"], "aaa111\n", 0)
            .respond(&["stop"], "Error response from daemon", 1),
    );

    assert!(matches!(
        cli.stop_all(),
        Err(LifecycleError::CommandFailed { exit_code: 1, .. })
    ));
}

// ============================================================================
// Exit-code reduction
// ============================================================================

#[test]
fn test_success_iff_exit_zero() {
    for (exit_code, expect_ok) in [(0, true), (1, false), (125, false), (-1, false)] {
        let (_, cli) = cli_with(FakeExecutor::new().respond(&["rm"], "", exit_code));
        assert_eq!(cli.remove_container("web").is_ok(), expect_ok, "exit {}", exit_code);
    }
}

#[test]
fn test_prune_all_command() {
    let (fake, cli) = cli_with(FakeExecutor::new().respond(&["system", "prune"], "Total reclaimed space: 0B", 0));

    assert!(cli.perform(&Operation::PruneAll).is_ok());
    assert_eq!(
        fake.calls(),
        vec![vec!["system", "prune", "--all", "--force", "--volumes"]]
    );
}
