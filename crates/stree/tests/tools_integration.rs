//! Integration tests for the `Tools` facade.
//!
//! Each test runs against its own config file, state file and project
//! directory, with a recording fake standing in for tmux.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

mod common;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use common::{Fixture, RecordingTmux, TmuxCall};
use stree_core::{SessionId, SessionStatus, SpawnMode, NO_SESSIONS_MESSAGE};

const NOTIFY_BOTH: &str = "interaction:
  auto_focus_parent: true
  notify_method: both
  reports_dir: .reports
";

const NOTIFY_NONE: &str = "interaction:
  auto_focus_parent: true
  notify_method: none
  reports_dir: .reports
";

const FOCUS_DISABLED: &str = "interaction:
  auto_focus_parent: false
  notify_method: tmux-message
  reports_dir: .reports
";

/// Builds lead → (a → c, b), with every window named after its node.
fn family(fx: &Fixture) -> [SessionId; 4] {
    let lead = fx.track("s-lead", "lead", None);
    let a = fx.track("s-a", "a", Some("s-lead"));
    let b = fx.track("s-b", "b", Some("s-lead"));
    let c = fx.track("s-c", "c", Some("s-a"));
    [lead, a, b, c]
}

// ============================================================================
// Tree Rendering
// ============================================================================

#[tokio::test]
async fn test_show_tree_empty() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("scratch"));

    let result = fx.tools.show_tree();
    assert!(result.success);
    assert_eq!(result.message, NO_SESSIONS_MESSAGE);
}

#[tokio::test]
async fn test_show_tree_lists_children_in_order() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("scratch"));
    fx.track("s-lead", "lead", None);
    fx.track("s-a", "a", Some("s-lead"));
    fx.track("s-b", "b", Some("s-lead"));

    let message = fx.tools.show_tree().message;
    let lines: Vec<&str> = message.lines().collect();
    assert_eq!(lines[0], "🌳 Session Tree (3 sessions)");
    assert_eq!(&lines[2..], ["└── 🟢 lead", "    ├── 🟢 a", "    └── 🟢 b"]);
}

// ============================================================================
// Spawning
// ============================================================================

#[tokio::test]
async fn test_spawn_unknown_agent_leaves_tree_untouched() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("lead"));
    fx.track("s-lead", "lead", None);
    let before = fs::read(&fx.state_file).unwrap();

    let result = fx.tools.spawn_child("chef", "cook", None).await;

    assert!(!result.success);
    assert!(result.session_id.is_none());
    assert_eq!(
        result.message,
        "Unknown agent type: chef. Available: web, pipeline, db, research, test, general"
    );
    assert_eq!(fs::read(&fx.state_file).unwrap(), before);
    assert!(fx.tmux.calls().is_empty());
}

#[tokio::test]
async fn test_spawn_requires_tmux_in_tmux_mode() {
    let fx = Fixture::with_tmux(RecordingTmux::outside());

    let result = fx.tools.spawn_child("web", "build the page", None).await;

    assert!(!result.success);
    assert!(result.message.starts_with("Not running in tmux"));
    assert!(!fx.state_file.exists());
}

#[tokio::test]
async fn test_spawn_from_untracked_caller_creates_root() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("scratch"));

    let result = fx.tools.spawn_child("web", "build the page", None).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Spawned web agent in window: web-root");

    let tree = fx.tree();
    let id = SessionId::new(result.session_id.unwrap());
    let node = tree.get(&id).unwrap();
    assert!(node.parent.is_none());
    assert_eq!(node.working_dir, fx.project);
    assert_eq!(node.agent_type.as_deref(), Some("web"));
    assert_eq!(node.spawn_mode, Some(SpawnMode::Tmux));
    assert_eq!(node.status, SessionStatus::Active);

    assert_eq!(node.window_id.as_deref(), Some("@1"));

    let calls = fx.tmux.calls();
    assert_eq!(
        calls[0],
        TmuxCall::NewWindow {
            name: "web-root".to_string(),
            dir: fx.project.clone(),
        }
    );
    assert!(matches!(&calls[1], TmuxCall::SendKeys { target, .. } if target == "@1"));
    assert!(fx.tools.show_tree().message.ends_with("└── 🟢 web-root [web]"));
}

#[tokio::test]
async fn test_spawn_same_agent_twice_gets_distinct_windows() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("lead"));
    let lead = fx.track("s-lead", "lead", None);

    let first = fx.tools.spawn_child("web", "header", None).await;
    let second = fx.tools.spawn_child("web", "footer", None).await;
    assert_eq!(first.message, "Spawned web agent in window: web-lead");
    assert_eq!(second.message, "Spawned web agent in window: web-lead-2");

    let first = SessionId::new(first.session_id.unwrap());
    let second = SessionId::new(second.session_id.unwrap());
    assert_eq!(fx.node(&lead).children, [first.clone(), second.clone()]);

    fx.tmux.set_window("web-lead-2");
    assert!(fx.tools.session_idle().await.success);
    assert_eq!(fx.node(&first).status, SessionStatus::Active);
    assert_eq!(fx.node(&second).status, SessionStatus::Idle);

    fx.tmux.set_window("web-lead");
    let report = fx.tools.report_to_parent("done", "header").await;
    assert_eq!(report.parent_handle.as_deref(), Some("lead"));
    assert!(fx.project.join(".reports").join("header.md").exists());
}

#[tokio::test]
async fn test_respawn_after_kill_leaves_killed_node_alone() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("lead"));
    fx.track("s-lead", "lead", None);

    let old = fx.tools.spawn_child("web", "first try", None).await;
    let old = SessionId::new(old.session_id.unwrap());
    assert!(fx.tools.kill_session("web-lead", false).await.success);
    assert_eq!(fx.tmux.killed_windows(), ["@1"]);

    let new = fx.tools.spawn_child("web", "second try", None).await;
    assert_eq!(new.message, "Spawned web agent in window: web-lead");
    let new = SessionId::new(new.session_id.unwrap());

    fx.tmux.set_window("web-lead");
    assert!(fx.tools.session_idle().await.success);
    assert_eq!(fx.node(&old).status, SessionStatus::Killed);
    assert_eq!(fx.node(&new).status, SessionStatus::Idle);

    // the live session wins a name lookup
    fx.tmux.set_window("lead");
    assert!(fx.tools.kill_session("web-lead", false).await.success);
    assert_eq!(fx.node(&new).status, SessionStatus::Killed);
    assert_eq!(fx.tmux.killed_windows(), ["@1", "@2"]);
}

#[tokio::test]
async fn test_spawn_send_failure_closes_window() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("scratch"));
    fx.tmux.fail_target("@1");

    let result = fx.tools.spawn_child("web", "build the page", None).await;

    assert!(!result.success);
    assert_eq!(result.message, "Failed to create tmux window");
    assert_eq!(fx.tmux.killed_windows(), ["@1"]);
    assert!(!fx.state_file.exists());
}

#[tokio::test]
async fn test_spawn_n_children_in_call_order() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("lead"));
    let lead = fx.track("s-lead", "lead", None);

    let mut ids = Vec::new();
    for agent in ["web", "db", "test"] {
        let result = fx.tools.spawn_child(agent, "work", None).await;
        assert!(result.success, "{}", result.message);
        ids.push(SessionId::new(result.session_id.unwrap()));
    }

    assert_eq!(fx.node(&lead).children, ids);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 3);
    for id in &ids {
        assert_eq!(fx.node(id).parent.as_ref(), Some(&lead));
    }
    assert_eq!(fx.tree().len(), 4);
}

#[tokio::test]
async fn test_concurrent_spawns_are_all_registered() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("lead"));
    let lead = fx.track("s-lead", "lead", None);

    let (a, b, c) = tokio::join!(
        fx.tools.spawn_child("web", "one", None),
        fx.tools.spawn_child("db", "two", None),
        fx.tools.spawn_child("research", "three", None),
    );
    assert!(a.success && b.success && c.success);

    assert_eq!(fx.node(&lead).children.len(), 3);
    assert_eq!(fx.tree().len(), 4);
}

#[tokio::test]
async fn test_spawn_renders_prompt_into_startup_command() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("lead"));
    fx.track("s-lead", "lead", None);

    let result = fx.tools.spawn_child("web", "fix bug\nadd test", None).await;
    assert!(result.success, "{}", result.message);

    let keys = fx.tmux.sent_keys();
    assert_eq!(keys.len(), 1);
    let command = &keys[0];
    assert!(command.starts_with("opencode --prompt '"));
    assert!(command.contains("You are a WEB agent working on shop."));
    assert!(command.contains("You were spawned by lead on "));
    assert!(command.contains("1. fix bug\n2. add test"));
    assert!(command.contains("\"fix-bug\""));
    assert!(!command.contains("{TASKS}"));
}

#[tokio::test]
async fn test_spawn_with_explicit_working_dir() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("scratch"));
    let dir = fx.project.join("frontend");

    let result = fx.tools.spawn_child("web", "style", Some(dir.clone())).await;
    assert!(result.success, "{}", result.message);

    let id = SessionId::new(result.session_id.unwrap());
    assert_eq!(fx.node(&id).working_dir, dir);
}

#[tokio::test]
async fn test_spawn_with_relative_working_dir_resolves_against_cwd() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("scratch"));

    let result = fx
        .tools
        .spawn_child("web", "style", Some(PathBuf::from("frontend")))
        .await;
    assert!(result.success, "{}", result.message);

    let id = SessionId::new(result.session_id.unwrap());
    let working_dir = fx.node(&id).working_dir;
    assert!(working_dir.is_absolute());
    assert_eq!(working_dir, fx.project.join("frontend"));
    assert_eq!(
        fx.tmux.calls()[0],
        TmuxCall::NewWindow {
            name: "web-root".to_string(),
            dir: fx.project.join("frontend"),
        }
    );
}

#[tokio::test]
async fn test_spawn_backend_failure_writes_nothing() {
    let fx = Fixture::with_tmux(RecordingTmux::broken("scratch"));

    let result = fx.tools.spawn_child("web", "build the page", None).await;

    assert!(!result.success);
    assert_eq!(result.message, "Failed to create tmux window");
    assert!(!fx.state_file.exists());
}

#[tokio::test]
async fn test_spawn_terminal_mode() {
    let fx = Fixture::new(
        RecordingTmux::outside(),
        "spawn_mode: terminal\nterminal:\n  command: sh\n  args: [\"-c\", \"exit 0\", \"{name}\"]\n",
    );

    let result = fx.tools.spawn_child("db", "migrate", None).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Spawned db agent in window: db-root");
    assert!(fx.tmux.calls().is_empty());

    let id = SessionId::new(result.session_id.unwrap());
    let node = fx.node(&id);
    assert_eq!(node.spawn_mode, Some(SpawnMode::Terminal));
    assert!(node.pid.is_some());

    let killed = fx.tools.kill_session("db-root", false).await;
    assert!(killed.success);
    assert_eq!(fx.node(&id).status, SessionStatus::Killed);
    assert!(fx.tmux.killed_windows().is_empty());
}

// ============================================================================
// Killing
// ============================================================================

#[tokio::test]
async fn test_kill_with_children_marks_whole_subtree() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("elsewhere"));
    let ids = family(&fx);

    let result = fx.tools.kill_session("lead", true).await;
    assert!(result.success);
    assert_eq!(result.message, "Killed session: lead (and children)");

    let tree = fx.tree();
    assert_eq!(tree.len(), 4);
    for id in &ids {
        assert_eq!(tree.get(id).unwrap().status, SessionStatus::Killed);
    }
    assert_eq!(fx.tmux.killed_windows(), ["lead", "a", "c", "b"]);
}

#[tokio::test]
async fn test_kill_without_children_leaves_descendants() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("elsewhere"));
    let [lead, a, b, c] = family(&fx);

    let result = fx.tools.kill_session("lead", false).await;
    assert_eq!(result.message, "Killed session: lead");

    assert_eq!(fx.node(&lead).status, SessionStatus::Killed);
    for id in [a, b, c] {
        assert_eq!(fx.node(&id).status, SessionStatus::Active);
    }
    assert_eq!(fx.tmux.killed_windows(), ["lead"]);
}

#[tokio::test]
async fn test_kill_unknown_session() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("elsewhere"));
    family(&fx);

    let result = fx.tools.kill_session("ghost", true).await;
    assert!(!result.success);
    assert_eq!(result.message, "Session not found: ghost");
}

#[tokio::test]
async fn test_kill_ignores_closed_windows() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("elsewhere"));
    let [_, a, ..] = family(&fx);
    fx.tmux.fail_target("a");

    let result = fx.tools.kill_session("lead", true).await;
    assert!(result.success);
    assert_eq!(fx.node(&a).status, SessionStatus::Killed);
    assert_eq!(fx.tmux.killed_windows().len(), 4);
}

#[tokio::test]
async fn test_kill_closes_own_window_last() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("a"));
    let ids = family(&fx);

    let result = fx.tools.kill_session("lead", true).await;
    assert!(result.success);
    assert_eq!(fx.tmux.killed_windows(), ["lead", "c", "b", "a"]);
    for id in &ids {
        assert_eq!(fx.node(id).status, SessionStatus::Killed);
    }
}

// ============================================================================
// Reports
// ============================================================================

#[tokio::test]
async fn test_report_from_root_fails_without_writing() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("lead"));
    fx.track("s-lead", "lead", None);

    let result = fx.tools.report_to_parent("# Findings", "summary").await;

    assert!(!result.success);
    assert_eq!(result.message, "No parent window found");
    assert!(result.parent_handle.is_none());
    assert!(!fx.project.join("lead").join(".reports").exists());
}

#[tokio::test]
async fn test_report_from_untracked_caller_fails() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("scratch"));
    family(&fx);

    let result = fx.tools.report_to_parent("# Findings", "summary").await;
    assert!(!result.success);
    assert_eq!(result.message, "No parent window found");
}

#[tokio::test]
async fn test_report_writes_file_and_notifies_parent() {
    let fx = Fixture::new(RecordingTmux::in_window("a"), NOTIFY_BOTH);
    family(&fx);

    let result = fx.tools.report_to_parent("# Findings\n\nAll good.", "summary").await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.parent_handle.as_deref(), Some("lead"));

    let report = fx.project.join("a").join(".reports").join("summary.md");
    assert_eq!(fs::read_to_string(&report).unwrap(), "# Findings\n\nAll good.");
    assert_eq!(
        result.message,
        format!("Report created at: {}\nNotified parent: lead", report.display())
    );

    assert!(fx.tmux.calls().contains(&TmuxCall::DisplayMessage {
        target: "lead".to_string(),
        message: "Report ready: summary (from a)".to_string(),
    }));

    let second = fx.tools.report_to_parent("more", "followup").await;
    assert!(second.success);

    let notifications =
        fs::read_to_string(fx.project.join("lead").join(".notifications")).unwrap();
    let lines: Vec<&str> = notifications.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("] Report ready: summary (from a)"));
    assert!(lines[1].ends_with("] Report ready: followup (from a)"));
}

#[tokio::test]
async fn test_report_with_notify_none_only_writes_file() {
    let fx = Fixture::new(RecordingTmux::in_window("c"), NOTIFY_NONE);
    family(&fx);

    let result = fx.tools.report_to_parent("done", "result").await;
    assert!(result.success);
    assert_eq!(result.parent_handle.as_deref(), Some("a"));

    assert!(fx.project.join("c").join(".reports").join("result.md").exists());
    assert!(fx.tmux.calls().is_empty());
    assert!(!fx.project.join("a").join(".notifications").exists());
}

#[tokio::test]
async fn test_report_survives_failed_message_delivery() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("a"));
    family(&fx);
    fx.tmux.fail_target("lead");

    let result = fx.tools.report_to_parent("done", "result").await;
    assert!(result.success, "{}", result.message);
}

#[tokio::test]
async fn test_report_rejects_path_names() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("a"));
    family(&fx);

    let result = fx.tools.report_to_parent("done", "../../escape").await;
    assert!(!result.success);
    assert!(result.message.starts_with("Invalid report name"));
}

// ============================================================================
// Focus
// ============================================================================

#[tokio::test]
async fn test_focus_parent_switches_window() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("c"));
    family(&fx);

    let result = fx.tools.focus_parent().await;
    assert!(result.success);
    assert_eq!(result.message, "Switched to parent window: a");
    assert_eq!(fx.tmux.calls(), [TmuxCall::SelectWindow("a".to_string())]);
}

#[tokio::test]
async fn test_focus_parent_failures() {
    let outside = Fixture::with_tmux(RecordingTmux::outside());
    assert_eq!(outside.tools.focus_parent().await.message, "Not running in tmux");

    let disabled = Fixture::new(RecordingTmux::in_window("a"), FOCUS_DISABLED);
    family(&disabled);
    assert_eq!(
        disabled.tools.focus_parent().await.message,
        "auto_focus_parent is disabled in config"
    );

    let root = Fixture::with_tmux(RecordingTmux::in_window("lead"));
    family(&root);
    let result = root.tools.focus_parent().await;
    assert!(!result.success);
    assert_eq!(result.message, "No parent window found");
    assert!(root.tmux.calls().is_empty());
}

// ============================================================================
// Idle Events and Agent Types
// ============================================================================

#[tokio::test]
async fn test_session_idle_marks_caller() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("b"));
    let [lead, _, b, _] = family(&fx);

    assert!(fx.tools.session_idle().await.success);
    assert_eq!(fx.node(&b).status, SessionStatus::Idle);
    assert_eq!(fx.node(&lead).status, SessionStatus::Active);

    fx.tmux.set_window("lead");
    fx.tools.session_idle().await;
    assert!(fx.tools.show_tree().message.contains("└── 🟡 lead"));
}

#[tokio::test]
async fn test_session_idle_from_untracked_window_is_noop() {
    let fx = Fixture::with_tmux(RecordingTmux::in_window("scratch"));
    let ids = family(&fx);
    let before = fs::read(&fx.state_file).unwrap();

    assert!(fx.tools.session_idle().await.success);
    assert_eq!(fs::read(&fx.state_file).unwrap(), before);
    assert_eq!(fx.node(&ids[0]).status, SessionStatus::Active);
}

#[tokio::test]
async fn test_list_agent_types() {
    let fx = Fixture::with_tmux(RecordingTmux::outside());

    let result = fx.tools.list_agent_types();
    assert!(result.success);
    assert!(result
        .message
        .starts_with("Available agent types:\n\n- **web**: Frontend and web UI work\n"));
    for agent in ["pipeline", "db", "research", "test", "general"] {
        assert!(result.message.contains(&format!("- **{agent}**: ")));
    }
}

#[tokio::test]
async fn test_user_agents_replace_defaults() {
    let fx = Fixture::new(
        RecordingTmux::in_window("scratch"),
        "agents:\n  ops:\n    description: Infrastructure\n",
    );

    assert_eq!(
        fx.tools.list_agent_types().message,
        "Available agent types:\n\n- **ops**: Infrastructure"
    );
    let result = fx.tools.spawn_child("web", "page", None).await;
    assert_eq!(result.message, "Unknown agent type: web. Available: ops");
}
