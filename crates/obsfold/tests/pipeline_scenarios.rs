//! End-to-end behavior of the public API: constraints, folders, telemetry,
//! profiles and configuration files working together.

use obsfold::folder::TRUNCATION_MARKER;
use obsfold::prelude::*;
use obsfold::text::{count_chars, count_lines};

fn make_lines(n: usize) -> String {
    (0..n)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn python_module(defs: usize, body: usize) -> String {
    let mut lines = vec!["import os".to_string()];
    for d in 0..defs {
        lines.push(format!("def handler_{d}(event):"));
        for b in 0..body {
            lines.push(format!("    value_{b} = event.get({b})"));
        }
    }
    lines.join("\n")
}

fn is_marker(line: &str) -> bool {
    line == TRUNCATION_MARKER || (line.starts_with("[... ") && line.ends_with(" ...]"))
}

/// Lines of `output` that came from the input rather than from a folder.
fn content_lines(output: &str) -> usize {
    output.split('\n').filter(|l| !is_marker(l)).count()
}

fn line_limits(n: usize) -> Vec<Constraint> {
    vec![
        LineLimit::new(n).unwrap().into(),
        LineLimit::new(n)
            .unwrap()
            .with_folder(Folder::head_tail(0.6).unwrap())
            .unwrap()
            .into(),
        LineLimit::new(n)
            .unwrap()
            .with_folder(Folder::structure())
            .unwrap()
            .into(),
    ]
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn five_lines_under_limit_three() {
    let c = Constraint::line_limit(3).unwrap();
    let (text, stats) = c.check_and_fold("a\nb\nc\nd\ne");
    assert_eq!(text, "a\nb\nc\n[TRUNCATED]");
    assert!(stats.was_limited);
    assert_eq!(stats.lines_hidden, 2);
    assert_eq!(stats.chars_hidden, 0);
    assert_eq!(stats.constraint_type, "LineLimit");
    assert_eq!(stats.folder.as_deref(), Some("TruncateFolder"));
}

#[test]
fn head_tail_six_and_four() {
    let text = make_lines(20);
    let out = HeadTailFolder::new(0.6)
        .unwrap()
        .fold(&text, 10, Unit::Lines, 10);
    let lines: Vec<&str> = out.text.split('\n').collect();

    assert_eq!(lines.len(), 11);
    assert_eq!(lines[..6], ["line 0", "line 1", "line 2", "line 3", "line 4", "line 5"]);
    assert_eq!(lines[6], "[... 10 lines elided ...]");
    assert_eq!(lines[7..], ["line 16", "line 17", "line 18", "line 19"]);
    assert_eq!(out.hidden, 10);
}

#[test]
fn structure_keeps_def_and_class() {
    let mut lines = vec!["def foo():".to_string()];
    lines.extend((0..78).map(|i| format!("    step({i})")));
    lines.push("class Bar:".to_string());
    let text = lines.join("\n");

    let c: Constraint = LineLimit::new(50)
        .unwrap()
        .with_folder(Folder::structure())
        .unwrap()
        .into();
    let (out, stats) = c.check_and_fold(&text);

    assert_eq!(out, "def foo():\n[... 78 lines folded ...]\nclass Bar:");
    assert!(stats.was_limited);
    assert_eq!(stats.lines_hidden, 77);
    assert_eq!(stats.folder.as_deref(), Some("StructureFolder"));
}

#[test]
fn unconstrained_never_limits() {
    let text = make_lines(10_000);
    let (out, stats) = Constraint::Unconstrained.check_and_fold(&text);
    assert_eq!(out, text);
    assert!(!stats.was_limited);
    assert_eq!(stats.lines_hidden, 0);
    assert_eq!(stats.chars_hidden, 0);
    assert_eq!(stats.constraint_type, "Unconstrained");
}

// ── Properties ──────────────────────────────────────────────────────

#[test]
fn within_budget_is_untouched() {
    for n in [1, 2, 5, 40] {
        for len in 1..=n {
            let text = make_lines(len);
            for c in line_limits(n) {
                let (out, stats) = c.check_and_fold(&text);
                assert_eq!(out, text, "{c} changed text of {len} lines");
                assert!(!stats.was_limited);
            }
        }
    }
}

#[test]
fn empty_text_is_one_line_and_passes() {
    let (out, stats) = Constraint::line_limit(1).unwrap().check_and_fold("");
    assert_eq!(out, "");
    assert!(!stats.was_limited);
    assert_eq!(stats.total_units, 1);
}

#[test]
fn line_budget_holds_for_every_folder() {
    let inputs = [make_lines(300), python_module(12, 20), "x\n".repeat(90)];
    for text in &inputs {
        for limit in [1, 3, 17, 60] {
            for c in line_limits(limit) {
                let (out, _) = c.check_and_fold(text);
                assert!(
                    content_lines(&out) <= limit,
                    "{c} kept {} content lines",
                    content_lines(&out)
                );
            }
        }
    }
}

#[test]
fn char_budget_holds_for_truncate_and_head_tail() {
    let text = "héllo wörld ✓ ".repeat(200);
    let total = count_chars(&text);

    let truncate = TokenBudget::new(300).unwrap();
    let (out, stats) = truncate.check_and_fold(&text);
    let kept = out.strip_suffix("\n[TRUNCATED]").unwrap();
    assert_eq!(count_chars(kept), 300);
    assert_eq!(stats.chars_hidden, total - 300);
    assert_eq!(stats.lines_hidden, 0);

    let head_tail = TokenBudget::new(300)
        .unwrap()
        .with_folder(Folder::head_tail(0.5).unwrap())
        .unwrap();
    let (out, stats) = head_tail.check_and_fold(&text);
    let (head, rest) = out.split_once('\n').unwrap();
    let (marker, tail) = rest.split_once('\n').unwrap();
    assert_eq!(count_chars(head), 150);
    assert_eq!(count_chars(tail), 150);
    assert_eq!(marker, format!("[... {} chars elided ...]", total - 300));
    assert_eq!(stats.chars_hidden, total - 300);
}

#[test]
fn structure_output_fits_line_limit_with_markers() {
    let alternating = "def f():\n    x = 1\n".repeat(10);
    let inputs = [alternating.clone(), python_module(12, 1), python_module(12, 20)];
    for text in &inputs {
        for limit in 2..=12 {
            let c = LineLimit::new(limit)
                .unwrap()
                .with_folder(Folder::structure())
                .unwrap();
            let (out, stats) = c.check_and_fold(text);
            assert!(stats.was_limited);
            assert!(!out.ends_with(TRUNCATION_MARKER), "limit {limit} fell back");
            assert!(
                count_lines(&out) <= limit,
                "limit {limit} produced {} lines",
                count_lines(&out)
            );
        }
    }

    let c = LineLimit::new(4)
        .unwrap()
        .with_folder(Folder::structure())
        .unwrap();
    let (out, stats) = c.check_and_fold(&alternating);
    assert_eq!(
        out,
        "def f():\n[... 1 lines folded ...]\ndef f():\n[... 18 lines folded ...]"
    );
    assert_eq!(stats.lines_hidden, 17);
}

#[test]
fn structure_output_fits_char_budget() {
    let inputs = [
        "def f():\n    x = 1\n".repeat(10),
        python_module(6, 3),
        "---\nx\n".repeat(30),
    ];
    for text in &inputs {
        let total = count_chars(text);
        for limit in [20, 40, 80, 150] {
            let c = TokenBudget::new(limit)
                .unwrap()
                .with_folder(Folder::structure())
                .unwrap();
            let (out, _) = c.check_and_fold(text);
            match out.strip_suffix("\n[TRUNCATED]") {
                Some(kept) => assert!(count_chars(kept) <= limit),
                None => {
                    assert!(count_chars(&out) <= limit, "limit {limit}: {out:?}");
                    assert!(count_chars(&out) < total);
                }
            }
        }
    }

    // Even one separator plus its trailing marker needs 29 chars.
    let text = "---\nx\n".repeat(6);
    let c = TokenBudget::new(20)
        .unwrap()
        .with_folder(Folder::structure())
        .unwrap();
    let (out, stats) = c.check_and_fold(&text);
    assert_eq!(out, format!("{}--\n{TRUNCATION_MARKER}", "---\nx\n".repeat(3)));
    assert!(count_chars(&out) < count_chars(&text));
    assert_eq!(stats.chars_hidden, 16);

    let code = python_module(6, 3);
    let c = TokenBudget::new(150)
        .unwrap()
        .with_folder(Folder::structure())
        .unwrap();
    let (out, stats) = c.check_and_fold(&code);
    assert_eq!(
        out,
        "import os\ndef handler_0(event):\n[... 3 lines folded ...]\n\
         def handler_1(event):\n[... 19 lines folded ...]"
    );
    assert_eq!(count_chars(&out), 104);
    // Kept lines plus the newline between the adjacent first two.
    assert_eq!(stats.chars_hidden, count_chars(&code) - 52);
}

#[test]
fn hidden_count_is_conserved() {
    let text = make_lines(250);
    for limit in [1, 9, 100] {
        for c in line_limits(limit).into_iter().take(2) {
            let (out, stats) = c.check_and_fold(&text);
            assert_eq!(
                stats.lines_hidden + content_lines(&out),
                250,
                "{c} lost track of lines"
            );
        }
    }

    // Structure markers stand in for the lines they fold.
    let code = python_module(5, 30);
    let c: Constraint = LineLimit::new(20)
        .unwrap()
        .with_folder(Folder::structure())
        .unwrap()
        .into();
    let (out, stats) = c.check_and_fold(&code);
    assert_eq!(stats.lines_hidden + count_lines(&out), count_lines(&code));
}

#[test]
fn folding_is_deterministic() {
    let text = python_module(8, 25);
    let mut constraints = line_limits(30);
    constraints.push(
        TokenBudget::new(700)
            .unwrap()
            .with_folder(Folder::structure())
            .unwrap()
            .into(),
    );
    for c in constraints {
        let first = c.check_and_fold(&text);
        for _ in 0..3 {
            assert_eq!(c.check_and_fold(&text), first, "{c} is not deterministic");
        }
    }
}

#[test]
fn telemetry_is_monotonic() {
    let pipeline = ObservationPipeline::new(Constraint::line_limit(10).unwrap());
    assert_eq!(pipeline.snapshot().truncation_rate, 0.0);

    for k in 1..=30u64 {
        let len = if k % 3 == 0 { 50 } else { 5 };
        pipeline.process(&make_lines(len));
        let snap = pipeline.snapshot();
        assert_eq!(snap.tool_output_count, k);
        assert!(snap.truncation_count <= k);
        assert!((0.0..=1.0).contains(&snap.truncation_rate));
    }
    let snap = pipeline.snapshot();
    assert_eq!(snap.truncation_count, 10);
    assert_eq!(snap.lines_hidden_total, 400);
}

// ── Host integration ────────────────────────────────────────────────

#[test]
fn host_loop_with_profile() {
    let mut pipeline = ObservationPipeline::from_profile(ToolProfile::minimal());
    let mut conversation = vec![
        Message::system("You are navigating a repository."),
        Message::user("Find the handler."),
    ];

    for round in 0..3 {
        conversation.push(Message::assistant(format!("reading file {round}")));
        conversation.push(Message::tool_result(
            format!("call_{round}"),
            python_module(10, 10),
        ));
        let last = conversation.len() - 1;
        let stats = pipeline.process_messages(&mut conversation[last..]);
        assert_eq!(stats.len(), 1);
        assert!(stats[0].was_limited);
    }

    let step = pipeline.trajectory_stats();
    assert_eq!(step.total_tool_outputs, 3);
    assert_eq!(step.truncations_so_far, 3);
    assert_eq!(step.constraint_type, "LineLimit");

    let shown = conversation[3].content.as_deref().unwrap();
    assert!(shown.starts_with("import os\ndef handler_0(event):\n[... 10 lines folded ...]"));

    pipeline.start_episode();
    assert_eq!(pipeline.trajectory_stats().total_tool_outputs, 0);
}

#[test]
fn concurrent_rollouts_keep_separate_counts() {
    let constraint = Constraint::line_limit(4).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let constraint = constraint.clone();
            std::thread::spawn(move || {
                let pipeline = ObservationPipeline::new(constraint);
                for _ in 0..=worker {
                    pipeline.process(&make_lines(10));
                }
                pipeline.snapshot()
            })
        })
        .collect();

    for (worker, handle) in handles.into_iter().enumerate() {
        let snap = handle.join().unwrap();
        assert_eq!(snap.tool_output_count, worker as u64 + 1);
        assert_eq!(snap.lines_hidden_total, 6 * (worker as u64 + 1));
    }
}

#[test]
fn stats_and_snapshots_serialize() {
    let pipeline = ObservationPipeline::from_profile(ToolProfile::power());
    let (_, stats) = pipeline.process(&"z".repeat(20_000));

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["was_limited"], true);
    assert_eq!(json["chars_hidden"], 4000);
    assert_eq!(json["constraint_type"], "TokenBudget");
    assert_eq!(json["folder"], "HeadTailFolder");

    let snap = serde_json::to_value(pipeline.snapshot()).unwrap();
    assert_eq!(snap["tool_output_count"], 1);
    assert_eq!(snap["truncation_rate"], 1.0);
}

#[test]
fn every_profile_is_usable() {
    let text = python_module(40, 15);
    for name in ProfileName::ALL {
        let profile = ToolProfile::by_name(name.as_str()).unwrap();
        let pipeline = ObservationPipeline::from_profile(profile);
        let (out, stats) = pipeline.process(&text);
        match name {
            ProfileName::Unconstrained => assert_eq!(out, text),
            ProfileName::Power => assert_eq!(stats.constraint_type, "TokenBudget"),
            _ => assert!(stats.was_limited, "{name} should limit a 641-line file"),
        }
    }
}

#[test]
fn config_file_drives_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fold.json");
    std::fs::write(
        &path,
        r#"{
            "constraint": {
                "kind": "line_limit",
                "max_lines": 3,
                "folder": { "kind": "head_tail", "head_ratio": 0.34 }
            },
            "max_iterations": 12
        }"#,
    )
    .unwrap();

    let profile = FoldConfig::load(&path).unwrap().build().unwrap();
    assert_eq!(profile.max_iterations, 12);
    let pipeline = ObservationPipeline::from_profile(profile);
    let (out, stats) = pipeline.process("a\nb\nc\nd\ne\nf");
    assert_eq!(out, "a\n[... 3 lines elided ...]\ne\nf");
    assert_eq!(stats.lines_hidden, 3);
}

#[test]
fn configuration_errors_name_the_parameter() {
    let err = LineLimit::checked(0).unwrap_err();
    assert!(err.to_string().contains("max_lines"));

    let err = TokenBudget::checked(-1).unwrap_err();
    assert!(err.to_string().contains("max_chars"));

    let err = HeadTailFolder::new(0.0).unwrap_err();
    assert!(err.to_string().contains("head_ratio"));

    let err = ToolProfile::by_name("maximal").unwrap_err();
    assert!(err.to_string().contains("maximal"));

    let err = LineLimit::new(5)
        .unwrap()
        .with_folder(Folder::Identity)
        .unwrap_err();
    assert!(err.to_string().contains("identity folder"));
}
