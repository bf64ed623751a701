// tests/script_sessions.rs

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use script_docker::config::ConfigFile;
use script_docker::errors::ScriptError;
use script_docker::message::{Message, Mode};
use script_docker::plugin::ScriptPlugin;
use script_docker::types::TerminationReason;
use script_docker_test_utils::builders::{ConfigFileBuilder, MessageBuilder};
use script_docker_test_utils::shell_backend::ShellBackend;
use script_docker_test_utils::{block_lines, drain_outbound, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn plugin_with(
    config: &ConfigFile,
    backend: ShellBackend,
) -> (ScriptPlugin, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel(256);
    let plugin = ScriptPlugin::with_backend(config, Arc::new(backend), tx);
    (plugin, rx)
}

async fn run_bash(
    config: &ConfigFile,
    script: &str,
) -> Result<(Option<TerminationReason>, Vec<String>), Box<dyn Error>> {
    let (plugin, mut rx) = plugin_with(config, ShellBackend::new());
    let msg = MessageBuilder::command("bash", script).build();

    let outcome = with_timeout(plugin.execute(&msg)).await?;
    let texts = drain_outbound(&mut rx)
        .iter()
        .map(|m| m.text().to_string())
        .collect();
    Ok((outcome.map(|o| o.termination), texts))
}

fn stdout_lines_of(texts: &[String]) -> Vec<String> {
    texts.iter().flat_map(|t| block_lines(t, "STDOUT")).collect()
}

#[tokio::test]
async fn short_script_sends_single_finish_report() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();

    let (termination, texts) = run_bash(&config, "echo hi").await?;

    assert_eq!(texts, vec!["STDOUT (FINISH)\n\n```\nhi\n```".to_string()]);
    assert_eq!(termination, Some(TerminationReason::Exited(Some(0))));
    Ok(())
}

#[tokio::test]
async fn stdout_and_stderr_render_as_separate_blocks() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();

    let (_, texts) = run_bash(&config, "echo out\necho err >&2").await?;

    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("STDOUT (FINISH)"));
    assert!(texts[0].contains("\n\nSTDERR (FINISH)\n\n"));
    assert_eq!(block_lines(&texts[0], "STDOUT"), vec!["out"]);
    assert_eq!(block_lines(&texts[0], "STDERR"), vec!["err"]);
    Ok(())
}

#[tokio::test]
async fn stderr_only_output_has_no_stdout_block() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();

    let (_, texts) = run_bash(&config, "echo oops >&2\nexit 3").await?;

    assert_eq!(texts, vec!["STDERR (FINISH)\n\n```\noops\n```".to_string()]);
    Ok(())
}

#[tokio::test]
async fn silent_script_gets_bare_finish() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .flush_interval(Duration::from_millis(200))
        .build();

    let (_, texts) = run_bash(&config, "sleep 1").await?;

    // Flush ticks with nothing buffered must not produce PARTIAL reports.
    assert_eq!(texts, vec!["(FINISH)".to_string()]);
    Ok(())
}

#[tokio::test]
async fn hung_script_times_out_with_bare_tag() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().exec_duration_secs(1).build();

    let started = Instant::now();
    let (termination, texts) = run_bash(&config, "exec sleep 5").await?;

    assert_eq!(texts, vec!["(TIMEOUT)".to_string()]);
    assert_eq!(termination, Some(TerminationReason::TimedOut));
    assert!(started.elapsed() < Duration::from_secs(4));
    Ok(())
}

#[tokio::test]
async fn output_before_timeout_is_in_timeout_report() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().exec_duration_secs(1).build();

    let (_, texts) = run_bash(&config, "echo before\nexec sleep 5").await?;

    assert_eq!(
        texts,
        vec!["STDOUT (TIMEOUT)\n\n```\nbefore\n```".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn full_batch_sends_partial_without_empty_stderr_block() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().batch_lines(30).build();

    let script = "for i in $(seq 1 30); do echo line$i; done\nsleep 1";
    let (_, texts) = run_bash(&config, script).await?;

    assert_eq!(texts.len(), 2, "got {texts:?}");
    assert!(texts[0].starts_with("STDOUT (PARTIAL)"));
    assert!(!texts[0].contains("STDERR"));
    let expected: Vec<String> = (1..=30).map(|i| format!("line{i}")).collect();
    assert_eq!(block_lines(&texts[0], "STDOUT"), expected);
    assert_eq!(texts[1], "(FINISH)");
    Ok(())
}

#[tokio::test]
async fn many_lines_arrive_in_order_across_reports() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().batch_lines(30).build();

    let (_, texts) = run_bash(&config, "seq 1 100").await?;

    let expected: Vec<String> = (1..=100).map(|i| i.to_string()).collect();
    assert_eq!(stdout_lines_of(&texts), expected);

    let (last, earlier) = texts.split_last().ok_or("no reports")?;
    assert!(last.contains("(FINISH)"));
    for text in earlier {
        assert!(text.starts_with("STDOUT (PARTIAL)"), "unexpected {text:?}");
        assert!(block_lines(text, "STDOUT").len() <= 30);
    }
    Ok(())
}

#[tokio::test]
async fn flush_timer_sends_partial_for_slow_output() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .flush_interval(Duration::from_millis(200))
        .build();

    let (_, texts) = run_bash(&config, "echo first\nsleep 1\necho second").await?;

    assert!(texts.len() >= 2, "got {texts:?}");
    assert!(texts[0].starts_with("STDOUT (PARTIAL)"));
    assert_eq!(block_lines(&texts[0], "STDOUT"), vec!["first"]);
    assert!(texts.last().is_some_and(|t| t.contains("(FINISH)")));
    assert_eq!(stdout_lines_of(&texts), vec!["first", "second"]);
    Ok(())
}

#[tokio::test]
async fn mentions_in_output_are_escaped() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();

    let (_, texts) = run_bash(&config, "echo hi @alice").await?;

    assert_eq!(texts.len(), 1);
    assert!(!texts[0].contains('@'));
    assert!(texts[0].contains("hi \u{FF20}alice"));
    Ok(())
}

#[tokio::test]
async fn reports_reply_to_the_original_sender() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();
    let (plugin, mut rx) = plugin_with(&config, ShellBackend::new());
    let msg = MessageBuilder::command("bash", "echo hi").build();

    with_timeout(plugin.execute(&msg)).await?;
    let sent = drain_outbound(&mut rx);

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].mode, Some(Mode::Reply));
    assert_eq!(sent[0].extra, msg.extra);
    assert_eq!(sent[0].message.extra, msg.message.extra);
    // The inbound message is untouched.
    assert_eq!(msg.mode, None);
    Ok(())
}

#[tokio::test]
async fn missing_image_is_pulled_after_download_notice() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();
    let backend = ShellBackend::new().missing_image();
    let (plugin, mut rx) = plugin_with(&config, backend.clone());
    let msg = MessageBuilder::command("python", "echo ready").build();

    with_timeout(plugin.execute(&msg)).await?;
    let texts: Vec<String> = drain_outbound(&mut rx)
        .iter()
        .map(|m| m.text().to_string())
        .collect();

    assert_eq!(texts.len(), 2, "got {texts:?}");
    assert_eq!(texts[0], "(DOWNLOAD python:alpine)");
    assert_eq!(block_lines(&texts[1], "STDOUT"), vec!["ready"]);
    assert_eq!(backend.pulls(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_pull_still_launches() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();
    let backend = ShellBackend::new().missing_image().failing_pull();
    let (plugin, mut rx) = plugin_with(&config, backend);
    let msg = MessageBuilder::command("bash", "echo anyway").build();

    let outcome = with_timeout(plugin.execute(&msg)).await?;
    let texts: Vec<String> = drain_outbound(&mut rx)
        .iter()
        .map(|m| m.text().to_string())
        .collect();

    assert!(outcome.is_some_and(|o| o.terminal_delivered));
    assert_eq!(texts.len(), 2);
    assert!(texts[0].starts_with("(DOWNLOAD"));
    assert_eq!(block_lines(&texts[1], "STDOUT"), vec!["anyway"]);
    Ok(())
}

#[tokio::test]
async fn launch_failure_sends_error_report() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();
    let (plugin, mut rx) = plugin_with(&config, ShellBackend::new().unspawnable());
    let msg = MessageBuilder::command("bash", "echo never").build();

    let result = with_timeout(plugin.execute(&msg)).await;
    let sent = drain_outbound(&mut rx);

    assert!(matches!(result, Err(ScriptError::Launch { .. })));
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text().starts_with("(ERROR)\n\n```\n"));
    assert!(sent[0].text().contains("archlinux/base"));
    Ok(())
}

#[tokio::test]
async fn non_command_messages_are_ignored() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();
    let (plugin, mut rx) = plugin_with(&config, ShellBackend::new());

    for text in ["hello there", "bash\necho hi", "/unknown\necho hi"] {
        let msg = MessageBuilder::new(text).build();
        let outcome = with_timeout(plugin.execute(&msg)).await?;
        assert!(outcome.is_none(), "{text:?} should not run");
    }

    assert!(drain_outbound(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
async fn custom_prefix_and_image_are_used() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .prefix("!")
        .image("sh", "busybox:latest")
        .build();
    let (plugin, mut rx) = plugin_with(&config, ShellBackend::new().missing_image());

    let help = plugin.describe();
    assert!(help.contains("!bash: run script in \"archlinux/base\"\n"));
    assert!(help.contains("!sh: run script in \"busybox:latest\"\n"));

    let msg = MessageBuilder::new("!sh\necho custom").build();
    with_timeout(plugin.execute(&msg)).await?;
    let texts: Vec<String> = drain_outbound(&mut rx)
        .iter()
        .map(|m| m.text().to_string())
        .collect();

    assert_eq!(texts[0], "(DOWNLOAD busybox:latest)");
    assert_eq!(block_lines(&texts[1], "STDOUT"), vec!["custom"]);
    Ok(())
}

#[tokio::test]
async fn concurrent_sessions_do_not_mix_output() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new().build();
    let (plugin, mut rx) = plugin_with(&config, ShellBackend::new());

    let a = MessageBuilder::command("bash", "echo from-a").build();
    let b = MessageBuilder::command("bash", "echo from-b").build();
    let (ra, rb) =
        with_timeout(async { tokio::join!(plugin.execute(&a), plugin.execute(&b)) }).await;
    ra?;
    rb?;

    let mut texts: Vec<String> = drain_outbound(&mut rx)
        .iter()
        .map(|m| m.text().to_string())
        .collect();
    texts.sort();

    assert_eq!(
        texts,
        vec![
            "STDOUT (FINISH)\n\n```\nfrom-a\n```".to_string(),
            "STDOUT (FINISH)\n\n```\nfrom-b\n```".to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn deadline_kills_even_while_outbound_queue_is_full() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .batch_lines(30)
        .exec_duration_secs(1)
        .build();
    let (tx, mut rx) = mpsc::channel(1);
    let plugin = ScriptPlugin::with_backend(&config, Arc::new(ShellBackend::new()), tx);

    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("still-running");
    let script = format!(
        "seq 1 90\nsleep 2\ntouch {}\nexec sleep 30",
        marker.display()
    );
    let msg = MessageBuilder::command("bash", &script).build();

    // Nobody reads until well after the deadline, so the second PARTIAL
    // blocks on the one-slot queue.
    let consumer = async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        let mut texts = Vec::new();
        while let Some(msg) = rx.recv().await {
            let text = msg.text().to_string();
            let done = text.contains("(TIMEOUT)") || text.contains("(FINISH)");
            texts.push(text);
            if done {
                break;
            }
        }
        texts
    };

    let (outcome, texts) =
        with_timeout(async { tokio::join!(plugin.execute(&msg), consumer) }).await;
    let outcome = outcome?.ok_or("command not recognised")?;

    assert_eq!(outcome.termination, TerminationReason::TimedOut);
    assert!(!marker.exists(), "script kept running past the deadline");
    assert!(texts.last().is_some_and(|t| t.contains("(TIMEOUT)")));
    let expected: Vec<String> = (1..=90).map(|i| i.to_string()).collect();
    assert_eq!(stdout_lines_of(&texts), expected);
    Ok(())
}
