//! Terminal front ends for a [`ChatSession`].

use std::io::Write;
use std::sync::mpsc as std_mpsc;

use anyhow::Result;
use ragchat_rag::session::is_exit_command;
use ragchat_rag::{ChatSession, RagError, TurnOutcome};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::error;

/// Line-edited interactive chat with history. Ctrl-C and Ctrl-D end it, as
/// do `exit` and `quit`.
///
/// The editor lives on a blocking thread and hands each line over a channel,
/// then waits until the answer has been printed before prompting again.
pub async fn run_interactive(session: &mut ChatSession) -> Result<()> {
    let (line_tx, line_rx) = mpsc::channel(1);
    let (ready_tx, ready_rx) = std_mpsc::channel();
    let editor = tokio::task::spawn_blocking(move || read_lines(line_tx, ready_rx));

    println!("Ask about your documents. Type 'exit' or 'quit' to leave.\n");
    let answered = answer_lines(session, line_rx, ready_tx, std::io::stdout()).await;

    editor.await??;
    answered
}

/// Answer each line from `lines`, writing `Bot: ` replies to `out` and
/// signalling `ready` once a reply is written. Returns when the sender hangs
/// up or the session is closed; the session is closed on return.
async fn answer_lines<W: Write>(
    session: &mut ChatSession,
    mut lines: mpsc::Receiver<String>,
    ready: std_mpsc::Sender<()>,
    mut out: W,
) -> Result<()> {
    session.open();
    while let Some(line) = lines.recv().await {
        match session.submit(&line).await {
            Ok(TurnOutcome::Reply(reply)) => writeln!(out, "Bot: {reply}\n")?,
            Ok(TurnOutcome::Failed(message)) => writeln!(out, "Bot: [error] {message}\n")?,
            Ok(TurnOutcome::Ignored) => {}
            Err(RagError::SessionClosed) => break,
            Err(e) => writeln!(out, "Bot: [error] {e}\n")?,
        }
        out.flush()?;
        if ready.send(()).is_err() {
            break;
        }
    }
    session.close();
    Ok(())
}

/// Blocking half of [`run_interactive`]: owns the line editor.
fn read_lines(lines: mpsc::Sender<String>, ready: std_mpsc::Receiver<()>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                error!(error = %e, "failed to read input");
                break;
            }
        };

        if is_exit_command(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(line.as_str())?;

        if lines.blocking_send(line).is_err() || ready.recv().is_err() {
            break;
        }
    }
    Ok(())
}

/// Plain line-by-line chat over stdin and stdout, for pipes and scripts.
pub async fn run_plain(session: &mut ChatSession) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    session.run_lines(stdin, stdout).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ragchat_rag::{
        Document, Generator, LexicalHashEmbedder, MockLlm, RagConfig, RagPipeline, SessionState,
    };

    use super::*;

    async fn session() -> ChatSession {
        let config = RagConfig::builder().max_length(25).overlap(0).build().unwrap();
        let pipeline = RagPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(LexicalHashEmbedder::default()))
            .build()
            .unwrap();
        pipeline
            .ingest(&Document::new("people", "Alice is 30 years old. Bob is 25 years old."))
            .await
            .unwrap();
        let llm = Arc::new(MockLlm::fixed("Alice is 30 years old."));
        ChatSession::new(Arc::new(pipeline), Arc::new(Generator::new(llm, Duration::from_secs(5))))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reader_thread_waits_for_each_answer() {
        let mut session = session().await;
        let (line_tx, line_rx) = mpsc::channel(1);
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let reader = std::thread::spawn(move || {
            let mut acknowledged = 0;
            for line in ["How old is Alice?", "And Bob?"] {
                line_tx.blocking_send(line.to_string()).unwrap();
                ready_rx.recv().unwrap();
                acknowledged += 1;
            }
            acknowledged
        });

        let mut out = Vec::new();
        answer_lines(&mut session, line_rx, ready_tx, &mut out).await.unwrap();

        assert_eq!(reader.join().unwrap(), 2);
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("Bot: Alice is 30 years old.").count(), 2);
        assert_eq!(session.log().turns().count(), 4);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_hang_up_closes_session() {
        let mut session = session().await;
        let (line_tx, line_rx) = mpsc::channel::<String>(1);
        let (ready_tx, _ready_rx) = std_mpsc::channel();
        drop(line_tx);

        answer_lines(&mut session, line_rx, ready_tx, Vec::new()).await.unwrap();
        assert!(session.log().is_empty());
        assert_eq!(session.state(), SessionState::Closed);
    }
}
