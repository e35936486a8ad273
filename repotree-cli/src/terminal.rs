//! Terminal side of a sync run: colored report lines and stdin prompts.

use std::io::{self, BufRead, BufReader, Write};
use std::thread;
use std::time::Duration;

use colored::Colorize;
use tokio::sync::mpsc;

use repotree_sync::{LineReader, Reporter, Styling, SyncError, UpdatedRepo};

/// Report lines to stdout; warnings and errors to stderr.
pub struct TerminalReporter;

impl Reporter for TerminalReporter {
    fn section(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
    }

    fn info(&self, line: &str) {
        println!("{line}");
    }

    fn warn(&self, line: &str) {
        eprintln!("{} {line}", "warning:".yellow().bold());
    }

    fn error(&self, line: &str) {
        eprintln!("{} {line}", "error:".red().bold());
    }

    fn updated(&self, repo: &UpdatedRepo) {
        for line in updated_lines(repo) {
            println!("{line}");
        }
    }
}

/// One header line with the compare link, then one line per author.
///
/// Bot-only updates and bot authors are dimmed.
pub fn updated_lines(repo: &UpdatedRepo) -> Vec<String> {
    let mut lines = Vec::with_capacity(repo.authors.len() + 1);
    lines.push(match repo.styling {
        Styling::Robot => format!("{} {}", repo.id, repo.compare_url)
            .as_str()
            .dimmed()
            .to_string(),
        Styling::Human => format!("{} {}", repo.id.as_str().green().bold(), repo.compare_url),
    });
    for author in &repo.authors {
        let line = format!("    {:>4} {}", author.count, author.name);
        lines.push(if author.bot {
            line.as_str().dimmed().to_string()
        } else {
            line
        });
    }
    lines
}

/// Prompts on stdout and reads answers from stdin.
///
/// Lines are read on a detached thread, so an unanswered prompt never holds
/// up runtime shutdown.
pub struct StdinReader {
    lines: mpsc::Receiver<io::Result<String>>,
}

impl StdinReader {
    pub fn new() -> io::Result<Self> {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    pub fn from_reader<R>(mut input: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(8);
        thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || loop {
                let mut line = String::new();
                let next = match input.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => Ok(line.trim_end_matches(['\n', '\r']).to_string()),
                    Err(e) => Err(e),
                };
                let failed = next.is_err();
                if tx.blocking_send(next).is_err() || failed {
                    break;
                }
            })?;
        Ok(Self { lines: rx })
    }
}

impl LineReader for StdinReader {
    async fn read_line(
        &mut self,
        question: &str,
        timeout: Option<Duration>,
    ) -> Result<String, SyncError> {
        print!("{} ", question.bold());
        io::stdout()
            .flush()
            .map_err(|e| SyncError::Prompt(e.to_string()))?;

        let next = self.lines.recv();
        let line = match timeout {
            Some(limit) => tokio::time::timeout(limit, next)
                .await
                .map_err(|_| SyncError::PromptTimeout {
                    secs: limit.as_secs(),
                })?,
            None => next.await,
        };
        match line {
            Some(Ok(line)) => Ok(line),
            Some(Err(e)) => Err(SyncError::Prompt(e.to_string())),
            // stdin closed
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::sync::mpsc as std_mpsc;

    use repotree_core::RepoId;
    use repotree_git::Author;

    /// Stdin that stays open without ever producing a byte.
    struct OpenSilentInput(std_mpsc::Receiver<()>);

    impl Read for OpenSilentInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn unanswered_prompt_times_out_and_runtime_shuts_down() {
        let (keep_open, silent) = std_mpsc::channel::<()>();
        let runtime = runtime();
        let mut reader = StdinReader::from_reader(BufReader::new(OpenSilentInput(silent))).unwrap();

        let answer =
            runtime.block_on(reader.read_line("Move?", Some(Duration::from_millis(200))));
        assert!(matches!(answer, Err(SyncError::PromptTimeout { .. })), "{answer:?}");

        let (done_tx, done_rx) = std_mpsc::channel();
        thread::spawn(move || {
            drop(reader);
            drop(runtime);
            let _ = done_tx.send(());
        });
        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "runtime shutdown blocked by a pending stdin read"
        );
        drop(keep_open);
    }

    #[test]
    fn answers_are_read_line_by_line_then_empty_at_eof() {
        let runtime = runtime();
        let mut reader = StdinReader::from_reader(Cursor::new("yes\r\nh\n")).unwrap();

        runtime.block_on(async {
            assert_eq!(reader.read_line("Move?", None).await.unwrap(), "yes");
            assert_eq!(reader.read_line("Clone?", None).await.unwrap(), "h");
            assert_eq!(reader.read_line("Clone?", None).await.unwrap(), "");
        });
    }

    #[test]
    fn updated_lines_list_authors_in_order() {
        colored::control::set_override(false);
        let authors = [
            Author {
                name: "Ada".to_string(),
                count: 3,
            },
            Author {
                name: "renovate[bot]".to_string(),
                count: 1,
            },
        ];
        let repo = UpdatedRepo::new(
            RepoId::from("platform/gateway"),
            "acme",
            "gateway",
            "ff4f0fa",
            "ccb7d01",
            &authors,
        );

        assert_eq!(
            updated_lines(&repo),
            vec![
                "platform/gateway https://github.com/acme/gateway/compare/ff4f0fa...ccb7d01",
                "       3 Ada",
                "       1 renovate[bot]",
            ]
        );
    }
}
