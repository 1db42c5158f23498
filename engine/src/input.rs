//! External input channel
//!
//! Where the planner's questions go and the user's answers come from.

use std::collections::VecDeque;

use async_trait::async_trait;
use sdk::errors::EngineError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};

/// Answer that aborts the run
pub const EXIT_COMMAND: &str = "exit";

/// Line-oriented question/answer channel
#[async_trait]
pub trait InputChannel: Send {
    /// Show `question` and wait for one line.
    ///
    /// Returns the line without its terminator, or `None` once the channel
    /// is closed.
    async fn ask(&mut self, question: &str) -> Result<Option<String>, EngineError>;
}

/// True when the answer asks to stop the run
pub fn is_exit(answer: &str) -> bool {
    answer.trim() == EXIT_COMMAND
}

/// Terminal input: questions go to stdout, answers come from stdin
pub struct StdinChannel {
    reader: BufReader<Stdin>,
}

impl StdinChannel {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }
}

impl Default for StdinChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InputChannel for StdinChannel {
    async fn ask(&mut self, question: &str) -> Result<Option<String>, EngineError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{}\n> ", question).as_bytes())
            .await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| EngineError::Input(format!("Failed to read answer: {}", e)))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Pre-recorded answers, for tests and non-interactive runs
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    questions: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
        }
    }

    /// Questions asked so far
    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

#[async_trait]
impl InputChannel for ScriptedInput {
    async fn ask(&mut self, question: &str) -> Result<Option<String>, EngineError> {
        self.questions.push(question.to_string());
        Ok(self.answers.pop_front())
    }
}
