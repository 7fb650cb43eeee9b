//! Line-oriented terminal front end for [`CliChat`].

use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::CliChat;
use crate::error::AppError;
use crate::llm::LanguageModel;
use crate::mcp::{McpService, PromptInfo};

const PROMPT: &str = "> ";

/// Suggestions for `/command` and `@document` input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Completer {
    commands: Vec<PromptInfo>,
    doc_ids: Vec<String>,
}

impl Completer {
    pub fn new(commands: Vec<PromptInfo>, doc_ids: Vec<String>) -> Self {
        Self { commands, doc_ids }
    }

    pub fn doc_ids(&self) -> &[String] {
        &self.doc_ids
    }

    /// `/name - description` lines for every available prompt.
    pub fn command_help(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|prompt| match &prompt.description {
                Some(description) => format!("/{} - {}", prompt.name, description),
                None => format!("/{}", prompt.name),
            })
            .collect()
    }

    /// Candidates for the word being typed at the end of `line`.
    pub fn complete(&self, line: &str) -> Vec<String> {
        if let Some(rest) = line.strip_prefix('/') {
            return match rest.split_once(' ') {
                None => self
                    .commands
                    .iter()
                    .filter(|prompt| prompt.name.starts_with(rest))
                    .map(|prompt| format!("/{}", prompt.name))
                    .collect(),
                Some((_, partial)) => self.matching_docs(partial.trim_start()).collect(),
            };
        }

        let last_word = line.rsplit(' ').next().unwrap_or_default();
        match last_word.strip_prefix('@') {
            Some(partial) => self.matching_docs(partial).map(|id| format!("@{id}")).collect(),
            None => Vec::new(),
        }
    }

    fn matching_docs<'a>(&'a self, partial: &'a str) -> impl Iterator<Item = String> + 'a {
        self.doc_ids
            .iter()
            .filter(move |id| id.starts_with(partial))
            .cloned()
    }

    /// Suggestions to show instead of sending `line`, if `line` ends in an
    /// incomplete `@mention` or is a bare `/`.
    pub fn suggestions_for(&self, line: &str) -> Option<Vec<String>> {
        if line == "/" {
            return Some(self.command_help());
        }
        let last_word = line.split_whitespace().last()?;
        let partial = last_word.strip_prefix('@')?;
        if self.doc_ids.iter().any(|id| id == partial) {
            return None;
        }
        let matches = self.complete(line.trim_end());
        (!matches.is_empty()).then_some(matches)
    }
}

pub struct CliApp<C, L> {
    chat: CliChat<C, L>,
    completer: Completer,
}

impl<C, L> CliApp<C, L>
where
    C: McpService,
    L: LanguageModel,
{
    pub fn new(chat: CliChat<C, L>) -> Self {
        Self {
            chat,
            completer: Completer::default(),
        }
    }

    pub fn completer(&self) -> &Completer {
        &self.completer
    }

    /// Loads the document ids and prompt commands used for suggestions.
    pub async fn initialize(&mut self) -> Result<(), AppError> {
        let doc_ids = self.chat.list_docs_ids().await.map_err(AppError::Mcp)?;
        let prompts = self.chat.list_prompts().await.map_err(AppError::Mcp)?;
        info!(documents = doc_ids.len(), prompts = prompts.len(), "CLI initialized");
        self.completer = Completer::new(prompts, doc_ids);
        Ok(())
    }

    /// Runs the interactive loop until EOF, `exit`, or Ctrl-C. Ctrl-C ends
    /// the loop normally, even in the middle of a query.
    pub async fn run_with<R, W>(&mut self, input: R, output: &mut W) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Unable to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(input, output, ctrl_c).await
    }

    /// Runs the loop until input ends or `interrupt` resolves. An interrupt
    /// abandons any pending read or query and returns `Ok`.
    pub async fn run_until<R, W, I>(
        &mut self,
        input: R,
        output: &mut W,
        interrupt: I,
    ) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        I: Future<Output = ()>,
    {
        tokio::select! {
            result = self.repl(input, output) => result,
            () = interrupt => {
                debug!("Interrupted; leaving chat loop");
                Ok(())
            }
        }
    }

    async fn repl<R, W>(&mut self, input: R, output: &mut W) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\n").await?;
                output.flush().await?;
                return Ok(());
            };
            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if matches!(query, "exit" | "quit") {
                return Ok(());
            }

            if let Some(suggestions) = self.completer.suggestions_for(query) {
                for suggestion in suggestions {
                    output.write_all(format!("  {suggestion}\n").as_bytes()).await?;
                }
                continue;
            }

            let (interim_tx, mut interim_rx) = mpsc::unbounded_channel::<String>();
            let chat = &mut self.chat;
            let turn = async move {
                chat.run(query, |text| {
                    let _ = interim_tx.send(text.to_string());
                })
                .await
            };
            let echo = async {
                while let Some(text) = interim_rx.recv().await {
                    output.write_all(format!("{text}\n").as_bytes()).await?;
                    output.flush().await?;
                }
                Ok::<_, std::io::Error>(())
            };
            let (answer, echoed) = tokio::join!(turn, echo);
            echoed?;
            let answer = answer.map_err(AppError::Llm)?;
            output
                .write_all(format!("\nResponse:\n{answer}\n").as_bytes())
                .await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::test_support::{final_text, tool_request, FakeClient, ScriptedModel};
    use crate::core::registry::{ClientRegistry, DOC_CLIENT_KEY};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::io::BufReader;

    fn prompt(name: &str, description: Option<&str>) -> PromptInfo {
        PromptInfo {
            name: name.to_string(),
            description: description.map(str::to_string),
            arguments: vec!["doc_id".to_string()],
        }
    }

    fn completer() -> Completer {
        Completer::new(
            vec![
                prompt("format", Some("Rewrites a document in markdown")),
                prompt("summarize", None),
            ],
            vec![
                "report.pdf".to_string(),
                "plan.md".to_string(),
                "outlook.pdf".to_string(),
            ],
        )
    }

    fn app(doc: FakeClient, responses: Vec<crate::api::MessagesResponse>) -> CliApp<FakeClient, ScriptedModel> {
        let doc = Arc::new(doc);
        let mut clients = ClientRegistry::new();
        clients.insert(DOC_CLIENT_KEY, doc.clone()).unwrap();
        let model = Arc::new(ScriptedModel::new(responses));
        CliApp::new(CliChat::new(doc, clients, model))
    }

    async fn drive(app: &mut CliApp<FakeClient, ScriptedModel>, input: &str) -> String {
        let mut output = Vec::new();
        app.run_with(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn completes_commands_and_mentions() {
        let completer = completer();
        assert_eq!(completer.complete("/f"), vec!["/format"]);
        assert_eq!(completer.complete("/"), vec!["/format", "/summarize"]);
        assert_eq!(completer.complete("/format p"), vec!["plan.md"]);
        assert_eq!(completer.complete("compare @re"), vec!["@report.pdf"]);
        assert_eq!(completer.complete("look at @"), vec!["@report.pdf", "@plan.md", "@outlook.pdf"]);
        assert!(completer.complete("plain text").is_empty());
    }

    #[test]
    fn suggestions_only_interrupt_incomplete_input() {
        let completer = completer();
        assert_eq!(
            completer.suggestions_for("/"),
            Some(vec![
                "/format - Rewrites a document in markdown".to_string(),
                "/summarize".to_string()
            ])
        );
        assert_eq!(
            completer.suggestions_for("what about @out"),
            Some(vec!["@outlook.pdf".to_string()])
        );
        assert_eq!(completer.suggestions_for("what about @outlook.pdf"), None);
        assert_eq!(completer.suggestions_for("what about @missing"), None);
        assert_eq!(completer.suggestions_for("hello"), None);
    }

    #[tokio::test]
    async fn initialize_loads_documents_and_prompts() {
        let doc = FakeClient::with_tools(&[])
            .with_docs(&[("plan.md", "The plan."), ("report.pdf", "The report.")])
            .with_prompt("format", &[("user", "Format it.")]);
        let mut app = app(doc, Vec::new());

        app.initialize().await.unwrap();

        assert_eq!(app.completer().doc_ids(), ["plan.md", "report.pdf"]);
        assert_eq!(app.completer().complete("/"), vec!["/format"]);
    }

    #[tokio::test]
    async fn answers_queries_until_exit() {
        let doc = FakeClient::with_tools(&["read_doc_contents"])
            .with_docs(&[("plan.md", "The plan.")])
            .responding("read_doc_contents", &["The plan."], false);
        let mut app = app(
            doc,
            vec![
                tool_request("Let me check.", "t1", "read_doc_contents", json!({"doc_id": "plan.md"})),
                final_text("It is a plan."),
            ],
        );
        app.initialize().await.unwrap();

        let output = drive(&mut app, "\n   \nwhat is plan.md?\nexit\nnever sent\n").await;

        assert_eq!(
            output,
            "> > > Let me check.\n\nResponse:\nIt is a plan.\n> "
        );
    }

    #[tokio::test]
    async fn end_of_input_stops_the_loop() {
        let mut app = app(FakeClient::with_tools(&[]), Vec::new());

        let output = drive(&mut app, "").await;

        assert_eq!(output, "> \n");
    }

    #[tokio::test]
    async fn bare_slash_lists_commands_without_calling_the_model() {
        let doc = FakeClient::with_tools(&[])
            .with_docs(&[])
            .with_prompt("summarize", &[("user", "Summarize it.")]);
        let mut app = app(doc, Vec::new());
        app.initialize().await.unwrap();

        let output = drive(&mut app, "/\nquit\n").await;

        assert_eq!(output, "> /summarize - summarize prompt\n> ");
    }

    #[tokio::test]
    async fn chat_failures_end_the_loop() {
        let mut app = app(FakeClient::with_tools(&[]), Vec::new());

        let mut output = Vec::new();
        let err = app
            .run_with("hello\n".as_bytes(), &mut output)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(message) if message == "no scripted response left"));
    }

    #[tokio::test]
    async fn interim_text_is_written_before_the_turn_finishes() {
        let doc = FakeClient::with_tools(&["read_doc_contents"])
            .with_docs(&[("plan.md", "The plan.")])
            .responding("read_doc_contents", &["The plan."], false);
        let mut app = app(
            doc,
            vec![tool_request("Let me check.", "t1", "read_doc_contents", json!({"doc_id": "plan.md"}))],
        );

        let mut output = Vec::new();
        let err = app
            .run_with("what is plan.md?\n".as_bytes(), &mut output)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(String::from_utf8(output).unwrap(), "> Let me check.\n");
    }

    #[tokio::test]
    async fn interrupt_ends_a_loop_blocked_on_input() {
        let mut app = app(FakeClient::with_tools(&[]), Vec::new());
        let (_writer, reader) = tokio::io::duplex(64);
        let interrupt = tokio::time::sleep(std::time::Duration::from_millis(20));

        let mut output = Vec::new();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            app.run_until(BufReader::new(reader), &mut output, interrupt),
        )
        .await
        .expect("interrupt ends the loop");

        assert!(result.is_ok());
        assert_eq!(String::from_utf8(output).unwrap(), "> ");
    }
}
