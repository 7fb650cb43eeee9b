use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::Chat;
use crate::api::{ChatMessage, ContentBlock, ROLE_ASSISTANT, ROLE_USER};
use crate::core::registry::ClientRegistry;
use crate::llm::LanguageModel;
use crate::mcp::{McpService, PromptInfo, PromptText, ResourceValue};

pub const DOCUMENTS_URI: &str = "docs://documents";

pub fn document_uri(doc_id: &str) -> String {
    format!("{DOCUMENTS_URI}/{doc_id}")
}

/// Chat session with `@document` mentions and `/prompt <doc_id>` commands
/// served by the document client.
pub struct CliChat<C, L> {
    doc_client: Arc<C>,
    chat: Chat<C, L>,
}

impl<C, L> CliChat<C, L>
where
    C: McpService,
    L: LanguageModel,
{
    /// `doc_client` is expected to also be present in `clients`.
    pub fn new(doc_client: Arc<C>, clients: ClientRegistry<C>, llm: Arc<L>) -> Self {
        Self {
            doc_client,
            chat: Chat::new(clients, llm),
        }
    }

    pub fn doc_client(&self) -> &Arc<C> {
        &self.doc_client
    }

    pub fn chat(&self) -> &Chat<C, L> {
        &self.chat
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptInfo>, String> {
        self.doc_client.list_prompts().await
    }

    pub async fn list_docs_ids(&self) -> Result<Vec<String>, String> {
        match self.doc_client.read_resource(DOCUMENTS_URI).await? {
            ResourceValue::Json(value) => serde_json::from_value(value)
                .map_err(|err| format!("Unexpected document list: {err}")),
            ResourceValue::Text(text) => Err(format!("Unexpected document list: {text}")),
        }
    }

    pub async fn get_doc_content(&self, doc_id: &str) -> Result<String, String> {
        self.doc_client
            .read_resource(&document_uri(doc_id))
            .await
            .map(|value| value.as_text())
    }

    /// Handles one line of user input and returns the model's final answer.
    pub async fn run<F>(&mut self, query: &str, on_interim: F) -> Result<String, String>
    where
        F: FnMut(&str),
    {
        self.process_query(query).await?;
        self.chat.complete(on_interim).await
    }

    async fn process_query(&mut self, query: &str) -> Result<(), String> {
        if self.process_command(query).await? {
            return Ok(());
        }
        let context = self.extract_resources(query).await?;
        self.chat
            .push_message(ChatMessage::user_text(build_user_prompt(query, &context)));
        Ok(())
    }

    /// Expands `/<prompt> <doc_id>` into the prompt's messages. Returns
    /// `false` when `query` is not a command.
    async fn process_command(&mut self, query: &str) -> Result<bool, String> {
        let Some(command) = parse_command(query) else {
            return Ok(false);
        };
        debug!(prompt = %command.name, doc_id = ?command.doc_id, "Running prompt command");

        let mut arguments = HashMap::new();
        if let Some(doc_id) = command.doc_id {
            arguments.insert("doc_id".to_string(), doc_id.to_string());
        }
        let messages = self.doc_client.get_prompt(command.name, arguments).await?;
        for message in messages {
            self.chat.push_message(prompt_to_message(message));
        }
        Ok(true)
    }

    async fn extract_resources(&self, query: &str) -> Result<String, String> {
        let mentions = extract_mentions(query);
        if mentions.is_empty() {
            return Ok(String::new());
        }

        let mut context = String::new();
        for doc_id in self.list_docs_ids().await? {
            if mentions.iter().any(|mention| *mention == doc_id) {
                let content = self.get_doc_content(&doc_id).await?;
                context.push_str(&format!(
                    "\n<document id=\"{doc_id}\">\n{content}\n</document>\n"
                ));
            }
        }
        Ok(context)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct PromptCommand<'a> {
    pub name: &'a str,
    pub doc_id: Option<&'a str>,
}

pub fn parse_command(query: &str) -> Option<PromptCommand<'_>> {
    if !query.starts_with('/') {
        return None;
    }
    let mut words = query.split_whitespace();
    let name = words.next()?.trim_start_matches('/');
    if name.is_empty() {
        return None;
    }
    Some(PromptCommand {
        name,
        doc_id: words.next(),
    })
}

/// Document ids mentioned as `@id` words, in order of appearance.
pub fn extract_mentions(query: &str) -> Vec<&str> {
    query
        .split_whitespace()
        .filter_map(|word| word.strip_prefix('@'))
        .filter(|id| !id.is_empty())
        .collect()
}

fn prompt_to_message(prompt: PromptText) -> ChatMessage {
    let role = if prompt.role == ROLE_ASSISTANT {
        ROLE_ASSISTANT
    } else {
        ROLE_USER
    };
    ChatMessage {
        role: role.to_string(),
        content: vec![ContentBlock::text(prompt.text)],
    }
}

pub fn build_user_prompt(query: &str, context: &str) -> String {
    format!(
        r#"
The user has a question:
<query>
{query}
</query>

The following context may be useful in answering their question:
<context>
{context}
</context>

Note the user's query might contain references to documents like "@report.docx". The "@" is only
included as a way of mentioning the doc. The actual name of the document would be "report.docx".
If the document content is included in this prompt, you don't need to use an additional tool to read the document.
Answer the user's question directly and concisely. Start with the exact information they need.
Don't refer to or mention the provided context in any way - just use it to inform your answer.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::test_support::{final_text, FakeClient, ScriptedModel};
    use crate::core::registry::{client_key, DOC_CLIENT_KEY};

    fn cli_chat(
        doc: FakeClient,
        responses: Vec<crate::api::MessagesResponse>,
    ) -> (CliChat<FakeClient, ScriptedModel>, Arc<ScriptedModel>) {
        let doc = Arc::new(doc);
        let mut clients = ClientRegistry::new();
        clients.insert(DOC_CLIENT_KEY, doc.clone()).unwrap();
        clients
            .insert(client_key(0, "extra.py"), Arc::new(FakeClient::with_tools(&[])))
            .unwrap();
        let model = Arc::new(ScriptedModel::new(responses));
        (CliChat::new(doc, clients, model.clone()), model)
    }

    fn sample_docs() -> FakeClient {
        FakeClient::with_tools(&["read_doc_contents"]).with_docs(&[
            ("report.pdf", "The report details the state of a 20m condenser tower."),
            ("plan.md", "The plan outlines the steps for the project's implementation."),
        ])
    }

    #[test]
    fn commands_need_a_leading_slash() {
        assert_eq!(parse_command("summarize plan.md"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(
            parse_command("/format plan.md extra"),
            Some(PromptCommand {
                name: "format",
                doc_id: Some("plan.md")
            })
        );
        assert_eq!(
            parse_command("/summarize"),
            Some(PromptCommand {
                name: "summarize",
                doc_id: None
            })
        );
    }

    #[test]
    fn mentions_strip_the_at_sign() {
        assert_eq!(
            extract_mentions("compare @report.pdf with @plan.md please @"),
            vec!["report.pdf", "plan.md"]
        );
        assert!(extract_mentions("no mentions here").is_empty());
    }

    #[tokio::test]
    async fn doc_client_is_shared_with_the_registry() {
        let (chat, _) = cli_chat(sample_docs(), Vec::new());
        let from_registry = chat.chat().clients().get(DOC_CLIENT_KEY).unwrap();
        assert!(Arc::ptr_eq(chat.doc_client(), from_registry));
        assert_eq!(chat.chat().clients().len(), 2);
    }

    #[tokio::test]
    async fn lists_document_ids_from_json_resource() {
        let (chat, _) = cli_chat(sample_docs(), Vec::new());
        assert_eq!(
            chat.list_docs_ids().await.unwrap(),
            vec!["report.pdf", "plan.md"]
        );
    }

    #[tokio::test]
    async fn mentioned_documents_are_inlined_into_the_prompt() {
        let (mut chat, model) = cli_chat(sample_docs(), vec![final_text("20 meters.")]);

        let answer = chat
            .run("How tall is the tower in @report.pdf?", |_| {})
            .await
            .unwrap();

        assert_eq!(answer, "20 meters.");
        let requests = model.requests();
        let request = &requests[0];
        let ContentBlock::Text { text } = &request.messages[0].content[0] else {
            panic!("expected text prompt");
        };
        assert!(text.contains("<query>\nHow tall is the tower in @report.pdf?\n</query>"));
        assert!(text.contains(
            "<document id=\"report.pdf\">\nThe report details the state of a 20m condenser tower.\n</document>"
        ));
        assert!(!text.contains("plan.md\">"));
        assert_eq!(
            chat.doc_client().resource_reads(),
            vec!["docs://documents", "docs://documents/report.pdf"]
        );
    }

    #[tokio::test]
    async fn queries_without_mentions_skip_resource_reads() {
        let (mut chat, _) = cli_chat(sample_docs(), vec![final_text("Hi.")]);

        chat.run("hello", |_| {}).await.unwrap();

        assert!(chat.doc_client().resource_reads().is_empty());
    }

    #[tokio::test]
    async fn slash_commands_expand_prompt_messages() {
        let doc = sample_docs().with_prompt(
            "format",
            &[("user", "Reformat plan.md as markdown.")],
        );
        let (mut chat, model) = cli_chat(doc, vec![final_text("# Plan")]);

        let answer = chat.run("/format plan.md", |_| {}).await.unwrap();

        assert_eq!(answer, "# Plan");
        let calls = chat.doc_client().prompt_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "format");
        assert_eq!(calls[0].1.get("doc_id").map(String::as_str), Some("plan.md"));

        let requests = model.requests();
        let request = &requests[0];
        assert_eq!(request.messages.len(), 1);
        assert_eq!(
            request.messages[0],
            ChatMessage::user_text("Reformat plan.md as markdown.")
        );
    }

    #[tokio::test]
    async fn unknown_prompt_command_is_an_error() {
        let (mut chat, model) = cli_chat(sample_docs(), vec![final_text("unused")]);

        let err = chat.run("/missing plan.md", |_| {}).await.unwrap_err();

        assert_eq!(err, "Unknown prompt: missing");
        assert!(model.requests().is_empty());
    }
}
