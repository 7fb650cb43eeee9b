//! In-memory documents served by the document MCP server.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DocError {
    #[error("Doc with id {0} not found")]
    NotFound(String),
}

const SEED_DOCUMENTS: &[(&str, &str)] = &[
    (
        "deposition.md",
        "This deposition covers the testimony of Angela Smith, P.E.",
    ),
    (
        "report.pdf",
        "The report details the state of a 20m condenser tower.",
    ),
    (
        "financials.docx",
        "These financials outline the project's budget and expenditures.",
    ),
    (
        "outlook.pdf",
        "This document presents the projected future performance of the system.",
    ),
    (
        "plan.md",
        "The plan outlines the steps for the project's implementation.",
    ),
    (
        "spec.txt",
        "These specifications define the technical requirements for the equipment.",
    ),
];

/// Documents keyed by id, kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStore {
    docs: Vec<(String, String)>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl DocumentStore {
    pub fn new(docs: Vec<(String, String)>) -> Self {
        Self { docs }
    }

    pub fn seeded() -> Self {
        Self::new(
            SEED_DOCUMENTS
                .iter()
                .map(|(id, content)| (id.to_string(), content.to_string()))
                .collect(),
        )
    }

    pub fn ids(&self) -> Vec<&str> {
        self.docs.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn read(&self, doc_id: &str) -> Result<&str, DocError> {
        self.docs
            .iter()
            .find(|(id, _)| id == doc_id)
            .map(|(_, content)| content.as_str())
            .ok_or_else(|| DocError::NotFound(doc_id.to_string()))
    }

    /// Replaces every occurrence of `old_str` in the document.
    pub fn edit(&mut self, doc_id: &str, old_str: &str, new_str: &str) -> Result<(), DocError> {
        let (_, content) = self
            .docs
            .iter_mut()
            .find(|(id, _)| id == doc_id)
            .ok_or_else(|| DocError::NotFound(doc_id.to_string()))?;
        *content = content.replace(old_str, new_str);
        Ok(())
    }
}

pub fn format_prompt(doc_id: &str) -> String {
    format!(
        r#"
    I want you to reformat a document to be written with markdown syntax.

    The id of the document you need to reformat is:
    <document_id>
    {doc_id}
    </document_id>

    Add in headers, bullet points, tables, etc as necessary. Feel free to add in extra text, but don't change the meaning of the report.
    Use the 'edit_document' tool to edit the document. After the document has been edited, respond with the final version of the doc. Don't explain your changes.
    "#
    )
}

pub fn summarize_prompt(doc_id: &str) -> String {
    format!(
        r#"
    Your goal is to summarize the contents of a document.

    The id of the document you need to summarize is:
    <document_id>
    {doc_id}
    </document_id>

    Use the 'read_doc_contents' tool to read the document. Respond with a short summary of a few sentences and nothing else.
    "#
    )
}
