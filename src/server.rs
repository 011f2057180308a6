//! MCP server exposing the browser operations as tools.

use crate::browser::DocBrowser;
use crate::types::{ContentItem, DocumentPayload};
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars::{self, JsonSchema, generate::SchemaSettings},
    tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

/// Parameters for list_directory tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListDirectoryRequest {
    /// Directory relative to the docs root; omit or leave empty for the root
    #[serde(default)]
    pub path: Option<String>,
    /// Bypass the cache and fetch the listing again
    #[serde(default)]
    pub refresh: bool,
}

/// Parameters for read_document tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadDocumentRequest {
    /// Document path, with or without the `.md` extension
    pub path: String,
    /// Bypass the cache and fetch the document again
    #[serde(default)]
    pub refresh: bool,
}

/// Parameters for search_docs tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchDocsRequest {
    /// Case-insensitive term matched against titles and previews
    pub query: String,
    /// Maximum number of results (defaults to the configured limit)
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Parameters for related_docs tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RelatedDocsRequest {
    /// Document to find neighbours for
    pub path: String,
    /// Maximum number of results (defaults to the configured limit)
    #[serde(default)]
    pub limit: Option<usize>,
    /// Recompute instead of using a cached ranking
    #[serde(default)]
    pub refresh: bool,
}

/// Which cache to clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CacheComponent {
    #[default]
    All,
    Structure,
    Document,
    Related,
}

/// Parameters for clear_caches tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClearCachesRequest {
    #[serde(default)]
    pub component: CacheComponent,
    /// Clear only this path; ignored when `component` is `all`
    #[serde(default)]
    pub path: Option<String>,
}

/// MCP server for a Markdown documentation tree
#[derive(Clone)]
pub struct DocServer {
    browser: Arc<DocBrowser>,

    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for DocServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocServer")
            .field("browser", &self.browser)
            .finish()
    }
}

#[tool_router]
impl DocServer {
    pub fn new(browser: Arc<DocBrowser>) -> Self {
        Self {
            browser,
            tool_router: Self::tool_router(),
        }
    }

    pub fn browser(&self) -> &Arc<DocBrowser> {
        &self.browser
    }

    #[tool(
        description = "List one directory of the documentation tree. Directories come first, then files, each with its path and any front-matter title and tags."
    )]
    async fn list_directory(
        &self,
        Parameters(request): Parameters<ListDirectoryRequest>,
    ) -> std::result::Result<String, String> {
        let dir = request.path.as_deref().unwrap_or("");
        let listing = self
            .browser
            .structure()
            .get_directory(dir, request.refresh)
            .await
            .map_err(error_chain)?;

        Ok(format_listing(dir, &listing))
    }

    #[tool(
        description = "Read a Markdown document. Returns its title, tags, heading outline and body. The `.md` extension is optional."
    )]
    async fn read_document(
        &self,
        Parameters(request): Parameters<ReadDocumentRequest>,
    ) -> std::result::Result<String, String> {
        let document = self
            .browser
            .documents()
            .get_document(&request.path, request.refresh)
            .await
            .map_err(error_chain)?;

        Ok(format_document(&document))
    }

    #[tool(
        description = "Search document titles and previews for a term. Title matches rank above preview matches. Builds the search index on first use."
    )]
    async fn search_docs(
        &self,
        Parameters(request): Parameters<SearchDocsRequest>,
    ) -> std::result::Result<String, String> {
        let index = self.browser.index();
        if !index.is_ready() {
            index.rebuild().await.map_err(error_chain)?;
        }

        let limit = request
            .limit
            .unwrap_or(self.browser.config().search_max_results);
        let results = index.search_with_limit(&request.query, limit);
        to_json(&results)
    }

    #[tool(
        description = "Find documents related to one document. Documents in the same directory rank above those one level up; shared tags add to the score."
    )]
    async fn related_docs(
        &self,
        Parameters(request): Parameters<RelatedDocsRequest>,
    ) -> std::result::Result<String, String> {
        let related = self
            .browser
            .related()
            .get_related(&request.path, request.limit, request.refresh)
            .await
            .map_err(error_chain)?;

        if related.is_empty() {
            return Ok(format!("No related documents found for '{}'", request.path));
        }
        to_json(&related)
    }

    #[tool(
        description = "Rebuild the search index from the current documentation tree. Reports how many documents were indexed and which failed."
    )]
    async fn rebuild_index(&self) -> std::result::Result<String, String> {
        let report = self.browser.index().rebuild().await.map_err(error_chain)?;
        to_json(&report)
    }

    #[tool(
        description = "Clear cached directory listings, documents and related-document rankings, or just one component. Optionally limited to a single path.",
        input_schema = inline_schema_for_type::<ClearCachesRequest>()
    )]
    async fn clear_caches(
        &self,
        Parameters(request): Parameters<ClearCachesRequest>,
    ) -> std::result::Result<String, String> {
        let path = request.path.as_deref();
        match request.component {
            CacheComponent::All => self.browser.clear_all_caches(),
            CacheComponent::Structure => self.browser.structure().clear_cache(path),
            CacheComponent::Document => self.browser.documents().clear_cache(path),
            CacheComponent::Related => self.browser.related().clear_cache(path),
        }

        Ok(match (request.component, path) {
            (CacheComponent::All, _) | (_, None) => format!("Cleared {:?} cache", request.component),
            (component, Some(path)) => format!("Cleared {:?} cache for '{}'", component, path),
        })
    }
}

#[tool_handler]
impl ServerHandler for DocServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "docshelf: browse a tree of Markdown documents. \
                 Use list_directory to explore, read_document to read, \
                 search_docs to find documents by title or content, \
                 and related_docs to find neighbours of a document.",
            )
    }
}

/// Render an error with its source chain: `outer: inner: root`.
fn error_chain(error: impl std::error::Error + Send + Sync + 'static) -> String {
    format!("{:#}", anyhow::Error::new(error))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> std::result::Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize response: {}", e))
}

fn format_listing(dir: &str, listing: &[ContentItem]) -> String {
    let dir = crate::path::normalize(dir);
    let mut output = format!("/{} ({} entries)\n", dir, listing.len());

    for item in listing {
        if item.is_directory {
            let _ = writeln!(output, "  {}/", item.path);
            continue;
        }
        let _ = write!(output, "  {}", item.path);
        if let Some(title) = &item.metadata.title {
            let _ = write!(output, " - {}", title);
        }
        if !item.metadata.tags.is_empty() {
            let _ = write!(output, " [{}]", item.metadata.tags.join(", "));
        }
        output.push('\n');
    }
    output
}

fn format_document(document: &DocumentPayload) -> String {
    let mut output = format!("# {}\n", document.title());
    let _ = writeln!(output, "path: {}", document.path);
    if !document.metadata.tags.is_empty() {
        let _ = writeln!(output, "tags: {}", document.metadata.tags.join(", "));
    }
    if !document.metadata.categories.is_empty() {
        let _ = writeln!(output, "categories: {}", document.metadata.categories.join(", "));
    }

    if !document.headings.is_empty() {
        output.push_str("\nOutline:\n");
        for heading in &document.headings {
            let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
            let _ = writeln!(output, "{}- {} (#{})", indent, heading.text, heading.id);
        }
    }

    output.push_str("\n---\n\n");
    output.push_str(&document.body);
    output
}

/// Inline JSON schema for a tool's parameters.
///
/// Used by `clear_caches`, whose `component` is a [`CacheComponent`] enum. With
/// `inline_subschemas` set the enum is emitted in place rather than as a `$ref`,
/// so clients can offer the cache names as choices. Schema serialization of a
/// derived `JsonSchema` type cannot fail.
pub fn inline_schema_for_type<T: JsonSchema>() -> Arc<JsonObject> {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let object = serde_json::to_value(schema).expect("failed to serialize schema");

    let json_object = match object {
        serde_json::Value::Object(object) => object,
        _ => panic!("Schema serialization produced non-object value"),
    };

    Arc::new(json_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Heading, Metadata};
    use assert2::check;

    #[test]
    fn test_format_document_includes_outline() {
        let document = DocumentPayload {
            path: "guide/install.md".to_string(),
            name: "install.md".to_string(),
            body: "# Install\n\nRun it.".to_string(),
            metadata: Metadata {
                title: Some("Install Guide".to_string()),
                tags: vec!["setup".to_string()],
                ..Metadata::default()
            },
            headings: vec![Heading {
                level: 2,
                text: "Steps".to_string(),
                id: "steps".to_string(),
            }],
        };

        let output = format_document(&document);
        check!(output.starts_with("# Install Guide\n"));
        check!(output.contains("tags: setup"));
        check!(output.contains("  - Steps (#steps)"));
        check!(output.ends_with("Run it."));
    }

    #[test]
    fn test_format_listing_marks_directories() {
        let listing = vec![
            ContentItem::directory("api", "guide/api"),
            ContentItem::file("faq.md", "guide/faq.md"),
        ];
        let output = format_listing("/guide/", &listing);
        check!(output == "/guide (2 entries)\n  guide/api/\n  guide/faq.md\n");
    }

    #[test]
    fn test_clear_request_defaults_to_all() {
        let request: ClearCachesRequest = serde_json::from_str("{}").unwrap();
        check!(request.component == CacheComponent::All);
        check!(request.path.is_none());
    }

    #[test]
    fn test_inline_schema_has_no_refs() {
        let schema = inline_schema_for_type::<ClearCachesRequest>();
        let rendered = serde_json::to_string(&schema).unwrap();
        check!(!rendered.contains("$ref"));
        check!(rendered.contains("structure"));
    }
}
