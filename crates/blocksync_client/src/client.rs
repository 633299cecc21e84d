//! The remote API client.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method, ReqwestClient};
use crate::limiter::RateLimiter;
use blocksync_model::wire::{self, block_type, has_children, object_id};
use blocksync_model::{
    Block, BlockKind, DocumentTree, ObjectType, ParentRef, PropertyMap, RemoteDocument,
};
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a title lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleScope<'a> {
    /// Rows of a database, matched on the named title property.
    Database {
        /// Database id.
        database_id: &'a str,
        /// Name of the database's title property.
        property: &'a str,
    },
    /// Direct sub-pages of a page.
    Page(&'a str),
    /// Any page the integration can see.
    Workspace,
}

/// Paginated, rate-limited client for the remote block API.
///
/// Every call is blocking and throttled to the configured minimum
/// interval. A 429 response is retried once after the server's
/// `Retry-After` delay; a second 429 fails with
/// [`ClientError::Throttled`]. No other failure is retried.
pub struct RemoteClient<C: HttpClient> {
    config: ClientConfig,
    http: C,
    limiter: RateLimiter,
}

impl RemoteClient<ReqwestClient> {
    /// Creates a client that talks to the network.
    pub fn connect(config: ClientConfig) -> ClientResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::Unauthorized);
        }
        let http = ReqwestClient::new(config.timeout)?;
        Ok(Self::new(config, http))
    }
}

impl<C: HttpClient> RemoteClient<C> {
    /// Creates a client over the given transport.
    pub fn new(config: ClientConfig, http: C) -> Self {
        let limiter = RateLimiter::new(config.min_request_interval);
        Self {
            config,
            http,
            limiter,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn http(&self) -> &C {
        &self.http
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetches page metadata. Archived pages are reported as not found.
    pub fn get_document(&self, id: &str) -> ClientResult<RemoteDocument> {
        let value = self.call(Method::Get, &format!("pages/{id}"), None)?;
        let document = wire::decode_document(&value)?;
        if document.archived {
            return Err(ClientError::NotFound(format!("page {id} is archived")));
        }
        Ok(document)
    }

    /// Fetches database metadata.
    pub fn get_database(&self, id: &str) -> ClientResult<RemoteDocument> {
        let value = self.call(Method::Get, &format!("databases/{id}"), None)?;
        Ok(wire::decode_document(&value)?)
    }

    /// Fetches the children of a block or page.
    ///
    /// All pages of the listing are aggregated before returning. Blocks
    /// with children get them populated down to `max_depth` further
    /// levels; beyond that they keep `has_children` but no `children`.
    /// Table rows are always fetched, and child pages and databases are
    /// never entered.
    pub fn get_children(&self, block_id: &str, max_depth: usize) -> ClientResult<Vec<Block>> {
        let raw = self.list_children(block_id)?;
        let mut blocks = Vec::with_capacity(raw.len());
        for value in &raw {
            blocks.push(self.build_block(value, max_depth)?);
        }
        Ok(blocks)
    }

    /// Fetches a document's metadata and its full block tree.
    pub fn fetch_document(&self, id: &str) -> ClientResult<DocumentTree> {
        let document = self.get_document(id)?;
        let blocks = self.get_children(&document.id, self.config.max_depth)?;
        let tree = DocumentTree { document, blocks };
        debug!(
            page = %tree.document.id,
            blocks = tree.block_count(),
            "fetched document tree"
        );
        Ok(tree)
    }

    /// Searches pages and databases by text.
    pub fn search(
        &self,
        query: &str,
        filter: Option<ObjectType>,
    ) -> ClientResult<Vec<RemoteDocument>> {
        let results = self.paginate(|cursor| {
            let mut body = json!({ "query": query, "page_size": self.config.page_size });
            if let Some(kind) = filter {
                body["filter"] = json!({ "property": "object", "value": kind.as_str() });
            }
            if let Some(cursor) = cursor {
                body["start_cursor"] = json!(cursor);
            }
            self.call(Method::Post, "search", Some(&body))
        })?;
        decode_documents(&results)
    }

    /// Lists the rows of a database, optionally filtered.
    pub fn query_database(
        &self,
        database_id: &str,
        filter: Option<&Value>,
    ) -> ClientResult<Vec<RemoteDocument>> {
        let path = format!("databases/{database_id}/query");
        let results = self.paginate(|cursor| {
            let mut body = json!({ "page_size": self.config.page_size });
            if let Some(filter) = filter {
                body["filter"] = filter.clone();
            }
            if let Some(cursor) = cursor {
                body["start_cursor"] = json!(cursor);
            }
            self.call(Method::Post, &path, Some(&body))
        })?;
        decode_documents(&results)
    }

    /// Finds a live document whose trimmed title equals `title`.
    pub fn find_document_by_title(
        &self,
        title: &str,
        scope: TitleScope<'_>,
    ) -> ClientResult<Option<RemoteDocument>> {
        let wanted = title.trim();
        let candidates = match scope {
            TitleScope::Database {
                database_id,
                property,
            } => {
                let filter = json!({ "property": property, "title": { "equals": wanted } });
                self.query_database(database_id, Some(&filter))?
            }
            TitleScope::Page(_) | TitleScope::Workspace => {
                self.search(wanted, Some(ObjectType::Page))?
            }
        };
        Ok(candidates.into_iter().find(|doc| {
            let in_scope = match scope {
                TitleScope::Database { database_id, .. } => doc.parent.is_database(database_id),
                TitleScope::Page(page_id) => doc.parent.is_page(page_id),
                TitleScope::Workspace => true,
            };
            in_scope && !doc.archived && doc.title.trim() == wanted
        }))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Creates a document with initial content.
    ///
    /// The create request carries the first batch of blocks; the rest are
    /// appended in order with [`append_blocks`](Self::append_blocks).
    pub fn create_document(
        &self,
        parent: &ParentRef,
        properties: PropertyMap,
        blocks: &[Block],
    ) -> ClientResult<RemoteDocument> {
        let encoded = encode_writable(blocks);
        let split = encoded.len().min(self.config.max_batch_size);
        let (first, rest) = encoded.split_at(split);

        let body = json!({
            "parent": parent.to_wire(),
            "properties": properties.into_value(),
            "children": first,
        });
        let value = self.call(Method::Post, "pages", Some(&body))?;
        let document = wire::decode_document(&value)?;
        info!(page = %document.id, blocks = encoded.len(), "created document");

        if !rest.is_empty() {
            self.append_encoded(&document.id, rest)?;
        }
        Ok(document)
    }

    /// Replaces property values of a page.
    pub fn update_properties(
        &self,
        id: &str,
        properties: PropertyMap,
    ) -> ClientResult<RemoteDocument> {
        let body = json!({ "properties": properties.into_value() });
        let value = self.call(Method::Patch, &format!("pages/{id}"), Some(&body))?;
        Ok(wire::decode_document(&value)?)
    }

    /// Appends blocks in order, in batches of at most the configured size.
    ///
    /// Returns the number of top-level blocks written. A failing batch
    /// stops the append and is reported as [`ClientError::BatchFailed`];
    /// earlier batches stay written.
    pub fn append_blocks(&self, id: &str, blocks: &[Block]) -> ClientResult<usize> {
        self.append_encoded(id, &encode_writable(blocks))
    }

    /// Archives one block.
    pub fn delete_block(&self, id: &str) -> ClientResult<()> {
        self.call(Method::Delete, &format!("blocks/{id}"), None)?;
        Ok(())
    }

    /// Deletes every direct child of a page.
    ///
    /// Individual delete failures are logged and skipped. Returns the
    /// number of blocks actually deleted.
    pub fn clear_content(&self, id: &str) -> ClientResult<usize> {
        let children = self.list_children(id)?;
        let mut deleted = 0;
        for child in &children {
            let Some(child_id) = object_id(child) else {
                continue;
            };
            match self.delete_block(child_id) {
                Ok(()) => deleted += 1,
                Err(e) => warn!(block = %child_id, error = %e, "failed to delete block"),
            }
        }
        debug!(page = %id, deleted, total = children.len(), "cleared content");
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn append_encoded(&self, id: &str, encoded: &[Value]) -> ClientResult<usize> {
        let path = format!("blocks/{id}/children");
        let mut written = 0;
        for (batch_index, batch) in encoded.chunks(self.config.max_batch_size).enumerate() {
            debug!(block = %id, batch_index, size = batch.len(), "appending batch");
            let body = json!({ "children": batch });
            if let Err(source) = self.call(Method::Patch, &path, Some(&body)) {
                return Err(ClientError::BatchFailed {
                    batch_index,
                    blocks_written: written,
                    source: Box::new(source),
                });
            }
            written += batch.len();
        }
        Ok(written)
    }

    fn list_children(&self, block_id: &str) -> ClientResult<Vec<Value>> {
        self.paginate(|cursor| {
            let mut path = format!(
                "blocks/{block_id}/children?page_size={}",
                self.config.page_size
            );
            if let Some(cursor) = cursor {
                path.push_str("&start_cursor=");
                path.push_str(cursor);
            }
            self.call(Method::Get, &path, None)
        })
    }

    fn build_block(&self, value: &Value, max_depth: usize) -> ClientResult<Block> {
        let kind = block_type(value);
        let id = object_id(value).filter(|_| has_children(value));

        if kind == "table" {
            let rows = match id {
                Some(id) => self
                    .list_children(id)?
                    .iter()
                    .filter(|row| block_type(row) == "table_row")
                    .map(wire::decode_table_row)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            return Ok(wire::decode_table(value, rows)?);
        }

        let enter = max_depth > 0 && !matches!(kind, "child_page" | "child_database");
        let children = match id {
            Some(id) if enter => Some(self.get_children(id, max_depth - 1)?),
            _ => None,
        };
        let block = wire::decode_block(value, children)?;
        if let BlockKind::Unsupported { raw_type } = &block.kind {
            warn!(block_type = %raw_type, "unsupported block type");
        }
        Ok(block)
    }

    fn paginate<F>(&self, mut fetch: F) -> ClientResult<Vec<Value>>
    where
        F: FnMut(Option<&str>) -> ClientResult<Value>,
    {
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut page = fetch(cursor.as_deref())?;
            if let Some(Value::Array(items)) = page.get_mut("results").map(Value::take) {
                results.extend(items);
            }
            let has_more = page
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            match page.get("next_cursor").and_then(Value::as_str) {
                Some(next) if has_more => cursor = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(results)
    }

    fn call(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let request = HttpRequest {
            method,
            url: format!("{}/{}", self.config.base_url, path),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                ),
                ("Notion-Version".to_string(), self.config.api_version.clone()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: body.map(Value::to_string),
        };

        let mut response = self.send(&request)?;
        if response.status == 429 {
            let delay = response
                .retry_after()
                .unwrap_or(Duration::from_secs(1))
                .min(self.config.max_retry_delay);
            warn!(path, ?delay, "rate limited, retrying once");
            thread::sleep(delay);
            response = self.send(&request)?;
            if response.status == 429 {
                return Err(ClientError::Throttled {
                    retry_after: response.retry_after().unwrap_or(delay),
                });
            }
        }
        into_result(path, response)
    }

    fn send(&self, request: &HttpRequest) -> ClientResult<HttpResponse> {
        self.limiter.wait();
        debug!(method = request.method.as_str(), url = %request.url, "request");
        self.http
            .execute(request)
            .map_err(ClientError::transport_retryable)
    }
}

fn into_result(path: &str, response: HttpResponse) -> ClientResult<Value> {
    if response.is_success() {
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(&response.body).map_err(|e| ClientError::Decode(e.to_string()));
    }

    let error: Value = serde_json::from_str(&response.body).unwrap_or(Value::Null);
    let field = |key: &str| {
        error
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    match response.status {
        401 => Err(ClientError::Unauthorized),
        404 => Err(ClientError::NotFound(path.to_string())),
        status => Err(ClientError::Api {
            status,
            code: field("code"),
            message: field("message"),
        }),
    }
}

/// Encodes blocks for a write, warning about top-level blocks the API
/// cannot create.
fn encode_writable(blocks: &[Block]) -> Vec<Value> {
    let encoded = wire::encode_blocks(blocks);
    if encoded.len() < blocks.len() {
        let skipped: Vec<&str> = blocks
            .iter()
            .filter(|b| {
                matches!(
                    b.kind,
                    BlockKind::ChildPage { .. }
                        | BlockKind::ChildDatabase { .. }
                        | BlockKind::Unsupported { .. }
                )
            })
            .map(|b| b.kind.type_name())
            .collect();
        warn!(
            skipped = blocks.len() - encoded.len(),
            types = ?skipped,
            "blocks skipped on write"
        );
    }
    encoded
}

fn decode_documents(values: &[Value]) -> ClientResult<Vec<RemoteDocument>> {
    values
        .iter()
        .map(|value| wire::decode_document(value).map_err(ClientError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses_map_to_variants() {
        let err = into_result("pages/x", HttpResponse::json(401, "{}")).unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));

        let err = into_result("pages/x", HttpResponse::json(404, "{}")).unwrap_err();
        assert!(err.is_not_found());

        let body = r#"{"object":"error","code":"validation_error","message":"bad"}"#;
        let err = into_result("pages", HttpResponse::json(400, body)).unwrap_err();
        match err {
            ClientError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "validation_error");
                assert_eq!(message, "bad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_success_body_is_null() {
        assert_eq!(
            into_result("blocks/x", HttpResponse::json(200, "")).unwrap(),
            Value::Null
        );
        assert!(matches!(
            into_result("blocks/x", HttpResponse::json(200, "not json")),
            Err(ClientError::Decode(_))
        ));
    }
}
