use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::*,
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::meeting::{ActionItemFilter, ActionItemPatch};
use crate::search::{SearchRequest, SegmentSearchService};
use crate::store::MeetingStore;

const MEETING_LIST_URI: &str = "meetings://list";
const MEETING_URI_PREFIX: &str = "meetings://";

// Tool request/response types
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchSegmentsRequest {
    #[schemars(description = "Text to look for in meeting transcripts (at least 2 characters)")]
    pub q: String,
    #[schemars(description = "Maximum number of results (default: 50, max: 100)")]
    pub limit: Option<i64>,
    #[schemars(description = "Number of ranked results to skip (default: 0)")]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMeetingsRequest {
    #[schemars(description = "Maximum number of meetings (default: 20, max: 100)")]
    pub limit: Option<i64>,
    #[schemars(description = "Number of meetings to skip (default: 0)")]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetMeetingRequest {
    #[schemars(description = "Meeting id")]
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListActionItemsRequest {
    #[schemars(description = "Optional status filter: todo, in_progress or done")]
    pub status: Option<String>,
    #[schemars(description = "Optional title search")]
    pub q: Option<String>,
    #[schemars(description = "Maximum number of items (default: 50, max: 100)")]
    pub limit: Option<i64>,
    #[schemars(description = "Number of items to skip (default: 0)")]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateActionItemRequest {
    #[schemars(description = "Action item id")]
    pub id: i64,
    #[schemars(description = "New status: todo, in_progress or done")]
    pub status: Option<String>,
    #[schemars(description = "New owner")]
    pub owner: Option<String>,
    #[schemars(description = "New title")]
    pub title: Option<String>,
    #[schemars(description = "New due date (epoch milliseconds)")]
    pub due_date: Option<i64>,
    #[schemars(description = "Set to true to remove the due date")]
    pub clear_due_date: Option<bool>,
}

impl UpdateActionItemRequest {
    fn to_patch(&self) -> ActionItemPatch {
        let due_date = if self.clear_due_date.unwrap_or(false) {
            Some(None)
        } else {
            self.due_date.map(Some)
        };
        ActionItemPatch {
            status: self.status.clone(),
            owner: self.owner.clone(),
            title: self.title.clone(),
            due_date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeetingInsightsServer {
    pub store: Arc<MeetingStore>,
    pub search: Arc<SegmentSearchService<MeetingStore>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MeetingInsightsServer {
    pub fn new(store: Arc<MeetingStore>) -> Self {
        let search = Arc::new(SegmentSearchService::new(store.clone()));
        Self {
            store,
            search,
            tool_router: Self::tool_router(),
        }
    }

    fn _create_resource(&self, uri: &str, name: &str, description: &str) -> Resource {
        let mut resource = RawResource::new(uri, name.to_string());
        resource.description = Some(description.to_string());
        resource.mime_type = Some("application/json".to_string());
        resource.no_annotation()
    }

    #[tool(description = "Search meeting transcripts and return ranked snippets")]
    async fn search_segments(
        &self,
        Parameters(req): Parameters<SearchSegmentsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = match SearchRequest::new(&req.q, req.limit, req.offset) {
            Ok(request) => self.search.search(&request).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => Ok(json_result(&response)),
            Err(e) => {
                if e.is_caller_error() {
                    tracing::warn!("Search rejected for {:?}: {}", req.q, e);
                } else {
                    tracing::error!("Search error: {}", e);
                }
                Ok(error_result(&e.to_string(), e.code()))
            }
        }
    }

    #[tool(description = "List meetings, newest first, with their top topics")]
    async fn list_meetings(
        &self,
        Parameters(req): Parameters<ListMeetingsRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.store.list_meetings(req.limit, req.offset).await {
            Ok(page) => Ok(json_result(&page)),
            Err(e) => Ok(error_result(&e.to_string(), e.code())),
        }
    }

    #[tool(description = "Get a meeting with its transcript, topics, action items and highlights")]
    async fn get_meeting(
        &self,
        Parameters(req): Parameters<GetMeetingRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.store.get_meeting(req.id).await {
            Ok(meeting) => Ok(json_result(&meeting)),
            Err(e) => Ok(error_result(&e.to_string(), e.code())),
        }
    }

    #[tool(description = "List action items with optional status and title filters")]
    async fn list_action_items(
        &self,
        Parameters(req): Parameters<ListActionItemsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let filter = ActionItemFilter {
            status: req.status,
            q: req.q,
            limit: req.limit,
            offset: req.offset,
        };
        match self.store.list_action_items(&filter).await {
            Ok(page) => Ok(json_result(&page)),
            Err(e) => Ok(error_result(&e.to_string(), e.code())),
        }
    }

    #[tool(description = "Update the status, owner, title or due date of an action item")]
    async fn update_action_item(
        &self,
        Parameters(req): Parameters<UpdateActionItemRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.store.update_action_item(req.id, &req.to_patch()).await {
            Ok(item) => Ok(json_result(&item)),
            Err(e) => {
                tracing::warn!("Action item {} update rejected: {}", req.id, e);
                Ok(error_result(&e.to_string(), e.code()))
            }
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> CallToolResult {
    let content = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("Error serializing response: {e}"));
    CallToolResult::success(vec![Content::text(content)])
}

fn error_result(message: &str, code: &str) -> CallToolResult {
    let body = json!({ "error": message, "code": code });
    CallToolResult::error(vec![Content::text(body.to_string())])
}

impl MeetingInsightsServer {
    /// JSON body of `meetings://list` or `meetings://{id}`
    async fn resource_content(&self, uri: &str) -> Result<String, McpError> {
        let serialized = if uri == MEETING_LIST_URI {
            let page = self
                .store
                .list_meetings(None, None)
                .await
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            serde_json::to_string_pretty(&page)
        } else if let Some(id) = uri
            .strip_prefix(MEETING_URI_PREFIX)
            .and_then(|raw| raw.parse::<i64>().ok())
        {
            let meeting = self.store.get_meeting(id).await.map_err(|e| {
                McpError::resource_not_found(e.to_string(), Some(json!({ "uri": uri })))
            })?;
            serde_json::to_string_pretty(&meeting)
        } else {
            return Err(McpError::resource_not_found(
                format!("Unknown resource: {uri}"),
                Some(json!({ "uri": uri })),
            ));
        };

        serialized.map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[tool_handler]
impl ServerHandler for MeetingInsightsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some("Meeting insights server provides search over meeting transcripts, meeting summaries with topics and highlights, and action item tracking.".to_string()),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut resources = vec![self._create_resource(
            MEETING_LIST_URI,
            "Meetings",
            "Most recent meetings with their top topics",
        )];

        if let Ok(page) = self.store.list_meetings(None, None).await {
            for meeting in page.data {
                resources.push(self._create_resource(
                    &format!("{MEETING_URI_PREFIX}{}", meeting.id),
                    &format!("Meeting: {}", meeting.title),
                    "Full meeting record",
                ));
            }
        }

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let uri = request.uri;
        let content = self.resource_content(&uri).await?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(content, uri)],
        })
    }
}
