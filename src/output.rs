//! JSON response types and formatting for CLI output.

use serde::Serialize;

use mnemograph::{Memory, MemoryLink};

/// Response for successful memory creation.
#[derive(Serialize)]
pub struct AddResponse {
    pub status: String,
    pub id: i64,
    pub uuid: String,
}

/// Response for search results.
#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
}

/// Individual search result item.
#[derive(Serialize)]
pub struct SearchResultItem {
    pub id: i64,
    pub uuid: String,
    pub title: String,
    pub content: String,
    pub score: Option<f64>,
    pub created_at: String,
}

impl From<&Memory> for SearchResultItem {
    fn from(memory: &Memory) -> Self {
        Self {
            id: memory.id,
            uuid: memory.uuid.clone(),
            title: memory.title.clone(),
            content: memory.content.clone(),
            score: memory.similarity,
            created_at: memory.created_at.clone(),
        }
    }
}

/// Response for retrieving a specific memory.
#[derive(Serialize)]
pub struct GetResponse {
    pub id: i64,
    pub uuid: String,
    pub title: String,
    pub content: String,
    pub content_type: String,
    pub source: String,
    pub tags: Vec<String>,
    pub outgoing_links: Vec<LinkItem>,
    pub backlinks: Vec<LinkItem>,
    pub created_at: String,
    pub updated_at: String,
}

/// A link as shown in CLI output.
#[derive(Serialize)]
pub struct LinkItem {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub link_type: String,
    pub weight: f64,
    pub description: String,
}

impl From<&MemoryLink> for LinkItem {
    fn from(link: &MemoryLink) -> Self {
        Self {
            id: link.id,
            source_id: link.source_id,
            target_id: link.target_id,
            link_type: link.link_type.clone(),
            weight: link.weight,
            description: link.description.clone(),
        }
    }
}

/// Response for listing memories.
#[derive(Serialize)]
pub struct ListResponse {
    pub memories: Vec<ListItem>,
}

/// Individual list item.
#[derive(Serialize)]
pub struct ListItem {
    pub id: i64,
    pub title: String,
    pub created_at: String,
}

/// Response for successful deletion.
#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: String,
    pub id: i64,
}

/// Response for successful update.
#[derive(Serialize)]
pub struct UpdateResponse {
    pub status: String,
    pub id: i64,
}

/// Response for link creation and update.
#[derive(Serialize)]
pub struct LinkResponse {
    pub status: String,
    pub link: LinkItem,
}

/// Response for tag attachment.
#[derive(Serialize)]
pub struct TagResponse {
    pub status: String,
    pub memory_id: i64,
    pub tag: String,
}

/// Print a value as pretty JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}
