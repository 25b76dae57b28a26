//! Command handlers for the mnemograph CLI.

use std::process::ExitCode;

use mnemograph::{Error, MemoryEngine};

use crate::output::*;

/// Commands supported by the mnemograph CLI.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Store a new memory
    Add {
        /// Memory title
        title: String,

        /// Memory text content
        content: String,

        /// Content type tag
        #[arg(long, default_value = "text/plain")]
        content_type: String,

        /// Where the memory came from
        #[arg(short = 's', long, default_value = "")]
        source: String,

        /// Tags to attach, in order
        #[arg(short = 't', long)]
        tag: Vec<String>,
    },
    /// Retrieve memories for a query
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results (default: 10)
        #[arg(short = 'l', long, default_value = "10")]
        limit: usize,

        /// Precision-first retrieval via the vector index only
        #[arg(long)]
        precise: bool,
    },
    /// Show one memory with its links and tags
    Get {
        /// Memory id
        id: i64,
    },
    /// List all memories
    List,
    /// Replace a memory's title and content
    Update {
        /// Memory id
        id: i64,
        /// New title
        title: String,
        /// New content
        content: String,
        /// Content type tag
        #[arg(long, default_value = "text/plain")]
        content_type: String,
    },
    /// Delete a memory and its links
    Delete {
        /// Memory id
        id: i64,
    },
    /// Create a directed link between two memories
    Link {
        /// Source memory id
        source: i64,
        /// Target memory id
        target: i64,
        /// Relation label, e.g. "causes" or "explains"
        #[arg(short = 'r', long, default_value = "related")]
        link_type: String,
        /// Edge weight
        #[arg(short = 'w', long, default_value = "1.0")]
        weight: f64,
        /// Free-form description
        #[arg(short = 'd', long, default_value = "")]
        description: String,
    },
    /// Delete a link by id
    Unlink {
        /// Link id
        id: i64,
    },
    /// Attach a tag to a memory
    Tag {
        /// Memory id
        id: i64,
        /// Tag name
        name: String,
    },
    /// Emit a node/edge graph as JSON
    Graph {
        /// Restrict the graph to results for this query, expanded to
        /// direct neighbors; omit for the whole corpus
        #[arg(short = 'q', long)]
        query: Option<String>,
    },
}

/// Execute a CLI command.
pub fn execute(
    command: &Commands,
    engine: &mut MemoryEngine,
    json: bool,
) -> Result<ExitCode, Error> {
    match command {
        Commands::Add {
            title,
            content,
            content_type,
            source,
            tag,
        } => handle_add(engine, title, content, content_type, source, tag, json),
        Commands::Search {
            query,
            limit,
            precise,
        } => handle_search(engine, query, *limit, *precise, json),
        Commands::Get { id } => handle_get(engine, *id, json),
        Commands::List => handle_list(engine, json),
        Commands::Update {
            id,
            title,
            content,
            content_type,
        } => handle_update(engine, *id, title, content, content_type, json),
        Commands::Delete { id } => handle_delete(engine, *id, json),
        Commands::Link {
            source,
            target,
            link_type,
            weight,
            description,
        } => handle_link(engine, *source, *target, link_type, *weight, description, json),
        Commands::Unlink { id } => handle_unlink(engine, *id, json),
        Commands::Tag { id, name } => handle_tag(engine, *id, name, json),
        Commands::Graph { query } => handle_graph(engine, query.as_deref(), json),
    }
}

fn handle_add(
    engine: &mut MemoryEngine,
    title: &str,
    content: &str,
    content_type: &str,
    source: &str,
    tags: &[String],
    json: bool,
) -> Result<ExitCode, Error> {
    let memory = engine.create_memory(title, content, content_type, source)?;
    for tag in tags {
        engine.add_tag_to_memory(memory.id, tag)?;
    }

    if json {
        print_json(&AddResponse {
            status: "added".to_string(),
            id: memory.id,
            uuid: memory.uuid,
        });
    } else {
        println!("Added memory {} ({})", memory.id, memory.uuid);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_search(
    engine: &mut MemoryEngine,
    query: &str,
    limit: usize,
    precise: bool,
    json: bool,
) -> Result<ExitCode, Error> {
    let threshold = engine.precise_threshold();
    let mut results = if precise {
        engine.search_precise(query, threshold)?
    } else {
        engine.search(query)?
    };
    results.truncate(limit);

    if json {
        print_json(&SearchResponse {
            results: results.iter().map(SearchResultItem::from).collect(),
        });
    } else if results.is_empty() {
        println!("No results");
    } else {
        for memory in &results {
            match memory.similarity {
                Some(score) => println!("{:.4}  [{}] {}", score, memory.id, memory.title),
                None => println!("        [{}] {}", memory.id, memory.title),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_get(engine: &mut MemoryEngine, id: i64, json: bool) -> Result<ExitCode, Error> {
    let Some(memory) = engine.get(id)? else {
        eprintln!("No memory with id {}", id);
        return Ok(ExitCode::FAILURE);
    };
    let tags = engine.tags(id)?;
    let outgoing = engine.outgoing_links(id)?;
    let backlinks = engine.backlinks(id)?;

    if json {
        print_json(&GetResponse {
            id: memory.id,
            uuid: memory.uuid,
            title: memory.title,
            content: memory.content,
            content_type: memory.content_type,
            source: memory.source,
            tags: tags.into_iter().map(|t| t.name).collect(),
            outgoing_links: outgoing.iter().map(LinkItem::from).collect(),
            backlinks: backlinks.iter().map(LinkItem::from).collect(),
            created_at: memory.created_at,
            updated_at: memory.updated_at,
        });
    } else {
        println!("[{}] {}", memory.id, memory.title);
        println!("{}", memory.content);
        if !tags.is_empty() {
            let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
            println!("tags: {}", names.join(", "));
        }
        for link in &outgoing {
            println!("-> {} ({})", link.target_id, link.link_type);
        }
        for link in &backlinks {
            println!("<- {} ({})", link.source_id, link.link_type);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_list(engine: &mut MemoryEngine, json: bool) -> Result<ExitCode, Error> {
    let memories = engine.list()?;
    if json {
        print_json(&ListResponse {
            memories: memories
                .iter()
                .map(|m| ListItem {
                    id: m.id,
                    title: m.title.clone(),
                    created_at: m.created_at.clone(),
                })
                .collect(),
        });
    } else {
        for memory in &memories {
            println!("[{}] {}", memory.id, memory.title);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_update(
    engine: &mut MemoryEngine,
    id: i64,
    title: &str,
    content: &str,
    content_type: &str,
    json: bool,
) -> Result<ExitCode, Error> {
    engine.update_memory(id, title, content, content_type)?;
    if json {
        print_json(&UpdateResponse {
            status: "updated".to_string(),
            id,
        });
    } else {
        println!("Updated memory {}", id);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_delete(engine: &mut MemoryEngine, id: i64, json: bool) -> Result<ExitCode, Error> {
    if !engine.delete_memory(id)? {
        eprintln!("No memory with id {}", id);
        return Ok(ExitCode::FAILURE);
    }
    if json {
        print_json(&DeleteResponse {
            status: "deleted".to_string(),
            id,
        });
    } else {
        println!("Deleted memory {}", id);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_link(
    engine: &mut MemoryEngine,
    source: i64,
    target: i64,
    link_type: &str,
    weight: f64,
    description: &str,
    json: bool,
) -> Result<ExitCode, Error> {
    let link = engine.link_memories(source, target, link_type, weight, description)?;
    if json {
        print_json(&LinkResponse {
            status: "linked".to_string(),
            link: LinkItem::from(&link),
        });
    } else {
        println!("Linked {} -> {} ({})", source, target, link.link_type);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_unlink(engine: &mut MemoryEngine, id: i64, json: bool) -> Result<ExitCode, Error> {
    if !engine.delete_link(id)? {
        eprintln!("No link with id {}", id);
        return Ok(ExitCode::FAILURE);
    }
    if json {
        print_json(&DeleteResponse {
            status: "unlinked".to_string(),
            id,
        });
    } else {
        println!("Deleted link {}", id);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_tag(
    engine: &mut MemoryEngine,
    id: i64,
    name: &str,
    json: bool,
) -> Result<ExitCode, Error> {
    let tag = engine.add_tag_to_memory(id, name)?;
    if json {
        print_json(&TagResponse {
            status: "tagged".to_string(),
            memory_id: id,
            tag: tag.name,
        });
    } else {
        println!("Tagged memory {} with '{}'", id, tag.name);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_graph(
    engine: &mut MemoryEngine,
    query: Option<&str>,
    json: bool,
) -> Result<ExitCode, Error> {
    let graph = match query {
        Some(query) => {
            let results = engine.search(query)?;
            engine.build_graph_for_search_results(&results)?
        }
        None => engine.build_graph_all()?,
    };

    if json {
        print_json(&graph);
    } else {
        println!("{} nodes, {} edges", graph.nodes.len(), graph.edges.len());
        for edge in &graph.edges {
            println!("{} -[{}]-> {}", edge.source, edge.label, edge.target);
        }
    }
    Ok(ExitCode::SUCCESS)
}
