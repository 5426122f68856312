// Kanun - Local console client

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use uuid::Uuid;

use kanun_app::{FileChatSession, Workspace};
use kanun_common::config::Config;
use kanun_documents::UploadFile;

const HELP: &str = "\
Commands:
  upload <path>...       upload files and index them
  retry <n>              retry indexing of document n
  docs                   list documents
  select <n>             select document n
  new                    start a new conversation for the selected document
  ask <question>         ask in the selected document's active conversation
  files                  list pre-indexed files
  chat <file> <question> ask about a pre-indexed file
  quit                   exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .pretty()
        .init();

    info!("Starting Kanun local console");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        base_url = %config.api_base_url,
        collection = %config.collection_name,
        provider = %config.rag_provider,
        "Configuration loaded successfully"
    );

    let mut workspace = Workspace::from_config(&config)?;
    let mut file_chat = FileChatSession::new(workspace.rag().clone());

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "upload" => {
                let files: Vec<UploadFile> = rest
                    .split_whitespace()
                    .filter_map(UploadFile::from_path)
                    .collect();
                let ids = workspace.submit(files);
                println!("Uploaded {} file(s), indexing...", ids.len());
                workspace.settle().await;
                print_documents(&workspace);
            }
            "retry" => match document_at(&workspace, rest) {
                Some(id) => {
                    if let Err(e) = workspace.retry_upload(id) {
                        if !e.is_user_error() {
                            error!(error = %e, "Retry failed");
                        }
                        println!("Cannot retry [{}]: {}", e.error_code(), e);
                        continue;
                    }
                    workspace.settle().await;
                    print_documents(&workspace);
                }
                None => println!("No such document"),
            },
            "docs" => print_documents(&workspace),
            "select" => match document_at(&workspace, rest) {
                Some(id) => {
                    workspace.select_document(id);
                    print_active_conversation(&workspace);
                }
                None => println!("No such document"),
            },
            "new" => match workspace.selected_document_id() {
                Some(id) => {
                    workspace.create_conversation(id);
                    print_active_conversation(&workspace);
                }
                None => println!("Select a document first"),
            },
            "ask" => {
                let Some(id) = workspace.selected_document_id() else {
                    println!("Select a document first");
                    continue;
                };
                if workspace.send_to_active(id, rest).is_none() {
                    println!("Nothing sent");
                    continue;
                }
                workspace.settle().await;
                print_active_conversation(&workspace);
            }
            "files" => match file_chat.available_files().await {
                Ok(files) => {
                    for file in files {
                        println!("  {}  {}", file.file_name, file.file_description);
                    }
                }
                Err(e) => println!("Failed to list files: {}", e),
            },
            "chat" => {
                let (file_name, question) = rest.split_once(' ').unwrap_or((rest, ""));
                if file_name.is_empty() {
                    println!("Usage: chat <file> <question>");
                    continue;
                }
                file_chat.select_file(file_name);
                file_chat.set_input(question);
                if file_chat.submit().is_none() {
                    println!("Nothing sent");
                    continue;
                }
                file_chat.settle().await;
                if let Some(reply) = file_chat.messages().last() {
                    println!("assistant: {}", reply.content);
                    if let Some(score) = reply.confidence_score {
                        println!("  confidence: {:.2}", score);
                    }
                    for reference in reply.references.iter().flatten() {
                        println!("  - {}", reference);
                    }
                }
            }
            other => println!("Unknown command: {} (try 'help')", other),
        }
    }

    info!("Console closed");
    Ok(())
}

/// Resolve a 1-based position from the `docs` listing
fn document_at(workspace: &Workspace, position: &str) -> Option<Uuid> {
    let index = position.parse::<usize>().ok()?.checked_sub(1)?;
    workspace.documents().list().get(index).map(|d| d.id)
}

fn print_documents(workspace: &Workspace) {
    for (i, document) in workspace.documents().list().iter().enumerate() {
        let marker = if workspace.selected_document_id() == Some(document.id) {
            "*"
        } else {
            " "
        };
        let conversations = workspace.conversations().conversations(document.id).len();
        println!(
            "{}{:>3}. {} [{}] {} conversation(s)",
            marker,
            i + 1,
            document.title,
            document.status,
            conversations
        );
    }
}

fn print_active_conversation(workspace: &Workspace) {
    let Some(conversation) = workspace
        .selected_document_id()
        .and_then(|id| workspace.conversations().active_conversation(id))
    else {
        println!("No conversation yet");
        return;
    };

    println!("== {} ==", conversation.title);
    for message in &conversation.messages {
        println!("{}: {}", message.role, message.content.render());
    }
}
