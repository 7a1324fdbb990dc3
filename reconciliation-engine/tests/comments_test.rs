//! Integration tests for comment threads over the table store.

mod common;

use std::sync::Arc;

use reconciliation_engine::models::{AuthorType, CommentPriority, LedgerType, NewComment};
use reconciliation_engine::services::comments::CommentService;
use reconciliation_engine::services::store::{MemoryTableStore, TableStore};

fn comment(entry_id: &str, content: &str) -> NewComment {
    NewComment {
        entry_id: entry_id.to_string(),
        client_id: "client-1".to_string(),
        ledger_type: LedgerType::Client,
        author: "Claire".to_string(),
        author_type: AuthorType::Collaborator,
        content: content.to_string(),
        priority: CommentPriority::Normal,
        is_internal: false,
    }
}

#[tokio::test]
async fn comments_persist_and_list_in_insertion_order() {
    common::init_tracing();
    let store: Arc<MemoryTableStore> = Arc::new(MemoryTableStore::new(true));
    let service = CommentService::new(Some(store.clone() as Arc<dyn TableStore>));

    service
        .add_comment(comment("entry-1", "Justificatif demandé"))
        .await
        .expect("first comment");
    service
        .add_comment(comment("entry-1", "Relance envoyée"))
        .await
        .expect("second comment");

    let thread = service
        .comments_for("client-1", "entry-1")
        .await
        .expect("thread");
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].content, "Justificatif demandé");
    assert_eq!(thread[1].content, "Relance envoyée");
    assert_eq!(thread[0].parsed_author_type(), AuthorType::Collaborator);

    // Stored rows match what the service serves.
    let stored = store
        .list_comments("client-1", "entry-1")
        .await
        .expect("stored rows");
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn threads_are_scoped_per_entry() {
    let store: Arc<MemoryTableStore> = Arc::new(MemoryTableStore::new(true));
    let service = CommentService::new(Some(store as Arc<dyn TableStore>));

    service
        .add_comment(comment("entry-1", "Sur la première écriture"))
        .await
        .expect("comment");
    service
        .add_comment(comment("entry-2", "Sur la seconde"))
        .await
        .expect("comment");

    let thread = service
        .comments_for("client-1", "entry-2")
        .await
        .expect("thread");
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].content, "Sur la seconde");
}

#[tokio::test]
async fn unavailable_store_degrades_to_the_memory_thread() {
    let store: Arc<MemoryTableStore> = Arc::new(MemoryTableStore::new(false));
    let service = CommentService::new(Some(store as Arc<dyn TableStore>));

    let stored = service
        .add_comment(comment("entry-1", "Conservé en mémoire"))
        .await
        .expect("comment still accepted");
    assert_eq!(stored.content, "Conservé en mémoire");

    let thread = service
        .comments_for("client-1", "entry-1")
        .await
        .expect("thread");
    assert_eq!(thread.len(), 1);
}

#[tokio::test]
async fn blank_identifiers_are_rejected() {
    let service = CommentService::new(None);

    let mut missing_client = comment("entry-1", "Sans client");
    missing_client.client_id = "  ".to_string();
    assert!(service.add_comment(missing_client).await.is_err());

    let missing_entry = comment("", "Sans écriture");
    assert!(service.add_comment(missing_entry).await.is_err());
}
