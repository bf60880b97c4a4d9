//! Integration tests for PgStore. Run with:
//!   DATABASE_URL=postgres://... cargo test -p comments_postgres -- --ignored

use comments_core::error::CommentsError;
use comments_core::ports::{CommentStore, HistoryStore, Store, UserStore};
use comments_core::types::*;
use comments_postgres::PgStore;
use sqlx::PgPool;
use uuid::Uuid;

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.expect("connect");
    let store = PgStore::new(pool);
    store.migrate().await.expect("migrate");
    store
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

fn new_user(group: &str) -> NewUser {
    NewUser {
        username: unique("user"),
        group: group.to_string(),
        password_hash: "hash".into(),
    }
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn rollback_discards_comment_and_history() {
    let store = store().await;
    let mut tx = store.begin().await.unwrap();
    let user = tx.insert_user(&new_user(&unique("g"))).await.unwrap();
    let comment = tx.insert_comment(user.id, "draft").await.unwrap();
    tx.append_history(comment.id, None, "draft").await.unwrap();
    drop(tx);

    let mut tx = store.begin().await.unwrap();
    assert!(tx.get_comment(comment.id).await.unwrap().is_none());
    assert!(tx.get_user(user.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn history_is_ordered_and_cascades() {
    let store = store().await;
    let mut tx = store.begin().await.unwrap();
    let user = tx.insert_user(&new_user(&unique("g"))).await.unwrap();
    let comment = tx.insert_comment(user.id, "v1").await.unwrap();
    tx.append_history(comment.id, None, "v1").await.unwrap();
    let updated = tx.update_content(comment.id, "v2").await.unwrap();
    assert!(updated.updated_at.is_some());
    tx.append_history(comment.id, Some("v1"), "v2").await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let entries = tx.list_history(comment.id, Page::default()).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[1].id > entries[0].id);
    assert!(entries[1].timestamp > entries[0].timestamp);
    assert_eq!(entries[1].old_value.as_deref(), Some("v1"));

    tx.delete_comment(comment.id).await.unwrap();
    assert!(tx.get_history_entry(entries[0].id).await.unwrap().is_none());
    tx.commit().await.unwrap();
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn group_listing_joins_owner() {
    let store = store().await;
    let group = unique("g");
    let mut tx = store.begin().await.unwrap();
    let inside = tx.insert_user(&new_user(&group)).await.unwrap();
    let outside = tx.insert_user(&new_user(&unique("g"))).await.unwrap();
    let first = tx.insert_comment(inside.id, "one").await.unwrap();
    tx.insert_comment(outside.id, "elsewhere").await.unwrap();
    let second = tx.insert_comment(inside.id, "two").await.unwrap();

    let listed = tx.list_comments_by_group(&group, Page::default()).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|c| c.comment.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert!(listed.iter().all(|c| c.owner == inside));

    let paged = tx
        .list_comments_by_group(&group, Page::new(Some(1), Some(1)))
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].comment.id, second.id);
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn duplicate_username_is_conflict() {
    let store = store().await;
    let mut tx = store.begin().await.unwrap();
    let user = new_user("g");
    tx.insert_user(&user).await.unwrap();
    let err = tx.insert_user(&user).await.unwrap_err();
    assert!(matches!(err, CommentsError::Conflict(_)));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn partial_user_update_keeps_other_fields() {
    let store = store().await;
    let mut tx = store.begin().await.unwrap();
    let user = tx.insert_user(&new_user("before")).await.unwrap();
    let changed = tx
        .update_user(
            user.id,
            &UserChanges {
                group: Some("after".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(changed.username, user.username);
    assert_eq!(changed.group, "after");

    let credential = tx.find_credential(&user.username).await.unwrap().unwrap();
    assert_eq!(credential.password_hash, "hash");
    assert!(tx
        .update_user(UserId(i64::MAX), &UserChanges::default())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn deleting_user_cascades_comments() {
    let store = store().await;
    let mut tx = store.begin().await.unwrap();
    let user = tx.insert_user(&new_user("g")).await.unwrap();
    let comment = tx.insert_comment(user.id, "gone soon").await.unwrap();
    tx.delete_user(user.id).await.unwrap();
    assert!(tx.get_comment(comment.id).await.unwrap().is_none());
}
