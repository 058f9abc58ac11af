use super::*;
use std::time::Duration;

#[tokio::test]
async fn test_same_conversation_is_exclusive() {
    let locks = Arc::new(ConversationLocks::new());
    let guard = locks.acquire("conv-1").await;
    assert_eq!(guard.conversation_id(), "conv-1");

    let contender = {
        let locks = locks.clone();
        tokio::spawn(async move { locks.acquire("conv-1").await.conversation_id().to_string() })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!contender.is_finished());

    drop(guard);
    assert_eq!(contender.await.unwrap(), "conv-1");
    assert!(locks.is_empty());
}

#[tokio::test]
async fn test_different_conversations_do_not_block() {
    let locks = ConversationLocks::new();
    let _a = locks.acquire("a").await;
    let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
    assert!(b.is_ok());
    assert_eq!(locks.len(), 1);
}

#[tokio::test]
async fn test_released_lock_leaves_table() {
    let locks = ConversationLocks::new();
    let held = locks.acquire("held").await;
    drop(locks.acquire("idle").await);

    assert_eq!(locks.len(), 1);
    drop(held);
    assert!(locks.is_empty());
}

#[tokio::test]
async fn test_entry_kept_while_waiter_queued() {
    let locks = Arc::new(ConversationLocks::new());
    let first = locks.acquire("conv-1").await;

    let waiter = {
        let locks = locks.clone();
        tokio::spawn(async move {
            let guard = locks.acquire("conv-1").await;
            let tracked = locks.len();
            drop(guard);
            tracked
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    drop(first);
    // the waiter still finds its mutex in the table
    assert_eq!(waiter.await.unwrap(), 1);
    assert!(locks.is_empty());
}
