use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::anyhow;
use taskstate::{abortable, KeyedTaskRegistry, TaskOptions};
use tokio::sync::oneshot;

type Settlements = Rc<RefCell<VecDeque<oneshot::Receiver<anyhow::Result<i32>>>>>;

fn schedule(settlements: &Settlements) -> oneshot::Sender<anyhow::Result<i32>> {
    let (tx, rx) = oneshot::channel();
    settlements.borrow_mut().push_back(rx);
    tx
}

/// Registry whose operation honors cancellation; settlements are consumed
/// in trigger order.
fn registry() -> (KeyedTaskRegistry<&'static str, i32, ()>, Settlements) {
    let settlements: Settlements = Rc::new(RefCell::new(VecDeque::new()));
    let queue = Rc::clone(&settlements);
    let registry = KeyedTaskRegistry::new(
        move |token, ()| {
            let rx = queue
                .borrow_mut()
                .pop_front()
                .expect("no settlement scheduled");
            async move {
                abortable(&token, async move {
                    rx.await
                        .unwrap_or_else(|_| Err(anyhow!("settlement channel closed")))
                })
                .await
            }
        },
        TaskOptions::new(),
    );
    (registry, settlements)
}

#[tokio::test]
async fn test_lazy_entry_reads_as_clean_init() {
    let (registry, _settlements) = registry();
    let handle = registry.get(&"never-seen");
    assert!(handle.is_init());
    assert!(!handle.is_aborted());
}

#[tokio::test]
async fn test_aborting_one_key_leaves_others_untouched() {
    let (registry, settlements) = registry();
    let _tx_a = schedule(&settlements);
    let tx_b = schedule(&settlements);

    let pending_a = registry.get(&"a").trigger(());
    let pending_b = registry.get(&"b").trigger(());
    assert!(registry.get(&"a").current().is_in_progress());
    assert!(registry.get(&"b").current().is_in_progress());

    registry.get(&"a").abort();
    assert!(registry.get(&"a").current().is_aborted());
    assert!(
        registry.get(&"b").current().is_in_progress(),
        "aborting one key must not touch another"
    );

    assert!(pending_a.await.is_aborted());

    tx_b.send(Ok(2)).unwrap();
    let outcome_b = pending_b.await;
    assert!(outcome_b.is_valid_success());
    assert_eq!(registry.get(&"b").current().payload(), Some(&2));
    assert!(registry.get(&"a").current().is_aborted());
}

#[tokio::test]
async fn test_triggering_one_key_does_not_invalidate_another() {
    let (registry, settlements) = registry();

    let tx_a = schedule(&settlements);
    let tx_b = schedule(&settlements);
    let pending_a = registry.get(&"a").trigger(());
    let pending_b = registry.get(&"b").trigger(());
    tx_a.send(Ok(1)).unwrap();
    tx_b.send(Ok(2)).unwrap();
    pending_a.await;
    pending_b.await;

    let _tx_a = schedule(&settlements);
    let refresh_a = registry.get(&"a").trigger(());
    assert!(registry.get(&"a").current().is_invalidated());
    assert!(
        registry.get(&"b").current().is_valid_success(),
        "refreshing one key must not invalidate another"
    );
    drop(refresh_a);
}

#[tokio::test]
async fn test_handle_is_a_snapshot() {
    let (registry, settlements) = registry();
    let handle = registry.get(&"a");
    assert!(handle.is_init());

    let tx = schedule(&settlements);
    let pending = handle.trigger(());
    tx.send(Ok(5)).unwrap();
    pending.await;

    // The decorated state is the snapshot taken at get() time; a fresh read
    // sees the published result.
    assert!(handle.is_init());
    assert_eq!(handle.current().payload(), Some(&5));
    assert_eq!(registry.get(&"a").payload(), Some(&5));
}

#[tokio::test]
async fn test_teardown_cancels_live_handles() {
    let (registry, settlements) = registry();

    // One key with live work, one already settled.
    let tx_done = schedule(&settlements);
    let settled = registry.get(&"done").trigger(());
    tx_done.send(Ok(1)).unwrap();
    settled.await;

    let _tx = schedule(&settlements);
    let pending = registry.get(&"pending").trigger(());

    drop(registry);
    assert!(
        pending.await.is_aborted(),
        "dropping the registry must signal every live handle"
    );
}
