//! Behaviour every backing must show. Each backing's tests call into here.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use burn_core::{Envelope, SecretId};

use crate::SecretStore;

const TTL: Duration = Duration::from_secs(300);

pub fn envelope(tag: &[u8]) -> Envelope {
    Envelope {
        iv: "AAAAAAAAAAAAAAAA".into(),
        ciphertext: format!("{}AAAA", tag.len()),
        content_type: "text/plain".into(),
        filename: Some(String::from_utf8_lossy(tag).into_owned()),
    }
}

pub async fn consume_once(store: &dyn SecretStore) {
    let sent = envelope(b"hello");
    let id = store.create(sent.clone(), TTL).await.unwrap();

    let first = store.consume(&id).await.unwrap();
    assert_eq!(first, Some(sent), "first consume returns the envelope");

    let second = store.consume(&id).await.unwrap();
    assert_eq!(second, None, "second consume finds nothing");
}

pub async fn unknown_id_is_none(store: &dyn SecretStore) {
    let never = SecretId::parse("never-created-0000").unwrap();
    assert_eq!(store.consume(&never).await.unwrap(), None);

    let fresh = SecretId::generate();
    assert_eq!(store.consume(&fresh).await.unwrap(), None);
}

pub async fn ids_are_distinct(store: &dyn SecretStore) {
    let mut ids = HashSet::new();
    for i in 0..200u32 {
        let id = store
            .create(envelope(&i.to_be_bytes()), TTL)
            .await
            .unwrap();
        assert!(ids.insert(id), "create returned a duplicate id");
    }
}

/// `n` tasks race to consume one id; exactly one may win.
pub async fn concurrent_consume_single_winner(store: Arc<dyn SecretStore>, n: usize) {
    let sent = envelope(b"race");
    let id = store.create(sent.clone(), TTL).await.unwrap();

    let barrier = Arc::new(tokio::sync::Barrier::new(n));
    let tasks: Vec<_> = (0..n)
        .map(|_| {
            let store = Arc::clone(&store);
            let id = id.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                store.consume(&id).await
            })
        })
        .collect();

    let results = futures::future::join_all(tasks).await;
    let winners: Vec<Envelope> = results
        .into_iter()
        .filter_map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(winners.len(), 1, "exactly one consumer may receive the secret");
    assert_eq!(winners[0], sent);
}
