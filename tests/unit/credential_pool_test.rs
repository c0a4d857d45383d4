//! Unit tests for the credential pool

use img_relay_gateway::gateway::{Credential, CredentialPool};
use std::sync::Arc;

#[test]
fn test_pool_starts_at_first_credential() {
    let pool = CredentialPool::from_tokens(["k1", "k2", "k3"]).unwrap();
    assert_eq!(pool.size(), 3);
    assert_eq!(pool.cursor(), 0);
    assert_eq!(pool.current(), &Credential::new("k1"));
}

#[test]
fn test_rotation_cycles_through_pool() {
    let pool = CredentialPool::from_tokens(["k1", "k2", "k3"]).unwrap();
    let seen: Vec<String> = (0..6)
        .map(|_| {
            let token = pool.current().expose().to_string();
            pool.rotate();
            token
        })
        .collect();
    assert_eq!(seen, vec!["k1", "k2", "k3", "k1", "k2", "k3"]);
}

#[test]
fn test_concurrent_rotations_are_not_lost() {
    for (threads, rotations_per_thread, size) in [(8, 125, 3), (4, 7, 5), (16, 16, 7)] {
        let tokens: Vec<String> = (0..size).map(|i| format!("k{}", i)).collect();
        let pool = Arc::new(CredentialPool::from_tokens(tokens).unwrap());
        let start = pool.cursor();

        std::thread::scope(|s| {
            for _ in 0..threads {
                let pool = pool.clone();
                s.spawn(move || {
                    for _ in 0..rotations_per_thread {
                        pool.rotate();
                    }
                });
            }
        });

        let total = threads * rotations_per_thread;
        assert_eq!(pool.cursor(), (start + total) % size);
        assert!(pool.cursor() < pool.size());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotations_across_tasks() {
    let pool = Arc::new(CredentialPool::from_tokens(["a", "b", "c"]).unwrap());

    let tasks = (0..50).map(|_| {
        let pool = pool.clone();
        tokio::spawn(async move {
            pool.rotate();
        })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    assert_eq!(pool.cursor(), 50 % 3);
}

#[test]
fn test_empty_pool_is_config_error() {
    let err = CredentialPool::from_tokens(Vec::<String>::new()).unwrap_err();
    assert!(err.to_string().contains("at least one"));
}

#[test]
fn test_tokens_must_be_valid_header_values() {
    assert!(CredentialPool::from_tokens(["k1", "line\r\nbreak"]).is_err());
    assert!(CredentialPool::from_tokens(["tab\tinside"]).is_ok());
}

#[test]
fn test_slot_and_credential_agree_after_rotation() {
    let pool = CredentialPool::from_tokens(["k1", "k2", "k3"]).unwrap();
    for expected in [0, 1, 2, 0] {
        let (slot, credential) = pool.current_with_slot();
        assert_eq!(slot, expected);
        assert_eq!(credential, &Credential::new(format!("k{}", expected + 1)));
        pool.rotate();
    }
}
