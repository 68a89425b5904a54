use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tessera::auth::{
    Argon2Hasher, AuthConfig, AuthenticationManager, MokaAuthenticationCache, PasswordHasher,
    Profile, TicketReaper,
};
use tessera::store::{
    MemoryProfileRepository, MemoryTicketRepository, ProfileRepository, TicketRepository,
};
use tokio_util::sync::CancellationToken;

const USERS: usize = 8;

struct Shared {
    manager: Arc<AuthenticationManager>,
    tickets: Arc<MemoryTicketRepository>,
}

async fn setup() -> Shared {
    let hasher = Arc::new(Argon2Hasher::with_params(1024, 1, 1).unwrap());
    let profiles = Arc::new(MemoryProfileRepository::new());
    let tickets = Arc::new(MemoryTicketRepository::new());

    let hashed = hasher.hash("pw").unwrap();
    for i in 0..USERS {
        let profile = Profile::new(
            format!("user{i}"),
            "tenantA",
            format!("user{i}@example.com"),
            hashed.clone(),
        );
        profiles.save(&profile).await.unwrap();
    }

    let manager = AuthenticationManager::new(
        profiles,
        tickets.clone(),
        hasher,
        Arc::new(MokaAuthenticationCache::default()),
        &AuthConfig::new(),
    );
    Shared {
        manager: Arc::new(manager),
        tickets,
    }
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_logins_issue_one_ticket_each() {
    let shared = setup().await;

    let mut handles = Vec::new();
    for i in 0..USERS {
        let manager = shared.manager.clone();
        handles.push(tokio::spawn(async move {
            manager
                .authenticate_user("tenantA", &format!("user{i}"), &secret("pw"))
                .await
        }));
    }

    let mut issued = Vec::new();
    for handle in handles {
        let result = handle.await;
        let Ok(Ok(auth)) = result else {
            panic!("login task failed");
        };
        issued.push(auth.ticket().to_string());
    }

    issued.sort();
    issued.dedup();
    assert_eq!(issued.len(), USERS);
    assert_eq!(shared.tickets.count().await.ok(), Some(USERS as u64));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reads_racing_invalidation_never_resurrect_the_session() {
    let shared = setup().await;
    let Ok(auth) = shared
        .manager
        .authenticate_user("tenantA", "user0", &secret("pw"))
        .await
    else {
        panic!("login failed");
    };
    let ticket = auth.ticket().to_string();

    let mut readers = Vec::new();
    for i in 0..16 {
        let manager = shared.manager.clone();
        let ticket = ticket.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..20 {
                // Only "found" or "not found" are acceptable, never an error.
                let result = manager.get_authentication(&ticket, i % 2 == 0).await;
                assert!(result.is_ok(), "unexpected error: {result:?}");
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(shared.manager.invalidate_authentication(&auth).await.is_ok());

    for reader in readers {
        assert!(reader.await.is_ok());
    }

    // Narrow window: a read that passed its generation check right before the
    // invalidation may still have written the cache. A reload always settles it.
    assert!(matches!(
        shared.manager.get_authentication(&ticket, true).await,
        Ok(None)
    ));
    assert!(matches!(
        shared.manager.get_authentication(&ticket, false).await,
        Ok(None)
    ));
    assert_eq!(shared.tickets.count().await.ok(), Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invalidations_of_the_same_ticket_all_succeed() {
    let shared = setup().await;
    let Ok(auth) = shared
        .manager
        .authenticate_user("tenantA", "user1", &secret("pw"))
        .await
    else {
        panic!("login failed");
    };

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = shared.manager.clone();
        let auth = auth.clone();
        handles.push(tokio::spawn(async move {
            manager.invalidate_authentication(&auth).await
        }));
    }
    for handle in handles {
        assert!(matches!(handle.await, Ok(Ok(()))));
    }

    assert!(matches!(
        shared.manager.get_authentication(auth.ticket(), false).await,
        Ok(None)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sweep_racing_traffic_only_reports_missing_tickets() {
    let shared = setup().await;

    let mut tickets = Vec::new();
    for i in 0..USERS {
        let Ok(auth) = shared
            .manager
            .authenticate_user("tenantA", &format!("user{i}"), &secret("pw"))
            .await
        else {
            panic!("login failed");
        };
        tickets.push(auth.ticket().to_string());
    }

    // Age every ticket so the reaper removes all of them.
    let long_ago = chrono::Utc::now() - chrono::Duration::days(1);
    for ticket in &tickets {
        shared.tickets.touch(ticket, long_ago).await.unwrap();
    }

    let shutdown = CancellationToken::new();
    let reaper = TicketReaper::new(
        shared.manager.tickets().clone(),
        &AuthConfig::new()
            .with_max_inactive_seconds(3600)
            .with_sweep_interval_seconds(1),
    )
    .spawn(shutdown.clone());

    let mut readers = Vec::new();
    for ticket in tickets.clone() {
        let manager = shared.manager.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..10 {
                if let Err(err) = manager.get_authentication(&ticket, true).await {
                    panic!("sweep race surfaced an error: {err}");
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }));
    }
    for reader in readers {
        assert!(reader.await.is_ok());
    }

    // A forced reload touches the ticket; wait for a sweep after the last one.
    for ticket in &tickets {
        shared.tickets.touch(ticket, long_ago).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(1200)).await;
    shutdown.cancel();
    assert!(reaper.await.is_ok());

    assert_eq!(shared.tickets.count().await.ok(), Some(0));
    for ticket in &tickets {
        assert!(matches!(
            shared.manager.get_authentication(ticket, true).await,
            Ok(None)
        ));
    }
}
