//! Budget persistence across process restarts (file-backed SQLite)

use std::sync::Arc;

use application::{BudgetLedger, BudgetStorePort, ProviderQuota, UsagePolicy};
use domain::ProviderId;
use infrastructure::{DatabaseConfig, SqliteBudgetStore, create_pool};

fn file_store(path: &std::path::Path) -> Arc<SqliteBudgetStore> {
    let config = DatabaseConfig {
        path: path.to_string_lossy().into_owned(),
        max_connections: 2,
        run_migrations: true,
    };
    Arc::new(SqliteBudgetStore::new(Arc::new(create_pool(&config).unwrap())))
}

fn quotas() -> Vec<(ProviderId, ProviderQuota)> {
    vec![(
        ProviderId::new("google").unwrap(),
        ProviderQuota::RequestCount { monthly_cap: 100 },
    )]
}

#[tokio::test]
async fn consumption_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("budget.db");
    let google = ProviderId::new("google").unwrap();

    {
        let ledger = BudgetLedger::with_store(quotas(), file_store(&db)).await.unwrap();
        for _ in 0..60 {
            ledger.try_consume(&google, 1).await.unwrap();
        }
        assert_eq!(ledger.policy(&google), Some(UsagePolicy::Restricted));
    }

    let ledger = BudgetLedger::with_store(quotas(), file_store(&db)).await.unwrap();
    let status = ledger.status_of(&google).unwrap();
    assert_eq!(status.consumed_requests, 60);
    assert_eq!(status.policy, UsagePolicy::Restricted);
}

#[tokio::test]
async fn manual_override_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("budget.db");
    let google = ProviderId::new("google").unwrap();

    let store = file_store(&db);
    let ledger = BudgetLedger::with_store(quotas(), Arc::clone(&store) as Arc<dyn BudgetStorePort>)
        .await
        .unwrap();
    ledger.set_consumed(&google, 96).await.unwrap();

    let stored = store.load(&google).await.unwrap().unwrap();
    assert_eq!(stored.consumed_requests, 96);

    ledger.reset(&google).await.unwrap();
    let stored = store.load(&google).await.unwrap().unwrap();
    assert_eq!(stored.consumed_requests, 0);
}
