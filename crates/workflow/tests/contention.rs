//! Overlapping writers against a file-backed store
//!
//! Each test spawns its operations on a multi-threaded runtime over a WAL
//! database with several pooled connections, so transactions really race.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use taskpay_bus::ChangeBus;
use taskpay_core::Role;
use taskpay_store::{Database, StoreConfig};
use taskpay_workflow::{
    DisabledPush, NewSubmission, NewTask, Services, WorkflowConfig, WorkflowError,
    WorkflowResult,
};
use tempfile::TempDir;

const RACERS: usize = 8;

async fn file_services(dir: &TempDir) -> anyhow::Result<Services> {
    let config = StoreConfig::at_path(dir.path().join("taskpay.db"));
    assert!(config.max_connections > 1);
    let db = Database::connect(&config).await?;
    Ok(Services::new(
        db,
        ChangeBus::new(),
        WorkflowConfig::default(),
        Arc::new(DisabledPush),
    ))
}

async fn task_for(services: &Services, admin_id: &str, reward: Decimal, limit: u32) -> anyhow::Result<String> {
    let task = services
        .tasks
        .create_task(
            admin_id,
            NewTask {
                title: "Share post".to_string(),
                description: "Share and screenshot".to_string(),
                reward,
                worker_limit: limit,
                publish: true,
            },
        )
        .await?;
    Ok(task.id)
}

fn proof(task_id: &str) -> NewSubmission {
    NewSubmission::Task {
        task_id: task_id.to_string(),
        proof_text: Some("shared".to_string()),
        proof_url: None,
        images: vec![],
    }
}

/// Successes, after checking every failure is a conflict with `message`
fn tally<T>(results: Vec<WorkflowResult<T>>, message: &str) -> usize {
    let mut ok = 0;
    for result in results {
        match result {
            Ok(_) => ok += 1,
            Err(WorkflowError::Conflict(m)) => assert_eq!(m, message),
            Err(other) => panic!("unexpected error under contention: {other}"),
        }
    }
    ok
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn parallel_rejects_refund_once() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let services = file_services(&dir).await?;
    let admin = services.accounts.register("Admin", "admin@example.com", Role::Admin).await?;
    let user = services.accounts.register("Mitu", "mitu@example.com", Role::User).await?;
    services.balances.adjust_balance(&admin.id, &user.id, dec!(300), "Opening").await?;

    let request = services
        .submissions
        .create(
            &user.id,
            NewSubmission::Withdrawal {
                amount: dec!(300),
                method: "Bkash".to_string(),
                details: "01711111111".to_string(),
            },
        )
        .await?;
    assert_eq!(services.balances.get_balance(&user.id).await?, Decimal::ZERO);

    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let reviews = services.reviews.clone();
            let (id, admin_id) = (request.id.clone(), admin.id.clone());
            tokio::spawn(async move { reviews.reject(&id, &admin_id, None).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await?);
    }

    assert_eq!(tally(results, "already reviewed"), 1);
    assert_eq!(services.balances.get_balance(&user.id).await?, dec!(300));
    assert!(services.balances.verify(&user.id).await?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn parallel_approves_credit_once() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let services = file_services(&dir).await?;
    let admin = services.accounts.register("Admin", "admin@example.com", Role::Admin).await?;
    let user = services.accounts.register("Mitu", "mitu@example.com", Role::User).await?;
    let task_id = task_for(&services, &admin.id, dec!(45), 1).await?;
    let submission = services.submissions.create(&user.id, proof(&task_id)).await?;

    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let reviews = services.reviews.clone();
            let (id, admin_id) = (submission.id.clone(), admin.id.clone());
            tokio::spawn(async move { reviews.approve(&id, &admin_id).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await?);
    }

    assert_eq!(tally(results, "already reviewed"), 1);
    assert_eq!(services.balances.get_balance(&user.id).await?, dec!(45));
    assert_eq!(services.ledger.sum_balance(&user.id).await?, dec!(45));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn parallel_workers_fill_exact_limit() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let services = file_services(&dir).await?;
    let admin = services.accounts.register("Admin", "admin@example.com", Role::Admin).await?;
    let task_id = task_for(&services, &admin.id, dec!(10), 2).await?;

    let mut workers = Vec::new();
    for i in 0..RACERS {
        let account = services
            .accounts
            .register(&format!("Worker {i}"), &format!("worker{i}@example.com"), Role::User)
            .await?;
        workers.push(account.id);
    }

    let handles: Vec<_> = workers
        .into_iter()
        .map(|account_id| {
            let submissions = services.submissions.clone();
            let task_id = task_id.clone();
            tokio::spawn(async move { submissions.create(&account_id, proof(&task_id)).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await?);
    }

    assert_eq!(tally(results, "task full"), 2);
    assert_eq!(services.tasks.get(&task_id).await?.submitted_count, 2);
    Ok(())
}
