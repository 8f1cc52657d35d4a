//! Task catalog

use crate::accounts::require_admin;
use crate::error::{WorkflowError, WorkflowResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use taskpay_bus::{ChangeBus, ChangeEvent, Collection};
use taskpay_core::{new_id, Amount, Task};
use taskpay_store::codec::now;
use taskpay_store::{Database, TaskRepo};
use tracing::info;

/// Admin input for a catalog task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub reward: Decimal,
    pub worker_limit: u32,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Clone)]
pub struct TaskService {
    db: Database,
    bus: ChangeBus,
}

impl TaskService {
    pub fn new(db: Database, bus: ChangeBus) -> Self {
        Self { db, bus }
    }

    pub async fn create_task(&self, admin_id: &str, new_task: NewTask) -> WorkflowResult<Task> {
        require_admin(&self.db, admin_id).await?;

        let title = new_task.title.trim();
        if title.is_empty() {
            return Err(WorkflowError::validation("task title is required"));
        }
        let reward = Amount::positive(new_task.reward)?;
        if new_task.worker_limit == 0 {
            return Err(WorkflowError::validation("worker limit must be at least 1"));
        }

        let task = Task {
            id: new_id("TSK"),
            title: title.to_string(),
            description: new_task.description.trim().to_string(),
            reward,
            worker_limit: new_task.worker_limit,
            submitted_count: 0,
            is_published: new_task.publish,
            created_at: now(),
        };

        let mut conn = self.db.pool().acquire().await?;
        TaskRepo::insert(&mut conn, &task).await?;
        drop(conn);

        info!(task_id = %task.id, reward = %task.reward, worker_limit = task.worker_limit, "Task created");
        self.bus.publish(ChangeEvent::created(Collection::Tasks, &task.id, None));
        Ok(task)
    }

    pub async fn publish(&self, admin_id: &str, task_id: &str) -> WorkflowResult<Task> {
        self.set_published(admin_id, task_id, true).await
    }

    pub async fn unpublish(&self, admin_id: &str, task_id: &str) -> WorkflowResult<Task> {
        self.set_published(admin_id, task_id, false).await
    }

    async fn set_published(
        &self,
        admin_id: &str,
        task_id: &str,
        published: bool,
    ) -> WorkflowResult<Task> {
        require_admin(&self.db, admin_id).await?;

        let mut conn = self.db.pool().acquire().await?;
        TaskRepo::set_published(&mut conn, task_id, published).await?;
        let task = TaskRepo::get(&mut conn, task_id).await?;
        drop(conn);

        info!(task_id, published, "Task visibility changed");
        self.bus.publish(ChangeEvent::updated(Collection::Tasks, task_id, None));
        Ok(task)
    }

    pub async fn get(&self, task_id: &str) -> WorkflowResult<Task> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(TaskRepo::get(&mut conn, task_id).await?)
    }

    pub async fn list(&self, published_only: bool) -> WorkflowResult<Vec<Task>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(TaskRepo::list(&mut conn, published_only).await?)
    }
}
