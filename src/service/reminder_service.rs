//! Personal reminders and to-do lists.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::model::ReminderModel;
use crate::model::TodoModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;
use crate::service::time::parse_reminder_time;

pub struct ReminderService {
    db: Arc<Repository>,
}

impl ReminderService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Schedules a reminder from a human time expression.
    ///
    /// # Performance
    /// * DB calls: 1
    pub async fn create(
        &self,
        user_id: u64,
        guild_id: Option<u64>,
        channel_id: u64,
        time: &str,
        content: &str,
        public: bool,
        now: DateTime<Utc>,
    ) -> Result<ReminderModel, ServiceError> {
        let due_at = parse_reminder_time(time, now).ok_or_else(|| {
            ServiceError::InvalidArgument(
                "Invalid time format. Try `1h30m`, `tomorrow at 3pm`, `next week`, `14:30` or `2025-12-31 18:00`."
                    .to_string(),
            )
        })?;
        if due_at <= now {
            return Err(ServiceError::InvalidArgument(
                "The reminder time must be in the future.".to_string(),
            ));
        }
        if content.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "The reminder cannot be empty.".to_string(),
            ));
        }

        let mut model = ReminderModel {
            user_id,
            guild_id: guild_id.map(|id| id as i64),
            channel_id,
            content: content.to_string(),
            created_at: now,
            due_at,
            completed: false,
            public,
            ..Default::default()
        };
        model.id = self.db.reminder.insert(&model).await?;
        Ok(model)
    }

    /// Pending reminders, soonest first.
    pub async fn pending(&self, user_id: u64) -> Result<Vec<ReminderModel>, ServiceError> {
        Ok(self.db.reminder.select_pending_by_user(user_id).await?)
    }

    pub async fn remove(&self, user_id: u64, id: i64) -> Result<ReminderModel, ServiceError> {
        let reminder = self
            .db
            .reminder
            .select(&id)
            .await?
            .filter(|r| !r.completed)
            .ok_or_else(|| ServiceError::NotFound(format!("Reminder #{id} not found.")))?;
        if reminder.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "You can only remove your own reminders.".to_string(),
            ));
        }
        self.db.reminder.delete(&id).await?;
        Ok(reminder)
    }

    pub async fn clear(&self, user_id: u64) -> Result<u64, ServiceError> {
        Ok(self.db.reminder.delete_pending_by_user(user_id).await?)
    }

    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ReminderModel>, ServiceError> {
        Ok(self.db.reminder.select_due(&now).await?)
    }

    pub async fn mark_completed(&self, id: i64) -> Result<(), ServiceError> {
        Ok(self.db.reminder.mark_completed(id).await?)
    }

    // ========================================================================
    // Todos
    // ========================================================================

    pub async fn todos(&self, user_id: u64) -> Result<Vec<TodoModel>, ServiceError> {
        Ok(self.db.todo.select_by_user(user_id).await?)
    }

    /// Adds a todo. Returns its 1-based position.
    pub async fn add_todo(&self, user_id: u64, content: &str) -> Result<usize, ServiceError> {
        if content.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "The task cannot be empty.".to_string(),
            ));
        }
        let position = self.db.todo.push(user_id, content, &Utc::now()).await?;
        Ok(position as usize)
    }

    async fn todo_at(&self, user_id: u64, number: usize) -> Result<TodoModel, ServiceError> {
        let todos = self.db.todo.select_by_user(user_id).await?;
        if number < 1 || number > todos.len() {
            return Err(ServiceError::InvalidArgument(if todos.is_empty() {
                "Your to-do list is empty.".to_string()
            } else {
                format!("Invalid task number. Use a number between 1 and {}.", todos.len())
            }));
        }
        Ok(todos[number - 1].clone())
    }

    pub async fn set_todo_completed(
        &self,
        user_id: u64,
        number: usize,
        completed: bool,
    ) -> Result<TodoModel, ServiceError> {
        let mut todo = self.todo_at(user_id, number).await?;
        todo.completed = completed;
        self.db.todo.update(&todo).await?;
        Ok(todo)
    }

    pub async fn remove_todo(&self, user_id: u64, number: usize) -> Result<TodoModel, ServiceError> {
        let todo = self.todo_at(user_id, number).await?;
        self.db.todo.remove_at(user_id, todo.position).await?;
        Ok(todo)
    }

    pub async fn clear_todos(&self, user_id: u64, completed_only: bool) -> Result<u64, ServiceError> {
        Ok(self.db.todo.delete_by_user(user_id, completed_only).await?)
    }
}
