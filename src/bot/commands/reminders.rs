//! Personal reminders and to-do lists.

use chrono::Utc;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;

use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::service::time::format_time_until;

const REMINDER_COLOR: u32 = 0x3498DB;
const TODO_COLOR: u32 = 0x2ECC71;

/// Which todos `todo clear` removes.
#[derive(poise::ChoiceParameter, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TodoClearScope {
    #[default]
    #[name = "all"]
    All,
    #[name = "completed"]
    Completed,
}

fn truncate(content: &str, max: usize) -> String {
    if content.chars().count() <= max {
        content.to_string()
    } else {
        let cut: String = content.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

async fn schedule(ctx: Context<'_>, time: &str, content: &str, public: bool) -> Result<(), Error> {
    let now = Utc::now();
    let reminder = ctx
        .data()
        .service
        .reminder
        .create(
            ctx.author().id.get(),
            ctx.guild_id().map(|id| id.get()),
            ctx.channel_id().get(),
            time,
            content,
            public,
            now,
        )
        .await?;

    let embed = CreateEmbed::new()
        .title(if public {
            "⏰ Public Reminder Set"
        } else {
            "⏰ Reminder Set"
        })
        .description(format!(
            "I'll remind {} {}: **{}**",
            if public { "everyone here" } else { "you" },
            format_time_until(reminder.due_at - now),
            reminder.content
        ))
        .field(
            "Due",
            format!("<t:{0}:F> (<t:{0}:R>)", reminder.due_at.timestamp()),
            false,
        )
        .footer(CreateEmbedFooter::new(format!("Reminder #{}", reminder.id)))
        .color(REMINDER_COLOR);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub struct RemindersCog;

impl RemindersCog {
    /// Manage your reminders
    #[poise::command(
        prefix_command,
        slash_command,
        category = "Reminders",
        subcommands(
            "Self::remind_add",
            "Self::remind_list",
            "Self::remind_remove",
            "Self::remind_clear",
            "Self::remind_public"
        ),
        subcommand_required
    )]
    pub async fn remind(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Set a reminder
    #[poise::command(prefix_command, slash_command, rename = "add", aliases("create", "set"))]
    pub async fn remind_add(
        ctx: Context<'_>,
        #[description = "When, e.g. 1h30m, 14:30, tomorrow at 3pm"] time: String,
        #[description = "What to remind you about"]
        #[rest]
        content: String,
    ) -> Result<(), Error> {
        schedule(ctx, &time, &content, false).await
    }

    /// Set a reminder that is posted in this channel
    #[poise::command(prefix_command, slash_command, rename = "public")]
    pub async fn remind_public(
        ctx: Context<'_>,
        #[description = "When, e.g. 1h30m, 14:30, tomorrow at 3pm"] time: String,
        #[description = "What to remind everyone about"]
        #[rest]
        content: String,
    ) -> Result<(), Error> {
        schedule(ctx, &time, &content, true).await
    }

    /// List your pending reminders
    #[poise::command(prefix_command, slash_command, rename = "list")]
    pub async fn remind_list(ctx: Context<'_>) -> Result<(), Error> {
        let reminders = ctx
            .data()
            .service
            .reminder
            .pending(ctx.author().id.get())
            .await?;
        if reminders.is_empty() {
            ctx.say("You don't have any pending reminders.").await?;
            return Ok(());
        }

        let now = Utc::now();
        let mut embed = CreateEmbed::new()
            .title("⏰ Your Reminders")
            .color(REMINDER_COLOR);
        for reminder in reminders.iter().take(25) {
            embed = embed.field(
                format!(
                    "#{} {}",
                    reminder.id,
                    if reminder.public { "(public)" } else { "" }
                ),
                format!(
                    "{}\n<t:{}:F> ({})",
                    truncate(&reminder.content, 200),
                    reminder.due_at.timestamp(),
                    format_time_until(reminder.due_at - now)
                ),
                false,
            );
        }
        if reminders.len() > 25 {
            embed = embed.footer(CreateEmbedFooter::new(format!(
                "Showing 25 of {} reminders",
                reminders.len()
            )));
        }
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Delete one of your reminders
    #[poise::command(
        prefix_command,
        slash_command,
        rename = "remove",
        aliases("delete", "cancel")
    )]
    pub async fn remind_remove(
        ctx: Context<'_>,
        #[description = "Reminder number from the list"] id: i64,
    ) -> Result<(), Error> {
        let reminder = ctx
            .data()
            .service
            .reminder
            .remove(ctx.author().id.get(), id)
            .await?;
        ctx.say(format!(
            "Reminder #{} removed: {}",
            reminder.id,
            truncate(&reminder.content, 100)
        ))
        .await?;
        Ok(())
    }

    /// Delete all of your pending reminders
    #[poise::command(prefix_command, slash_command, rename = "clear")]
    pub async fn remind_clear(ctx: Context<'_>) -> Result<(), Error> {
        let removed = ctx
            .data()
            .service
            .reminder
            .clear(ctx.author().id.get())
            .await?;
        if removed == 0 {
            ctx.say("You don't have any pending reminders.").await?;
        } else {
            ctx.say(format!("Cleared {removed} reminder(s).")).await?;
        }
        Ok(())
    }

    /// Quickly set a reminder
    #[poise::command(prefix_command, slash_command, category = "Reminders")]
    pub async fn remindme(
        ctx: Context<'_>,
        #[description = "When, e.g. 1h30m, 14:30, tomorrow at 3pm"] time: String,
        #[description = "What to remind you about"]
        #[rest]
        content: String,
    ) -> Result<(), Error> {
        schedule(ctx, &time, &content, false).await
    }

    /// Manage your to-do list
    #[poise::command(
        prefix_command,
        slash_command,
        category = "Reminders",
        subcommands(
            "Self::todo_add",
            "Self::todo_list",
            "Self::todo_complete",
            "Self::todo_uncomplete",
            "Self::todo_remove",
            "Self::todo_clear"
        ),
        subcommand_required
    )]
    pub async fn todo(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Add a task
    #[poise::command(prefix_command, slash_command, rename = "add")]
    pub async fn todo_add(
        ctx: Context<'_>,
        #[description = "The task"]
        #[rest]
        content: String,
    ) -> Result<(), Error> {
        let position = ctx
            .data()
            .service
            .reminder
            .add_todo(ctx.author().id.get(), &content)
            .await?;
        ctx.say(format!("✅ Added task #{position}: {}", truncate(&content, 100)))
            .await?;
        Ok(())
    }

    /// Show your to-do list
    #[poise::command(prefix_command, slash_command, rename = "list")]
    pub async fn todo_list(ctx: Context<'_>) -> Result<(), Error> {
        let todos = ctx
            .data()
            .service
            .reminder
            .todos(ctx.author().id.get())
            .await?;
        if todos.is_empty() {
            ctx.say("Your to-do list is empty. Add a task with `todo add <task>`.")
                .await?;
            return Ok(());
        }

        let done = todos.iter().filter(|t| t.completed).count();
        let lines: Vec<String> = todos
            .iter()
            .enumerate()
            .map(|(i, t)| {
                if t.completed {
                    format!("`{}.` ✅ ~~{}~~", i + 1, truncate(&t.content, 100))
                } else {
                    format!("`{}.` ⬜ {}", i + 1, truncate(&t.content, 100))
                }
            })
            .collect();
        let embed = CreateEmbed::new()
            .title(format!("📝 {}'s To-Do List", ctx.author().name))
            .description(truncate(&lines.join("\n"), 4000))
            .footer(CreateEmbedFooter::new(format!(
                "{done}/{} completed",
                todos.len()
            )))
            .color(TODO_COLOR);
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Mark a task as done
    #[poise::command(prefix_command, slash_command, rename = "complete", aliases("done"))]
    pub async fn todo_complete(
        ctx: Context<'_>,
        #[description = "Task number"] number: usize,
    ) -> Result<(), Error> {
        let todo = ctx
            .data()
            .service
            .reminder
            .set_todo_completed(ctx.author().id.get(), number, true)
            .await?;
        ctx.say(format!(
            "✅ Marked task #{number} as completed: {}",
            truncate(&todo.content, 100)
        ))
        .await?;
        Ok(())
    }

    /// Mark a task as not done
    #[poise::command(prefix_command, slash_command, rename = "uncomplete", aliases("undo"))]
    pub async fn todo_uncomplete(
        ctx: Context<'_>,
        #[description = "Task number"] number: usize,
    ) -> Result<(), Error> {
        let todo = ctx
            .data()
            .service
            .reminder
            .set_todo_completed(ctx.author().id.get(), number, false)
            .await?;
        ctx.say(format!(
            "⬜ Marked task #{number} as not completed: {}",
            truncate(&todo.content, 100)
        ))
        .await?;
        Ok(())
    }

    /// Delete a task
    #[poise::command(prefix_command, slash_command, rename = "remove", aliases("delete"))]
    pub async fn todo_remove(
        ctx: Context<'_>,
        #[description = "Task number"] number: usize,
    ) -> Result<(), Error> {
        let todo = ctx
            .data()
            .service
            .reminder
            .remove_todo(ctx.author().id.get(), number)
            .await?;
        ctx.say(format!(
            "🗑️ Removed task #{number}: {}",
            truncate(&todo.content, 100)
        ))
        .await?;
        Ok(())
    }

    /// Clear all tasks, or only completed ones
    #[poise::command(prefix_command, slash_command, rename = "clear")]
    pub async fn todo_clear(
        ctx: Context<'_>,
        #[description = "all or completed"] scope: Option<TodoClearScope>,
    ) -> Result<(), Error> {
        let completed_only = scope.unwrap_or_default() == TodoClearScope::Completed;
        let removed = ctx
            .data()
            .service
            .reminder
            .clear_todos(ctx.author().id.get(), completed_only)
            .await?;
        let msg = match (removed, completed_only) {
            (0, true) => "You don't have any completed tasks.".to_string(),
            (0, false) => "Your to-do list is already empty.".to_string(),
            (n, true) => format!("Cleared {n} completed task(s)."),
            (n, false) => format!("Cleared {n} task(s)."),
        };
        ctx.say(msg).await?;
        Ok(())
    }
}

impl Cog for RemindersCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::remind(), Self::remindme(), Self::todo()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_content_is_untouched() {
        assert_eq!(truncate("buy milk", 100), "buy milk");
    }

    #[test]
    fn test_truncate_long_content_gets_ellipsis() {
        let long = "a".repeat(150);
        let out = truncate(&long, 100);
        assert_eq!(out.chars().count(), 100);
        assert!(out.ends_with("..."));
    }
}
