//! Command help grouped by category.

use std::collections::BTreeMap;

use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;

use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;

const HELP_COLOR: u32 = 0x3498DB;
const UNCATEGORIZED: &str = "Other";

type Cmd = Command<Data, Error>;

fn category_of(cmd: &Cmd) -> &str {
    cmd.category.as_deref().unwrap_or(UNCATEGORIZED)
}

fn visible(commands: &[Cmd]) -> impl Iterator<Item = &Cmd> {
    commands.iter().filter(|c| !c.hide_in_help)
}

/// Looks up a command by a space separated path, matching names and aliases.
fn find_command<'a>(commands: &'a [Cmd], path: &str) -> Option<(&'a Cmd, String)> {
    let mut current = commands;
    let mut found: Option<&Cmd> = None;
    let mut full = Vec::new();
    for part in path.split_whitespace() {
        let part = part.to_lowercase();
        let cmd = current.iter().find(|c| {
            c.name.eq_ignore_ascii_case(&part) || c.aliases.iter().any(|a| a.eq_ignore_ascii_case(&part))
        })?;
        full.push(cmd.name.clone());
        current = &cmd.subcommands;
        found = Some(cmd);
    }
    found.map(|cmd| (cmd, full.join(" ")))
}

fn usage(prefix: &str, path: &str, cmd: &Cmd) -> String {
    let mut out = format!("{prefix}{path}");
    if !cmd.subcommands.is_empty() {
        out.push_str(" <subcommand>");
    }
    for param in &cmd.parameters {
        if param.required {
            out.push_str(&format!(" <{}>", param.name));
        } else {
            out.push_str(&format!(" [{}]", param.name));
        }
    }
    out
}

fn by_category(commands: &[Cmd]) -> BTreeMap<&str, Vec<&Cmd>> {
    let mut grouped: BTreeMap<&str, Vec<&Cmd>> = BTreeMap::new();
    for cmd in visible(commands) {
        grouped.entry(category_of(cmd)).or_default().push(cmd);
    }
    grouped
}

fn overview_embed(prefix: &str, commands: &[Cmd]) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("Help")
        .description(format!(
            "Use `{prefix}help <command>` for details on a command or `{prefix}help <category>` for a category."
        ))
        .color(HELP_COLOR);
    for (category, cmds) in by_category(commands) {
        let names: Vec<String> = cmds.iter().map(|c| format!("`{}`", c.name)).collect();
        embed = embed.field(category, names.join(" "), false);
    }
    embed
}

fn category_embed(prefix: &str, category: &str, cmds: &[&Cmd]) -> CreateEmbed {
    let lines: Vec<String> = cmds
        .iter()
        .map(|c| {
            format!(
                "`{prefix}{}` {}",
                c.name,
                c.description.as_deref().unwrap_or("No description")
            )
        })
        .collect();
    CreateEmbed::new()
        .title(format!("{category} Commands"))
        .description(lines.join("\n"))
        .color(HELP_COLOR)
}

fn command_embed(prefix: &str, path: &str, cmd: &Cmd) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(format!("{prefix}{path}"))
        .description(
            cmd.help_text
                .as_deref()
                .or(cmd.description.as_deref())
                .unwrap_or("No description"),
        )
        .field("Usage", format!("`{}`", usage(prefix, path, cmd)), false)
        .color(HELP_COLOR)
        .footer(CreateEmbedFooter::new(format!(
            "Category: {}",
            category_of(cmd)
        )));
    if !cmd.aliases.is_empty() {
        embed = embed.field("Aliases", cmd.aliases.join(", "), false);
    }
    if !cmd.subcommands.is_empty() {
        let subs: Vec<String> = visible(&cmd.subcommands)
            .map(|s| {
                format!(
                    "`{}` {}",
                    s.name,
                    s.description.as_deref().unwrap_or("")
                )
            })
            .collect();
        embed = embed.field("Subcommands", subs.join("\n"), false);
    }
    embed
}

pub struct HelpCog;

impl HelpCog {
    /// Show help for all commands, one command or one category
    #[poise::command(prefix_command, slash_command, category = "Utility")]
    pub async fn help(
        ctx: Context<'_>,
        #[description = "Command or category"]
        #[rest]
        query: Option<String>,
    ) -> Result<(), Error> {
        let prefix = ctx.data().config.prefix.clone();
        let commands = &ctx.framework().options().commands;

        let embed = match query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            None => overview_embed(&prefix, commands),
            Some(query) => {
                if let Some((cmd, path)) = find_command(commands, query) {
                    command_embed(&prefix, &path, cmd)
                } else if let Some((category, cmds)) = by_category(commands)
                    .into_iter()
                    .find(|(c, _)| c.eq_ignore_ascii_case(query))
                {
                    category_embed(&prefix, category, &cmds)
                } else {
                    ctx.say(format!(
                        "No command or category named `{query}`. Use `{prefix}help` to see everything."
                    ))
                    .await?;
                    return Ok(());
                }
            }
        };
        ctx.send(CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

impl Cog for HelpCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::help()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::commands::Cogs;

    #[test]
    fn test_find_command_by_alias() {
        let commands = Cogs.commands();
        let (cmd, path) = find_command(&commands, "bal").unwrap();
        assert_eq!(cmd.name, "balance");
        assert_eq!(path, "balance");
    }

    #[test]
    fn test_find_nested_subcommand() {
        let commands = Cogs.commands();
        let (cmd, path) = find_command(&commands, "remind set").unwrap();
        assert_eq!(cmd.name, "add");
        assert_eq!(path, "remind add");
    }

    #[test]
    fn test_find_unknown_command() {
        let commands = Cogs.commands();
        assert!(find_command(&commands, "definitely_not_a_command").is_none());
        assert!(find_command(&commands, "").is_none());
    }

    #[test]
    fn test_every_top_level_command_has_a_category() {
        let commands = Cogs.commands();
        let missing: Vec<&str> = commands
            .iter()
            .filter(|c| c.category.is_none())
            .map(|c| c.name.as_str())
            .collect();
        assert!(missing.is_empty(), "uncategorised: {missing:?}");
    }

    #[test]
    fn test_usage_marks_optional_parameters() {
        let commands = Cogs.commands();
        let (cmd, path) = find_command(&commands, "help").unwrap();
        assert_eq!(usage("!", &path, cmd), "!help [query]");
    }
}
