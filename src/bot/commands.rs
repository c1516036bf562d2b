//! Command cogs. Each cog groups the commands of one feature.

use poise::Command;

use crate::bot::Data;

pub mod about;
pub mod automod;
pub mod economy;
pub mod giveaways;
pub mod greetings;
pub mod help;
pub mod leveling;
pub mod logging;
pub mod moderation;
pub mod music;
pub mod owner;
pub mod polls;
pub mod profile;
pub mod reminders;
pub mod roles;
pub mod status;
pub mod tickets;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub use about::AboutCog;
pub use automod::AutomodCog;
pub use economy::EconomyCog;
pub use giveaways::GiveawaysCog;
pub use greetings::GreetingsCog;
pub use help::HelpCog;
pub use leveling::LevelingCog;
pub use logging::LoggingCog;
pub use moderation::ModerationCog;
pub use music::MusicCog;
pub use owner::OwnerCog;
pub use polls::PollsCog;
pub use profile::ProfileCog;
pub use reminders::RemindersCog;
pub use roles::RolesCog;
pub use status::StatusCog;
pub use tickets::TicketsCog;

pub trait Cog {
    fn commands(&self) -> Vec<Command<Data, Error>>;
}

pub struct Cogs;

impl Cog for Cogs {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        let cogs: [&dyn Cog; 17] = [
            &EconomyCog,
            &LevelingCog,
            &ProfileCog,
            &MusicCog,
            &ModerationCog,
            &AutomodCog,
            &LoggingCog,
            &TicketsCog,
            &PollsCog,
            &GiveawaysCog,
            &RemindersCog,
            &GreetingsCog,
            &RolesCog,
            &StatusCog,
            &HelpCog,
            &AboutCog,
            &OwnerCog,
        ];
        cogs.into_iter().flat_map(|cog| cog.commands()).collect()
    }
}

/// Names of every built-in command and alias, lower-cased.
pub fn builtin_names() -> Vec<String> {
    Cogs.commands()
        .iter()
        .flat_map(|c| std::iter::once(c.name.clone()).chain(c.aliases.iter().cloned()))
        .map(|n| n.to_lowercase())
        .collect()
}
