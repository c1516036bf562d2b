//! Routing of persistent button clicks.
//!
//! Ticket and poll buttons outlive the command that created them, so their
//! clicks arrive as gateway interactions rather than through a collector.

use log::debug;
use poise::serenity_prelude as serenity;
use serenity::ComponentInteraction;

use crate::bot::Data;
use crate::bot::Error;
use crate::bot::commands::polls;
use crate::bot::commands::tickets;

/// What a component `custom_id` asks for.
#[derive(Debug, PartialEq, Eq)]
enum ComponentAction {
    CreateTicket,
    CloseTicket,
    ConfirmClose(bool),
    Vote(usize),
}

fn route(custom_id: &str) -> Option<ComponentAction> {
    match custom_id {
        tickets::CREATE_TICKET => Some(ComponentAction::CreateTicket),
        tickets::CLOSE_TICKET => Some(ComponentAction::CloseTicket),
        tickets::CLOSE_TICKET_CONFIRM => Some(ComponentAction::ConfirmClose(true)),
        tickets::CLOSE_TICKET_CANCEL => Some(ComponentAction::ConfirmClose(false)),
        id => polls::option_index(id).map(ComponentAction::Vote),
    }
}

pub async fn handle_component(
    ctx: &serenity::Context,
    data: &Data,
    component: &ComponentInteraction,
) -> Result<(), Error> {
    match route(&component.data.custom_id) {
        Some(ComponentAction::CreateTicket) => tickets::handle_create(ctx, data, component).await,
        Some(ComponentAction::CloseTicket) => tickets::handle_close(ctx, component).await,
        Some(ComponentAction::ConfirmClose(confirmed)) => {
            tickets::handle_close_confirm(ctx, component, confirmed).await
        }
        Some(ComponentAction::Vote(option)) => {
            polls::handle_vote(ctx, data, component, option).await
        }
        None => {
            debug!("Ignoring component `{}`", component.data.custom_id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_ticket_buttons() {
        assert_eq!(route("create_ticket"), Some(ComponentAction::CreateTicket));
        assert_eq!(route("close_ticket"), Some(ComponentAction::CloseTicket));
        assert_eq!(
            route("close_ticket_confirm"),
            Some(ComponentAction::ConfirmClose(true))
        );
        assert_eq!(
            route("close_ticket_cancel"),
            Some(ComponentAction::ConfirmClose(false))
        );
    }

    #[test]
    fn test_route_poll_vote() {
        assert_eq!(route("poll_option_3"), Some(ComponentAction::Vote(3)));
    }

    #[test]
    fn test_route_unknown_is_ignored() {
        assert_eq!(route("something_else"), None);
    }
}
