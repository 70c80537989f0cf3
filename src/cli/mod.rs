mod commands;
mod handlers;

pub use commands::{Cli, Commands, GlobalArgs, ServeArgs};
pub use handlers::{
    handle_add, handle_delete, handle_get, handle_groups, handle_list, handle_pin, handle_serve,
    handle_update,
};
