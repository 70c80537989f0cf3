use clap::Parser;
use notebox::cli::{
    handle_add, handle_delete, handle_get, handle_groups, handle_list, handle_pin, handle_serve,
    handle_update, Cli, Commands,
};
use notebox::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(logging::DEFAULT_FILTER);

    let global = &cli.global;
    let result = match cli.command {
        Commands::Serve(args) => handle_serve(global, args).await,
        Commands::List {
            query,
            sort,
            group,
            json,
        } => handle_list(global, query, sort, group, json).await,
        Commands::Get { id, json } => handle_get(global, id, json).await,
        Commands::Add {
            title,
            content,
            stdin,
            group,
            json,
        } => handle_add(global, title, content, stdin, group, json).await,
        Commands::Update {
            id,
            title,
            content,
            group,
            no_group,
            json,
        } => handle_update(global, id, title, content, group, no_group, json).await,
        Commands::Delete { id, force } => handle_delete(global, id, force).await,
        Commands::Pin { id } => handle_pin(global, id).await,
        Commands::Groups => handle_groups(global).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
