use colored::Colorize;
use commands::command_argument_builder;
use seedbed::handlers::{
    handle_document, handle_has, handle_init, handle_inject, handle_list, handle_redirect,
    handle_show,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // RUST_LOG wins over the quiet flag
    let default_level = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let result = match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("inject", primary_command)) => handle_inject(primary_command),
        Some(("redirect", primary_command)) => handle_redirect(primary_command),
        Some(("document", primary_command)) => handle_document(primary_command),
        Some(("has", primary_command)) => match handle_has(primary_command) {
            Ok(true) => Ok(()),
            Ok(false) => std::process::exit(1),
            Err(e) => Err(e),
        },
        Some(("show", primary_command)) => handle_show(primary_command),
        Some(("list", primary_command)) => handle_list(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        debug!("command failed: {:?}", e);
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
