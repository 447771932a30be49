use crate::CLAP_STYLING;
use clap::{ArgAction, arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("seedbed")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("seedbed")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Only log warnings and errors").required(false))
        .arg(
            arg!(--"db" <PATH>)
                .required(false)
                .global(true)
                .help("Location of the frontier database")
                .default_value("~/.config/seedbed/frontier.db"),
        )
        .arg(
            arg!(--"config" <PATH>)
                .required(false)
                .global(true)
                .help("JSON file with injector settings (default score, interval, override keys)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .subcommand_required(true)
        .subcommand(
            command!("init")
                .about("Initializes the frontier database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Directory to store the frontier database in")
                        .default_value("~/.config/seedbed/"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Replaces any existing database at the specified location.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("inject")
                .about("Adds seed URLs to the frontier. URLs that are already stored are left alone.")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The URL to inject")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("seeds-file"),
                )
                .arg(
                    arg!(-H --"seeds-file" <PATH>)
                        .required(false)
                        .help("Seed list: one URL per line, optionally followed by tab separated key=value metadata")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(meta_arg())
                .arg(
                    arg!(--"score" <SCORE>)
                        .required(false)
                        .help("Default score for injected URLs")
                        .value_parser(clap::value_parser!(f32)),
                )
                .arg(
                    arg!(--"interval" <SECONDS>)
                        .required(false)
                        .help("Default fetch interval for injected URLs")
                        .value_parser(clap::value_parser!(i32)),
                ),
        )
        .subcommand(
            command!("redirect")
                .about(
                    "Stores a permanent redirect and seeds its target, unless the redirecting \
                URL is already stored.",
                )
                .arg(
                    arg!(--"from" <URL>)
                        .required(true)
                        .help("The redirecting URL")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"via" <URL>)
                        .required(false)
                        .help("Intermediate hop, in order (repeatable)")
                        .value_parser(clap::value_parser!(Url))
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(--"to" <URL>)
                        .required(true)
                        .help("The final redirect target")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(meta_arg()),
        )
        .subcommand(
            command!("document")
                .about("Stores a document fetched elsewhere as an already fetched page")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL of the document")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-c --"content" <PATH>)
                        .required(false)
                        .help("File holding the document body")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-t --"content-type" <MIME>)
                        .required(false)
                        .help("MIME type of the content")
                        .default_value("text/html"),
                )
                .arg(
                    arg!(-b --"batch-id" <ID>)
                        .required(true)
                        .help("The fetch batch this document belongs to"),
                )
                .arg(
                    arg!(--"header" <NAME_VALUE>)
                        .required(false)
                        .help("Protocol header as name=value (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(meta_arg()),
        )
        .subcommand(
            command!("has")
                .about("Checks whether a URL is in the frontier. Exits with 1 when it is not.")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to look up")
                        .value_parser(clap::value_parser!(Url)),
                ),
        )
        .subcommand(
            command!("show")
                .about("Prints the stored record for a URL as JSON")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to look up")
                        .value_parser(clap::value_parser!(Url)),
                ),
        )
        .subcommand(command!("list").about("Lists every stored key and its URL"))
}

fn meta_arg() -> clap::Arg {
    arg!(-m --"meta" <KEY_VALUE>)
        .required(false)
        .help("Metadata as key=value (repeatable). nutch.score and nutch.fetchInterval override the defaults.")
        .action(ArgAction::Append)
}
