pub mod database;
pub mod logging;
pub mod session;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_TENANT: &str = "tenant";
pub const ARG_USERNAME: &str = "username";
pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";

fn tenant_arg() -> Arg {
    Arg::new(ARG_TENANT)
        .short('t')
        .long(ARG_TENANT)
        .help("Tenant the user belongs to")
        .env("TESSERA_TENANT")
        .required(true)
}

fn username_arg() -> Arg {
    Arg::new(ARG_USERNAME)
        .short('u')
        .long(ARG_USERNAME)
        .help("Username within the tenant")
        .env("TESSERA_USERNAME")
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .long(ARG_PASSWORD)
        .help("Plaintext password, prefer the TESSERA_PASSWORD environment variable")
        .env("TESSERA_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("tessera")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("reaper").about("Periodically delete idle tickets until interrupted"),
        )
        .subcommand(Command::new("sweep").about("Delete idle tickets once and exit"))
        .subcommand(Command::new("migrate").about("Create the profiles and tickets tables"))
        .subcommand(
            Command::new("login")
                .about("Authenticate a user and print the issued ticket")
                .arg(tenant_arg())
                .arg(username_arg())
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("add-user")
                .about("Create a profile with an Argon2 password hash")
                .arg(tenant_arg())
                .arg(username_arg())
                .arg(
                    Arg::new(ARG_EMAIL)
                        .short('e')
                        .long(ARG_EMAIL)
                        .help("Contact email")
                        .env("TESSERA_EMAIL")
                        .required(true),
                )
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("hash-password")
                .about("Print the Argon2 hash of a password")
                .arg(password_arg()),
        );

    let command = database::with_args(command);
    let command = session::with_args(command);
    logging::with_args(command)
}
