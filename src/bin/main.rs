use anyhow::{bail, Error};
use iptv_admin::{
    endpoints::{
        channels::{self, ChannelQuery},
        dashboard, groups, health, import_export, subscription,
    },
    router::{LANDING, LOGIN},
    AdminClient, Config, ThemeMode,
};
use serde::Serialize;
use std::{
    io::{self, Write},
    path::PathBuf,
};
use structopt::StructOpt;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::from_args();

    log::debug!(
        "Talking to {} with state in {}",
        args.url,
        args.state_dir.display()
    );

    let config = Config::new(args.url).with_state_dir(args.state_dir);
    let client = AdminClient::new(&config)?;
    let was_authenticated = client.is_authenticated();

    let outcome = run(&client, args.cmd).await;

    // remember the session cookie for next time, even if the command failed
    client.persist_cookies();

    if outcome.is_err() && was_authenticated && !client.is_authenticated() {
        eprintln!("Your session has expired, please log in again.");
    }

    outcome
}

async fn run(client: &AdminClient, cmd: Command) -> Result<(), Error> {
    let transport = client.transport();

    match cmd {
        Command::Login { username, password } => {
            if client.navigate(LOGIN)?.destination != LOGIN {
                let profile = client.session().profile().unwrap_or_default();
                println!(
                    "Already logged in as {} (log out first to switch users)",
                    profile.username().unwrap_or("an unknown user")
                );
                return Ok(());
            }

            let profile = client.login(&username, &password).await?;
            println!(
                "Logged in as {}",
                profile.username().unwrap_or(&username)
            );
        },
        Command::Logout => {
            client.logout().await;
            println!("Logged out");
        },
        Command::Whoami => {
            visit(client, "/settings")?;
            let profile = client.refresh_profile().await?;
            print_json(profile.fields())?;
        },
        Command::ResetToken => {
            visit(client, "/settings")?;
            let token = client.reset_credential().await?;
            println!("{}", token);
        },
        Command::ChangePassword { old, new } => {
            visit(client, "/settings")?;
            client.session().change_password(transport, &old, &new).await?;
            println!("Password changed");
        },
        Command::ChangeUsername { username } => {
            visit(client, "/settings")?;
            let username =
                client.session().change_username(transport, &username).await?;
            println!("Username changed to {}", username);
        },
        Command::Dashboard => {
            visit(client, LANDING)?;
            print_json(&dashboard::get(transport).await?)?;
        },
        Command::Channels {
            group,
            search,
            page,
        } => {
            visit(client, "/channels")?;
            let query = ChannelQuery {
                group_id: group,
                search,
                page,
                ..Default::default()
            };
            print_json(&channels::list(transport, &query).await?)?;
        },
        Command::Groups { with_channels } => {
            visit(client, "/groups")?;
            print_json(&groups::list(transport, with_channels).await?)?;
        },
        Command::Health { check, check_all } => {
            visit(client, "/channels")?;
            let status = match check {
                Some(id) => health::check_one(transport, id).await?,
                None if check_all => health::check_all(transport).await?,
                None => health::status(transport).await?,
            };
            print_json(&status)?;
        },
        Command::Subscription => {
            visit(client, "/subscription")?;
            print_json(&subscription::urls(transport).await?)?;
        },
        Command::Export { format } => {
            visit(client, "/channels")?;
            let playlist = import_export::export(transport, &format).await?;
            io::stdout().write_all(&playlist)?;
        },
        Command::SiteName { name: Some(name) } => {
            visit(client, "/settings")?;
            client.site().update_site_name(transport, &name).await?;
            println!("{}", client.site().site_name());
        },
        Command::SiteName { name: None } => {
            visit(client, LANDING)?;
            println!("{}", client.site().fetch_settings(transport).await);
        },
        Command::Theme { mode } => {
            let theme = client.theme();
            if let Some(mode) = mode {
                theme.set_mode(mode);
            }
            println!("{}", theme.mode());
        },
    }

    Ok(())
}

/// Move to a page before using it, the same way a user would.
fn visit(client: &AdminClient, path: &str) -> Result<(), Error> {
    let navigation = client.navigate(path)?;

    if navigation.was_redirected() && navigation.destination == LOGIN {
        bail!("You need to log in first (try `iptv-admin login`)");
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, StructOpt)]
#[structopt(name = "iptv-admin", about = "Manage an IPTV proxy server")]
struct Args {
    #[structopt(
        long = "url",
        env = "IPTV_ADMIN_URL",
        default_value = "http://localhost:5000",
        help = "The server's base URL"
    )]
    url: Url,
    #[structopt(
        long = "state-dir",
        env = "IPTV_ADMIN_STATE_DIR",
        default_value = ".iptv-admin",
        parse(from_os_str),
        help = "Where to keep the session between runs"
    )]
    state_dir: PathBuf,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Log in to the server.
    Login {
        #[structopt(short = "u", long = "username", help = "Your username")]
        username: String,
        #[structopt(
            short = "p",
            long = "password",
            env = "IPTV_ADMIN_PASSWORD",
            hide_env_values = true,
            help = "Your password"
        )]
        password: String,
    },
    /// Log out, forgetting the stored session.
    Logout,
    /// Show the logged in user's profile.
    Whoami,
    /// Generate a new subscription token.
    ResetToken,
    ChangePassword {
        #[structopt(long = "old")]
        old: String,
        #[structopt(long = "new")]
        new: String,
    },
    ChangeUsername { username: String },
    /// Show the dashboard summary.
    Dashboard,
    /// List channels.
    Channels {
        #[structopt(long = "group", help = "Only show this group's channels")]
        group: Option<u64>,
        #[structopt(long = "search")]
        search: Option<String>,
        #[structopt(long = "page")]
        page: Option<u32>,
    },
    /// List channel groups.
    Groups {
        #[structopt(long = "with-channels")]
        with_channels: bool,
    },
    /// Show or refresh channel health.
    Health {
        #[structopt(long = "check", help = "Check a single channel")]
        check: Option<u64>,
        #[structopt(long = "check-all", conflicts_with = "check")]
        check_all: bool,
    },
    /// Show the playlist subscription URLs.
    Subscription,
    /// Write every channel to stdout as a playlist.
    Export {
        #[structopt(long = "format", default_value = "m3u")]
        format: String,
    },
    /// Show or change the site's display name.
    SiteName { name: Option<String> },
    /// Show or change the preferred theme (light, dark or system).
    Theme { mode: Option<ThemeMode> },
}
