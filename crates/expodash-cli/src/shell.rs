//! Interactive dashboard.
//!
//! Each login gets its own `SessionManager`, the terminal equivalent of
//! a page load: once a session expires or logs out, the shell drops back
//! to the login prompt and builds a new one. Every line typed counts as
//! activity and pushes the inactivity deadline out.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{debug, warn};

use expodash_core::auth::KeyValueStore;
use expodash_core::models::{NewOrganizer, OrganizerUpdate, EXHIBIT_TAGS};
use expodash_core::{ActivityKind, ApiClient, Config, SessionState};

use crate::{display, new_session};

type Input = Lines<BufReader<Stdin>>;

enum PageExit {
    Quit,
    LoggedOut,
}

const HELP: &str = "\
Commands:
  dashboard                      organizers and alerts at a glance
  organizers                     list organizers
  organizer <id>                 show one organizer
  update-organizer <id> k=v ...  edit fname, lname, email, contact_no, password
  delete-organizer <id>          remove an organizer
  alerts                         list alerts
  send-alert <text>              broadcast an alert
  tags                           list exhibit tags
  buildings <tag>                buildings with exhibits carrying a tag
  status                         session details
  logout                         end the session
  quit                           exit";

pub async fn run(config: &Config, store: Arc<dyn KeyValueStore>, base: &ApiClient) -> Result<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let session = new_session(config, store.clone());
        let client = base.with_session(session.clone());

        if !session.is_authenticated() {
            let logged_in = login_prompt(&client, config, &mut input).await?;
            if !logged_in {
                return Ok(());
            }
        }

        let _binding = session.bind()?;
        match dashboard(&client, &mut input).await? {
            PageExit::Quit => return Ok(()),
            PageExit::LoggedOut => {
                println!("Logged out.");
                continue;
            }
        }
    }
}

async fn prompt(label: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

async fn read_line(input: &mut Input) -> Result<Option<String>> {
    Ok(input
        .next_line()
        .await
        .context("Failed to read input")?
        .map(|l| l.trim().to_string()))
}

/// Returns false when the user quits instead of logging in.
async fn login_prompt(client: &ApiClient, config: &Config, input: &mut Input) -> Result<bool> {
    loop {
        match &config.last_email {
            Some(email) => prompt(&format!("Email [{}] (or 'register' / 'quit'): ", email)).await?,
            None => prompt("Email (or 'register' / 'quit'): ").await?,
        }
        let Some(line) = read_line(input).await? else {
            return Ok(false);
        };

        match line.as_str() {
            "quit" | "exit" => return Ok(false),
            "register" => {
                register_prompt(client, input).await?;
                continue;
            }
            _ => {}
        }

        let email = match (line.is_empty(), &config.last_email) {
            (true, Some(last)) => last.clone(),
            _ => line,
        };
        let password = tokio::task::spawn_blocking(crate::prompt_password).await??;

        match client.login(&email, &password).await {
            Ok(record) => {
                println!("Welcome back, {}!", record.user.email);
                return Ok(true);
            }
            Err(e) => println!("{}", e.user_message()),
        }
    }
}

async fn ask(input: &mut Input, label: &str) -> Result<String> {
    prompt(label).await?;
    Ok(read_line(input).await?.unwrap_or_default())
}

async fn register_prompt(client: &ApiClient, input: &mut Input) -> Result<()> {
    let organizer = NewOrganizer {
        fname: ask(input, "First name: ").await?,
        lname: ask(input, "Last name: ").await?,
        email: ask(input, "Email: ").await?,
        contact_no: ask(input, "Contact no: ").await?,
        password: tokio::task::spawn_blocking(crate::prompt_password).await??,
    };
    match client.register(&organizer).await {
        Ok(()) => println!("Registered. You can now log in."),
        Err(e) => println!("{}", e.user_message()),
    }
    Ok(())
}

async fn dashboard(client: &ApiClient, input: &mut Input) -> Result<PageExit> {
    let session = client.session();
    let mut state = session.subscribe();
    println!("Type 'help' for commands.");

    loop {
        if *state.borrow_and_update() == SessionState::Unauthenticated {
            return Ok(PageExit::LoggedOut);
        }
        prompt("expodash> ").await?;

        let line = tokio::select! {
            line = read_line(input) => line?,
            changed = state.changed() => {
                if changed.is_err() {
                    return Ok(PageExit::LoggedOut);
                }
                println!();
                continue;
            }
        };
        let Some(line) = line else {
            return Ok(PageExit::Quit);
        };

        session.record_activity(ActivityKind::KeyPress);
        if let Some(exit) = execute(client, &line).await {
            return Ok(exit);
        }
    }
}

/// Run one command. Returns `Some` when the page should end.
async fn execute(client: &ApiClient, line: &str) -> Option<PageExit> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };
    debug!(command, "Shell command");

    match command {
        "" => {}
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Some(PageExit::Quit),
        "logout" => {
            client.session().handle_logout();
            return Some(PageExit::LoggedOut);
        }
        "status" => print_status(client),
        "dashboard" => {
            // Concurrent requests; if the token is dead both come back
            // unauthorized and the session expires once.
            let (organizers, alerts) =
                futures::join!(client.list_organizers(), client.list_alerts());
            match organizers {
                Ok(list) => display::print_organizers(&list),
                Err(e) => println!("{}", e.user_message()),
            }
            println!();
            match alerts {
                Ok(list) => display::print_alerts(&list),
                Err(e) => println!("{}", e.user_message()),
            }
        }
        "organizers" => match client.list_organizers().await {
            Ok(list) => display::print_organizers(&list),
            Err(e) => println!("{}", e.user_message()),
        },
        "organizer" if !rest.is_empty() => match client.get_organizer(rest).await {
            Ok(org) => display::print_organizer(&org),
            Err(e) => println!("{}", e.user_message()),
        },
        "update-organizer" => match parse_update(rest) {
            Ok((id, update)) => match client.update_organizer(&id, &update).await {
                Ok(()) => println!("Organizer updated."),
                Err(e) => println!("{}", e.user_message()),
            },
            Err(msg) => println!("{}", msg),
        },
        "delete-organizer" if !rest.is_empty() => match client.delete_organizer(rest).await {
            Ok(()) => println!("Organizer deleted."),
            Err(e) => println!("{}", e.user_message()),
        },
        "alerts" => match client.list_alerts().await {
            Ok(list) => display::print_alerts(&list),
            Err(e) => println!("{}", e.user_message()),
        },
        "send-alert" => match client.send_alert(rest).await {
            Ok(()) => println!("Alert sent successfully!"),
            Err(e) => println!("{}", e.user_message()),
        },
        "tags" => println!("{}", EXHIBIT_TAGS.join(", ")),
        "buildings" if !rest.is_empty() => match client.buildings_by_tag(rest).await {
            Ok(list) => display::print_buildings(rest, &list),
            Err(e) => println!("{}", e.user_message()),
        },
        other => println!("Unknown or incomplete command '{}'. Type 'help'.", other),
    }
    None
}

fn print_status(client: &ApiClient) {
    let session = client.session();
    match session.credentials().load() {
        Some(record) => {
            println!("Logged in as {}", record.user.email);
            if let Some(id) = record.organizer_id() {
                println!("Organizer ID: {}", id);
            }
        }
        None => {
            warn!("Dashboard open without stored credentials");
            println!("Not logged in");
        }
    }
    if let Some(remaining) = session.inactivity_remaining() {
        println!("Idle logout in {}s", remaining.as_secs());
    }
}

/// `<id> key=value ...` into an organizer update.
fn parse_update(args: &str) -> Result<(String, OrganizerUpdate), String> {
    let mut parts = args.split_whitespace();
    let id = parts
        .next()
        .ok_or_else(|| "Usage: update-organizer <id> key=value ...".to_string())?;

    let mut update = OrganizerUpdate::default();
    for part in parts {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("Expected key=value, got '{}'", part))?;
        let value = Some(value.to_string()).filter(|v| !v.is_empty());
        match key {
            "fname" => update.fname = value,
            "lname" => update.lname = value,
            "email" => update.email = value,
            "contact_no" => update.contact_no = value,
            "password" => update.password = value,
            other => return Err(format!("Unknown field '{}'", other)),
        }
    }
    Ok((id.to_string(), update))
}
