//! Command handlers

use std::io;

use clap::CommandFactory;
use colored::Colorize;
use tracing::{debug, instrument};

use crate::application::services::CredentialService;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output::{self, CellStyle, Column};
use crate::cli::progress::BarProgress;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{validate_email, validate_phone, DomainError, UserCredentials};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{FileSystem, Prompter};
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Add { name, setup }) => cmd_add(container, name, *setup),
        Some(Commands::List) => cmd_list(container),
        Some(Commands::Remove { name, yes }) => cmd_remove(container, name, *yes),
        Some(Commands::User { setup, .. }) => {
            if *setup {
                cmd_user_setup(container).map(|_| ())
            } else {
                cmd_user_show(container)
            }
        }
        Some(Commands::Config { command }) => cmd_config(container, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map_err(|e| InfraError::io("print help", e).into()),
    }
}

fn input_err(e: io::Error) -> CliError {
    InfraError::io("read user input", e).into()
}

fn confirm(prompter: &dyn Prompter, message: &str, default: bool) -> CliResult<bool> {
    prompter.confirm(message, default).map_err(input_err)
}

/// Ask until `validate` accepts the answer.
fn prompt_until_valid(
    prompter: &dyn Prompter,
    message: &str,
    invalid: &str,
    validate: impl Fn(&str) -> Result<String, DomainError>,
) -> CliResult<String> {
    loop {
        let answer = prompter.prompt(message).map_err(input_err)?;
        match validate(&answer) {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!("rejected input: {}", e);
                output::error(invalid);
            }
        }
    }
}

#[instrument(skip(container))]
fn cmd_add(container: &ServiceContainer, name: &str, setup: bool) -> CliResult<()> {
    let credentials = container.credential_service();
    let user = if setup || !credentials.has_credentials() {
        setup_credentials(container.prompter.as_ref(), &credentials)?
    } else {
        credentials
            .load()?
            .ok_or(ApplicationError::CredentialsMissing)?
    };

    let service = container.connection_service();
    if let Some(existing) = service.find(name)? {
        output::warning(&format!(
            "Connection with name '{}' already exists.",
            existing.name.bold()
        ));
        let replace = confirm(
            container.prompter.as_ref(),
            &format!("Remove the existing connection '{}' and continue?", existing.name),
            false,
        )?;
        if !replace {
            output::info("Operation cancelled.");
            return Ok(());
        }
        service.remove(&existing.name)?;
        output::success(&format!("Removed connection: {}", existing.name.bold()));
    }

    let progress = BarProgress::new("Adding plaid connection...");
    let result = service.add(name, &user, &progress);
    progress.finish();
    let connection = result?;

    output::success(&format!(
        "Successfully added connection: {}",
        connection.name.bold()
    ));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_list(container: &ServiceContainer) -> CliResult<()> {
    let connections = container.connection_service().list()?;
    if connections.is_empty() {
        output::caution("No financial connections found.");
        output::bold("Add a connection with: ttyf add <name>");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = connections
        .into_iter()
        .map(|c| vec![c.id, c.name, c.date_added])
        .collect();
    output::table(
        "Your Financial Connections",
        &[
            Column::new("ID", CellStyle::Dim),
            Column::new("Name", CellStyle::Bold),
            Column::new("Date Added", CellStyle::Plain),
        ],
        &rows,
    );
    Ok(())
}

#[instrument(skip(container))]
fn cmd_remove(container: &ServiceContainer, name: &str, yes: bool) -> CliResult<()> {
    let service = container.connection_service();
    let connection = service
        .find(name)?
        .ok_or_else(|| DomainError::ConnectionNotFound(name.trim().to_string()))?;

    if !yes {
        let confirmed = confirm(
            container.prompter.as_ref(),
            &format!(
                "Are you sure you want to remove the connection to {}?",
                connection.name.bold()
            ),
            false,
        )?;
        if !confirmed {
            output::info("Operation cancelled.");
            return Ok(());
        }
    }

    let removed = service.remove(&connection.name)?;
    output::success(&format!(
        "Successfully removed connection: {}",
        removed.name.bold()
    ));
    Ok(())
}

/// Interactive credential setup. Re-prompts until email and phone are valid.
fn setup_credentials(
    prompter: &dyn Prompter,
    service: &CredentialService,
) -> CliResult<UserCredentials> {
    output::bold("Setting up user credentials for Plaid...");

    let email = prompt_until_valid(
        prompter,
        "Enter your email address:",
        "Please enter a valid email address.",
        validate_email,
    )?;
    let phone = prompt_until_valid(
        prompter,
        "Enter your Canadian phone number (10 digits only, no spaces or dashes):",
        "Please enter exactly 10 digits for your Canadian phone number.",
        validate_phone,
    )?;

    let credentials = service.save(&email, &phone)?;
    output::success("User credentials saved successfully!");
    Ok(credentials)
}

#[instrument(skip(container))]
fn cmd_user_setup(container: &ServiceContainer) -> CliResult<UserCredentials> {
    setup_credentials(
        container.prompter.as_ref(),
        &container.credential_service(),
    )
}

#[instrument(skip(container))]
fn cmd_user_show(container: &ServiceContainer) -> CliResult<()> {
    match container.credential_service().load() {
        Ok(Some(credentials)) => {
            output::table(
                "User Credentials",
                &[
                    Column::new("Field", CellStyle::Bold),
                    Column::new("Value", CellStyle::Plain),
                ],
                &[
                    vec!["Email".to_string(), credentials.email.clone()],
                    vec!["Phone".to_string(), credentials.masked_phone()],
                ],
            );
            Ok(())
        }
        Ok(None) => {
            output::caution("No user credentials found.");
            output::bold("Set up credentials with: ttyf user --setup");
            Ok(())
        }
        Err(e @ ApplicationError::CorruptFile(_)) => {
            output::error("Could not read credentials file. It may be corrupted.");
            output::bold("Set up credentials again with: ttyf user --setup");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(container))]
fn cmd_config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init => {
            let path = global_config_path()
                .ok_or_else(|| CliError::Usage("cannot determine config directory".into()))?;
            if container.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            container
                .fs
                .ensure_parent(&path)
                .and_then(|_| container.fs.write_atomic(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("Created {}", path.display()));
            Ok(())
        }
        ConfigCommands::Path => {
            let settings = &container.settings;
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unavailable)".into());
            output::info(&format!("config:      {global}"));
            output::info(&format!("storage:     {}", settings.storage_dir.display()));
            output::info(&format!("connections: {}", settings.connections_path().display()));
            output::info(&format!("credentials: {}", settings.credentials_path().display()));
            output::info(&format!("secrets:     {}", settings.secrets_path().display()));
            Ok(())
        }
    }
}
