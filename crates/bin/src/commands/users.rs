//! User administration commands.
//!
//! These open the backend directly, so run them while the server is stopped
//! when using the in-memory backend; the server overwrites its JSON file on
//! shutdown.

use tollgate::{UserState, user::valid_username_password};

use crate::backend::open_user_state;
use crate::cli::{UsersAddArgs, UsersCommand, UsersListArgs, UsersPromoteArgs};
use crate::output::{OutputFormat, UserRow, print_users};

/// Collect the flags shown for a user.
pub async fn user_row(users: &UserState, username: String) -> UserRow {
    UserRow {
        email: users.email(&username).await.unwrap_or_default(),
        confirmed: users.is_confirmed(&username).await,
        admin: users.is_admin(&username).await,
        logged_in: users.is_logged_in(&username).await,
        username,
    }
}

/// Run a `users` subcommand
pub async fn run(
    command: &UsersCommand,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        UsersCommand::List(args) => list(args, format).await,
        UsersCommand::Add(args) => add(args).await,
        UsersCommand::Promote(args) => promote(args).await,
    }
}

async fn list(args: &UsersListArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let (users, _backend) = open_user_state(&args.backend_config).await?;
    let mut usernames = users.all_usernames().await?;
    usernames.sort();

    let mut rows = Vec::with_capacity(usernames.len());
    for username in usernames {
        rows.push(user_row(&users, username).await);
    }
    print_users(&rows, format)?;
    users.close().await?;
    Ok(())
}

async fn add(args: &UsersAddArgs) -> Result<(), Box<dyn std::error::Error>> {
    valid_username_password(&args.username, &args.password)?;

    let (users, backend) = open_user_state(&args.backend_config).await?;
    if users.try_has_user(&args.username).await? {
        return Err(format!("User '{}' already exists", args.username).into());
    }

    users
        .add_user(&args.username, &args.password, &args.email)
        .await?;
    if args.confirmed {
        users.mark_confirmed(&args.username).await?;
    } else {
        let code = users.generate_unique_confirmation_code().await?;
        users.add_unconfirmed(&args.username, &code).await?;
        println!("Confirmation link: /confirm/{code}");
    }
    if args.admin {
        users.set_admin_status(&args.username).await?;
    }

    backend.save().await?;
    users.close().await?;
    println!("Added user {}", args.username);
    Ok(())
}

async fn promote(args: &UsersPromoteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (users, backend) = open_user_state(&args.backend_config).await?;
    if !users.try_has_user(&args.username).await? {
        return Err(format!("No such user '{}'", args.username).into());
    }
    users.set_admin_status(&args.username).await?;

    backend.save().await?;
    users.close().await?;
    println!("{} is now an administrator", args.username);
    Ok(())
}
