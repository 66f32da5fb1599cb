use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;

use crate::config::Config;
use crate::database::Database;
use crate::error::CarpoolError;
use crate::groups::{CreateGroupParams, Group, Member};
use crate::schedules::{Schedule, ScheduleItem};

#[derive(Parser)]
#[command(
    name = "carpool",
    version,
    about = "Carpool: driver rotations for commuter groups"
)]
pub struct Cli {
    /// Database file (overrides the configured path)
    #[arg(long = "db", global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the server (default if no command specified)
    Serve,

    /// Manage carpool groups
    Groups {
        #[command(subcommand)]
        command: GroupCommand,
    },

    /// Generate or show a group's driving schedule
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },
}

#[derive(Subcommand)]
pub enum GroupCommand {
    /// List all groups
    List,

    /// Show one group
    Show { name: String },

    /// Create a group. Members rotate in the order given
    Create {
        name: String,

        /// Member as "Name" or "Name:email" (repeat for each member)
        #[arg(long = "member", short = 'm', required = true, value_parser = parse_member)]
        members: Vec<Member>,

        /// Weekday the group drives, Monday to Friday (repeatable)
        #[arg(long = "day", short = 'd', required = true)]
        days: Vec<String>,

        /// Rotation window in calendar days: 10, 20 or 30
        #[arg(long = "cycle", short = 'c', default_value_t = 10)]
        cycle_days: i64,
    },

    /// Delete a group and its schedule
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum ScheduleCommand {
    /// Generate a new schedule unless the current one is still active
    Generate {
        group: String,

        /// First calendar day of the rotation window (YYYY-MM-DD)
        #[arg(long = "start")]
        start: NaiveDate,

        /// Date to judge the existing schedule against (default: local today)
        #[arg(long = "today")]
        today: Option<NaiveDate>,
    },

    /// Show a group's stored schedule
    Show { group: String },
}

fn parse_member(s: &str) -> Result<Member, String> {
    let (name, email) = match s.split_once(':') {
        Some((name, email)) => (name, Some(email.trim().to_string())),
        None => (s, None),
    };

    if name.trim().is_empty() {
        return Err("member name cannot be empty".to_string());
    }

    Ok(Member {
        name: name.trim().to_string(),
        email: email.filter(|e| !e.is_empty()),
    })
}

impl Cli {
    pub fn handle_command_line() -> Result<(), CarpoolError> {
        let args = Cli::parse();
        let config = Config::get()?;

        let db_path = args
            .db
            .unwrap_or_else(|| PathBuf::from(&config.database.path));

        // Default to Serve if no command specified
        match args.command.unwrap_or(Command::Serve) {
            Command::Serve => Self::start_server(config, db_path),
            Command::Groups { command } => Self::handle_groups(&Database::open(&db_path)?, command),
            Command::Schedule { command } => {
                Self::handle_schedule(&Database::open(&db_path)?, command)
            }
        }
    }

    fn start_server(config: &Config, db_path: PathBuf) -> Result<(), CarpoolError> {
        let host = config.server.host.clone();
        let port = config.server.port;

        info!("Starting server on {}:{} using {}", host, port, db_path.display());

        let db = Database::open(&db_path)?;

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| CarpoolError::Error(format!("Failed to create runtime: {}", e)))?;

        rt.block_on(async {
            let web_server = crate::server::WebServer::new(host, port, db);
            web_server.start().await
        })
    }

    fn handle_groups(db: &Database, command: GroupCommand) -> Result<(), CarpoolError> {
        let conn = db.get_connection()?;

        match command {
            GroupCommand::List => {
                let groups = Group::list(&conn)?;
                if groups.is_empty() {
                    println!("No groups");
                }
                for group in groups {
                    println!(
                        "{:<4} {:<24} {} members, {} day cycle, {}",
                        group.group_id,
                        group.name,
                        group.members.len(),
                        group.cycle_days.as_i64(),
                        days_label(&group)
                    );
                }
            }
            GroupCommand::Show { name } => {
                let group = Group::require_by_name(&conn, &name)?;
                print_group(&group);
            }
            GroupCommand::Create {
                name,
                members,
                days,
                cycle_days,
            } => {
                let params = CreateGroupParams {
                    name,
                    members,
                    days,
                    cycle_days,
                };
                let group =
                    Database::immediate_transaction(&conn, |c| Group::create_immediate(c, params))?;
                println!("Created group '{}' (id {})", group.name, group.group_id);
            }
            GroupCommand::Delete { name } => {
                Database::immediate_transaction(&conn, |c| Group::delete_immediate(c, &name))?;
                println!("Deleted group '{}'", name);
            }
        }

        Ok(())
    }

    fn handle_schedule(db: &Database, command: ScheduleCommand) -> Result<(), CarpoolError> {
        let conn = db.get_connection()?;

        match command {
            ScheduleCommand::Generate {
                group,
                start,
                today,
            } => {
                let result = match today {
                    Some(today) => Database::immediate_transaction(&conn, |c| {
                        Schedule::generate_immediate(c, &group, start, today)
                    }),
                    None => Schedule::generate(&conn, &group, start),
                };

                match result {
                    Ok(items) => print_items(&items),
                    Err(CarpoolError::ScheduleActive(conflict)) => {
                        print_items(&conflict.schedule.items);
                        return Err(CarpoolError::ScheduleActive(conflict));
                    }
                    Err(e) => return Err(e),
                }
            }
            ScheduleCommand::Show { group } => {
                let schedule = Schedule::get_by_group_name(&conn, &group)?;
                println!(
                    "Schedule for '{}': {} to {}",
                    group, schedule.start_date, schedule.end_date
                );
                print_items(&schedule.items);
            }
        }

        Ok(())
    }
}

fn days_label(group: &Group) -> String {
    group
        .days
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_group(group: &Group) {
    println!("Group:  {} (id {})", group.name, group.group_id);
    println!("Cycle:  {} days", group.cycle_days.as_i64());
    println!("Days:   {}", days_label(group));
    println!("Members:");
    for (i, member) in group.members.iter().enumerate() {
        match &member.email {
            Some(email) => println!("  {}. {} <{}>", i + 1, member.name, email),
            None => println!("  {}. {}", i + 1, member.name),
        }
    }
}

fn print_items(items: &[ScheduleItem]) {
    if items.is_empty() {
        println!("No driving days in the window");
    }
    for item in items {
        println!("{}  {:<9}  {}", item.date, item.date.format("%A"), item.driver);
    }
}
