//! Yarnflow CLI - command line client for the order tracker.
//!
//! This is the entry point for the `yfctl` binary.
//!
//! ```text
//! export YARNFLOW_TOKEN=$(yfctl login admin --password admin123)
//! yfctl orders list --status booked
//! yfctl orders move <order-id> under-booking
//! yfctl chat send <order-id> "spinning starts Monday"
//! yfctl export --output orders.csv
//! ```

mod client;
mod output;
mod types;

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use client::GatewayClient;
use types::{order_type_label, status_label, CreateOrderRequest, OrderQuery};

/// Yarnflow CLI - command line client for the order tracker.
#[derive(Parser, Debug)]
#[command(name = "yfctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bearer token from `yfctl login`.
    #[arg(long, env = "YARNFLOW_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Gateway URL.
    #[arg(long, env = "YARNFLOW_GATEWAY", default_value = "http://localhost:8080")]
    gateway: String,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and print a bearer token.
    Login {
        /// Login name.
        username: String,
        /// Password.
        #[arg(long, env = "YARNFLOW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Work with orders.
    #[command(subcommand)]
    Orders(OrdersCommand),
    /// Work with order chat threads.
    #[command(subcommand)]
    Chat(ChatCommand),
    /// Download all orders as CSV. Admin only.
    Export {
        /// Write to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum OrdersCommand {
    /// List orders you can see.
    List {
        /// Match order number, customer or yarn type.
        #[arg(long)]
        search: Option<String>,
        /// Only this status.
        #[arg(long)]
        status: Option<String>,
        /// Only orders assigned to this agent ID.
        #[arg(long)]
        agent: Option<String>,
        /// Only `local` or `export` orders.
        #[arg(long = "type")]
        order_type: Option<String>,
    },
    /// Show one order.
    Show {
        /// Order ID.
        order_id: String,
    },
    /// Create an order.
    Create {
        /// Buying customer.
        #[arg(long)]
        customer: String,
        /// Yarn specification.
        #[arg(long)]
        yarn: String,
        /// Quantity in kilograms.
        #[arg(long)]
        quantity: f64,
        /// Production start date, YYYY-MM-DD.
        #[arg(long)]
        startup: NaiveDate,
        /// `local` or `export`.
        #[arg(long = "type", default_value = "local")]
        order_type: String,
        /// Value in US dollars.
        #[arg(long)]
        amount: f64,
        /// Agent to assign, primary first. Repeatable. Admin only.
        #[arg(long = "agent")]
        agents: Vec<String>,
    },
    /// Move an order to another status.
    Move {
        /// Order ID.
        order_id: String,
        /// Target status, e.g. `under-booking`.
        status: String,
    },
    /// Replace the agents of an order, primary first. Admin only.
    Assign {
        /// Order ID.
        order_id: String,
        /// Agent IDs.
        #[arg(required = true)]
        agents: Vec<String>,
    },
    /// Confirm an order to one agent. Admin only.
    Confirm {
        /// Order ID.
        order_id: String,
        /// Agent ID.
        agent: String,
    },
}

#[derive(Subcommand, Debug)]
enum ChatCommand {
    /// Show an order's chat thread.
    List {
        /// Order ID.
        order_id: String,
    },
    /// Post a message.
    Send {
        /// Order ID.
        order_id: String,
        /// Message text.
        message: String,
        /// Agent ID to tag. Repeatable. Admin only.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

fn parse_status(input: &str) -> anyhow::Result<String> {
    status_label(input)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("unknown status {input:?}"))
}

fn parse_order_type(input: &str) -> anyhow::Result<String> {
    order_type_label(input)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("order type must be `local` or `export`, got {input:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter("yarnflow_cli=debug,warn")
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!(gateway = %args.gateway, "Using gateway");
    let client = GatewayClient::new(&args.gateway, args.token);

    match args.command {
        Command::Login { username, password } => {
            let login = client
                .login(&username, &password)
                .await
                .context("login failed")?;
            eprintln!(
                "Logged in as {} ({}), token expires {}",
                login.user.username, login.user.role, login.expires_at
            );
            println!("{}", login.token);
        }
        Command::Orders(command) => run_orders(&client, command).await?,
        Command::Chat(command) => run_chat(&client, command).await?,
        Command::Export { output } => {
            let csv = client.export_orders().await.context("export failed")?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, csv)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    eprintln!("Wrote {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
    }

    Ok(())
}

async fn run_orders(client: &GatewayClient, command: OrdersCommand) -> anyhow::Result<()> {
    match command {
        OrdersCommand::List {
            search,
            status,
            agent,
            order_type,
        } => {
            let query = OrderQuery {
                search,
                status: status.as_deref().map(parse_status).transpose()?,
                agent,
                order_type: order_type.as_deref().map(parse_order_type).transpose()?,
            };
            let orders = client.list_orders(&query).await?;
            print!("{}", output::order_table(&orders));
        }
        OrdersCommand::Show { order_id } => {
            let order = client.get_order(&order_id).await?;
            print!("{}", output::order_detail(&order));
        }
        OrdersCommand::Create {
            customer,
            yarn,
            quantity,
            startup,
            order_type,
            amount,
            agents,
        } => {
            let request = CreateOrderRequest {
                customer_name: customer,
                yarn_type: yarn,
                quantity_kg: quantity,
                startup_date: startup,
                order_type: parse_order_type(&order_type)?,
                amount_usd: amount,
                agent_ids: agents,
            };
            let order = client.create_order(&request).await?;
            eprintln!("Created {}", order.order_number);
            print!("{}", output::order_detail(&order));
        }
        OrdersCommand::Move { order_id, status } => {
            let order = client.move_order(&order_id, &parse_status(&status)?).await?;
            eprintln!("{} is now {}", order.order_number, order.status);
        }
        OrdersCommand::Assign { order_id, agents } => {
            let order = client.assign_agents(&order_id, agents).await?;
            print!("{}", output::order_detail(&order));
        }
        OrdersCommand::Confirm { order_id, agent } => {
            let order = client.confirm_order(&order_id, &agent).await?;
            eprintln!("{} confirmed", order.order_number);
            print!("{}", output::order_detail(&order));
        }
    }
    Ok(())
}

async fn run_chat(client: &GatewayClient, command: ChatCommand) -> anyhow::Result<()> {
    match command {
        ChatCommand::List { order_id } => {
            let messages = client.list_messages(&order_id).await?;
            print!("{}", output::message_list(&messages));
        }
        ChatCommand::Send {
            order_id,
            message,
            tags,
        } => {
            let posted = client.post_message(&order_id, &message, tags).await?;
            print!("{}", output::message_list(std::slice::from_ref(&posted)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_move_command() {
        let args = Args::try_parse_from([
            "yfctl",
            "--token",
            "t0k",
            "orders",
            "move",
            "abc",
            "under-booking",
        ])
        .unwrap();
        match args.command {
            Command::Orders(OrdersCommand::Move { order_id, status }) => {
                assert_eq!(order_id, "abc");
                assert_eq!(parse_status(&status).unwrap(), "Under Booking");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_repeated_tags() {
        let args = Args::try_parse_from([
            "yfctl", "chat", "send", "abc", "hello", "--tag", "a1", "--tag", "a2",
        ])
        .unwrap();
        match args.command {
            Command::Chat(ChatCommand::Send { tags, .. }) => assert_eq!(tags, ["a1", "a2"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn assign_requires_agents() {
        assert!(Args::try_parse_from(["yfctl", "orders", "assign", "abc"]).is_err());
    }

    #[test]
    fn bad_order_type_is_rejected() {
        assert!(parse_order_type("domestic").is_err());
    }
}
