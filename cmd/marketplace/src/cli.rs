use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use domains::{ContactStatus, OrderStatus, SortOption};

#[derive(Parser, Debug)]
#[command(name = "marketplace", version, about = "Browse the domain marketplace and talk to support")]
pub struct Cli {
    /// Settings file (without extension); defaults to `marketplace`
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List domains matching the given filters
    Domains(DomainArgs),
    /// List the TLDs present in the inventory
    Tlds,
    /// Manage saved filter presets
    #[command(subcommand)]
    SavedFilters(SavedFilterCommand),
    /// Talk to support as a customer
    Chat(ChatArgs),
    /// List orders or move one along
    #[command(subcommand)]
    Orders(OrderCommand),
    /// Leave a message through the contact form, or triage the inbox
    #[command(subcommand)]
    Contact(ContactCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Listing URL query, e.g. `aged=true&isHot=true`
    #[arg(long, default_value = "")]
    pub query: String,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    /// Repeatable, e.g. `--tld .com --tld .net`
    #[arg(long = "tld")]
    pub tlds: Vec<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub available: bool,
    #[arg(long)]
    pub min_age: Option<f64>,
    #[arg(long)]
    pub min_traffic: Option<f64>,
    /// Load a saved filter (by id) instead of building one
    #[arg(long, requires = "user")]
    pub saved: Option<String>,
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Args, Debug)]
pub struct DomainArgs {
    #[command(flatten)]
    pub filters: FilterArgs,
    #[arg(long, default_value = "")]
    pub search: String,
    #[arg(long, default_value_t = SortOption::Newest)]
    pub sort: SortOption,
}

#[derive(Subcommand, Debug)]
pub enum SavedFilterCommand {
    List {
        #[arg(long)]
        user: String,
    },
    Save {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[arg(long)]
    pub user: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    /// Text to send; omit to only print the conversation
    pub message: Option<String>,
    /// File to attach after the text
    #[arg(long)]
    pub attach: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum OrderCommand {
    List,
    SetStatus {
        #[arg(long)]
        id: String,
        /// pending, completed or cancelled
        #[arg(long)]
        status: OrderStatus,
    },
}

#[derive(Subcommand, Debug)]
pub enum ContactCommand {
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        subject: String,
        message: String,
    },
    List,
    Status {
        #[arg(long)]
        id: String,
        /// new, read or replied
        #[arg(long)]
        status: ContactStatus,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}
