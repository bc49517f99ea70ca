//! # marketplace
//!
//! Command-line front end for the domain marketplace. Assembles the HTTP
//! adapter, the services and the settings, then runs one subcommand.

mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use api_adapters::HttpMarketplaceClient;
use bytes::Bytes;
use clap::Parser;
use configs::Settings;
use domains::{
    ActiveFilters, AppError, Availability, ChatApi, ContactApi, Domain, DomainCatalog, DomainQuery,
    FileUpload, NewContactMessage, OrderApi, Participant, SenderRole,
};
use services::{filters, ChatConfig, ChatSync, FilterChange, FilterPanel, SavedFilterService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{
    ChatArgs, Cli, Command, ContactCommand, DomainArgs, FilterArgs, OrderCommand, SavedFilterCommand,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings);

    match run(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            match err.downcast_ref::<AppError>() {
                Some(app) => {
                    let notice = app.notice();
                    eprintln!("{}: {}", notice.title, notice.description);
                }
                None => eprintln!("{err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.level));
    let registry = tracing_subscriber::registry().with(filter);
    if settings.log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(command: Command, settings: &Settings) -> anyhow::Result<()> {
    let client = Arc::new(HttpMarketplaceClient::new(
        &settings.api.base_url,
        settings.api.timeout(),
        settings.api.token.clone(),
    )?);
    tracing::debug!(base_url = %client.base_url(), "marketplace client ready");

    match command {
        Command::Domains(args) => list_domains(client, args).await,
        Command::Tlds => {
            for tld in client.list_tlds().await? {
                println!("{tld}");
            }
            Ok(())
        }
        Command::SavedFilters(cmd) => saved_filters(client, cmd).await,
        Command::Chat(args) => chat(client, args, settings).await,
        Command::Orders(cmd) => orders(client, cmd).await,
        Command::Contact(cmd) => contact(client, cmd).await,
    }
}

async fn orders(client: Arc<HttpMarketplaceClient>, cmd: OrderCommand) -> anyhow::Result<()> {
    match cmd {
        OrderCommand::List => {
            for order in client.list_orders().await? {
                println!("{}\t{}\t{:.2}\t{} item(s)", order.id, order.status, order.total, order.items.len());
            }
        }
        OrderCommand::SetStatus { id, status } => {
            let order = client.update_order_status(&id, status).await?;
            tracing::info!(order_id = %order.id, status = %order.status, "order status updated");
            println!("{} is now {}", order.id, order.status);
        }
    }
    Ok(())
}

async fn contact(client: Arc<HttpMarketplaceClient>, cmd: ContactCommand) -> anyhow::Result<()> {
    match cmd {
        ContactCommand::Submit { name, email, subject, message } => {
            let message = NewContactMessage { name, email, subject, message }.validated()?;
            let stored = client.submit_contact(message).await?;
            println!("message received as {}", stored.id);
        }
        ContactCommand::List => {
            for message in client.list_contacts().await? {
                let created = message.created_at.map(|t| t.to_rfc3339()).unwrap_or_default();
                println!(
                    "{}\t{}\t{} <{}>\t{}\t{}",
                    message.id, message.status, message.name, message.email, message.subject, created
                );
            }
        }
        ContactCommand::Status { id, status } => {
            let message = client.update_contact_status(&id, status).await?;
            println!("{} is now {}", message.id, message.status);
        }
        ContactCommand::Delete { id } => {
            client.delete_contact(&id).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

/// Resolves the filter flags the same way the listing page does: URL query
/// first, then a saved preset or the explicit edits. `inventory` supplies the
/// price ceiling when only a lower price is given; it is fetched when absent.
async fn resolve_filters(
    client: Arc<HttpMarketplaceClient>,
    args: &FilterArgs,
    inventory: Option<&[Domain]>,
) -> anyhow::Result<ActiveFilters> {
    let mut panel = FilterPanel::new();
    panel.bootstrap(&args.query);

    if let (Some(id), Some(user)) = (&args.saved, &args.user) {
        let saved = SavedFilterService::new(client).load(user, id).await?;
        panel.load_saved(saved);
        return Ok(panel.filters().clone());
    }

    let ceiling = match (args.min_price.is_some() && args.max_price.is_none(), inventory) {
        (false, _) => 0.0,
        (true, Some(all)) => filters::price_ceiling(all),
        (true, None) => filters::price_ceiling(&client.list_domains().await?),
    };
    if let Some(range) = filters::price_bounds(args.min_price, args.max_price, ceiling)? {
        panel.apply(FilterChange::Price(range));
    }
    if args.available {
        panel.apply(FilterChange::Availability(Availability::Available));
    }
    panel.apply(FilterChange::MinAge(args.min_age));
    panel.apply(FilterChange::MinMonthlyTraffic(args.min_traffic));
    for tld in &args.tlds {
        panel.apply(FilterChange::ToggleTld(tld.clone()));
    }
    for tag in &args.tags {
        panel.apply(FilterChange::ToggleTag(tag.clone()));
    }
    Ok(panel.filters().clone())
}

async fn list_domains(client: Arc<HttpMarketplaceClient>, args: DomainArgs) -> anyhow::Result<()> {
    let all = client.list_domains().await?;
    let query = DomainQuery {
        filters: resolve_filters(client.clone(), &args.filters, Some(&all)).await?,
        search: args.search,
        sort: args.sort,
    };
    let shown = filters::apply(&all, &query);
    tracing::info!(total = all.len(), shown = shown.len(), sort = %query.sort, "filtered domains");

    for domain in &shown {
        let status = if domain.is_sold { "sold" } else if domain.is_available { "available" } else { "unavailable" };
        println!("{}\t{:.2}\t{}\t{}", domain.name, domain.price, status, domain.tags.join(","));
    }
    println!("{} of {} domains", shown.len(), all.len());
    Ok(())
}

async fn saved_filters(client: Arc<HttpMarketplaceClient>, cmd: SavedFilterCommand) -> anyhow::Result<()> {
    let service = SavedFilterService::new(client.clone());
    match cmd {
        SavedFilterCommand::List { user } => {
            for saved in service.list(&user).await? {
                let created = saved.created_at.map(|t| t.to_rfc3339()).unwrap_or_default();
                println!("{}\t{}\t{}", saved.id, saved.name, created);
            }
        }
        SavedFilterCommand::Save { name, filters } => {
            let user = filters.user.clone().context("--user is required to save a filter")?;
            let snapshot = resolve_filters(client, &filters, None).await?;
            let saved = service.save(&user, &name, &snapshot).await?;
            println!("saved '{}' as {}", saved.name, saved.id);
        }
        SavedFilterCommand::Delete { id } => {
            service.delete(&id).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

async fn chat(client: Arc<HttpMarketplaceClient>, args: ChatArgs, settings: &Settings) -> anyhow::Result<()> {
    let viewer = Participant {
        user_id: args.user,
        name: args.name,
        email: args.email,
        role: SenderRole::Customer,
    };
    let config = ChatConfig {
        poll_interval: settings.chat.poll_interval(),
        reconcile_delay: settings.chat.reconcile_delay(),
    };
    let api: Arc<dyn ChatApi> = client;
    let sync = ChatSync::new(api, None, viewer, config);
    sync.start().await?;

    if let Some(text) = args.message.as_deref().filter(|t| !t.trim().is_empty()) {
        sync.send_text(text).await?;
    }
    if let Some(path) = &args.attach {
        sync.send_attachment(read_upload(path).await?).await?;
    }
    sync.refresh_messages().await?;

    let state = sync.store().snapshot();
    if let Some(session) = &state.session {
        println!("session {} ({:?})", session.id, session.status);
    }
    for message in state.messages() {
        println!(
            "[{}] {}: {}",
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.sender_name,
            message.content
        );
    }
    sync.shutdown();
    Ok(())
}

async fn read_upload(path: &Path) -> anyhow::Result<FileUpload> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("attachment path has no file name")?
        .to_string();
    Ok(FileUpload {
        file_name,
        content_type: mime_guess::from_path(path).first_or_octet_stream(),
        bytes: Bytes::from(data),
    })
}
