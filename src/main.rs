use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use repair_desk::{
    auth::{require, Action, IdentityProvider, Principal, Role, StaticIdentityProvider},
    commands::repairjobs::{
        AddRepairNoteCommand, GenerateQuoteCommand, SubmitRepairRequestCommand,
        UpdateRepairStatusCommand,
    },
    config::{self, AppConfig},
    db,
    models::{JobStatus, QuotePart, RepairJob},
    repositories::JobFilter,
    services::QuoteFilter,
    RepairDesk,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load application config")?;
    config::init_tracing(&config.log_level, config.log_json);

    let identity = StaticIdentityProvider::new(cli.identity.principal());
    let principal = identity.current();
    debug!(?principal, "Resolved caller");

    if let Commands::Migrate = cli.command {
        return migrate(&config).await;
    }

    let desk = RepairDesk::connect(&config)
        .await
        .context("failed to open repair job store")?;
    let ctx = CliContext {
        desk,
        config,
        principal,
        json: cli.json,
    };

    match cli.command {
        Commands::Request(args) => handle_request(&ctx, args).await?,
        Commands::Quote(args) => handle_quote(&ctx, args).await?,
        Commands::Status(args) => handle_status(&ctx, args).await?,
        Commands::Note(args) => handle_note(&ctx, args).await?,
        Commands::Show(args) => handle_show(&ctx, args).await?,
        Commands::List(args) => handle_list(&ctx, args).await?,
        Commands::Mine => handle_mine(&ctx).await?,
        Commands::Serial(args) => handle_serial(&ctx, args).await?,
        Commands::AwaitingQuote => handle_awaiting_quote(&ctx).await?,
        Commands::Quotes(args) => handle_quotes(&ctx, args).await?,
        Commands::Dashboard => handle_dashboard(&ctx).await?,
        Commands::Migrate => {}
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "repair-desk",
    about = "Repair job intake, quoting and tracking",
    version
)]
struct Cli {
    #[command(flatten)]
    identity: IdentityArgs,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IdentityArgs {
    #[arg(long, global = true, help = "Caller's user id")]
    user_id: Option<String>,
    #[arg(long, global = true, help = "Caller's display name")]
    user_name: Option<String>,
    #[arg(long, global = true, value_enum, default_value = "customer", help = "Caller's role")]
    role: RoleArg,
}

impl IdentityArgs {
    fn principal(&self) -> Option<Principal> {
        let user_id = self.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let name = self
            .user_name
            .clone()
            .unwrap_or_else(|| user_id.to_string());
        Some(Principal::new(user_id, name, self.role.into()))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Customer,
    Technician,
    Owner,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Customer => Role::Customer,
            RoleArg::Technician => Role::Technician,
            RoleArg::Owner => Role::Owner,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a repair request; staff record walk-ins with --customer-id/--customer-name
    Request(RequestArgs),
    /// Generate a quote for a job
    Quote(QuoteArgs),
    /// Change a job's status
    Status(StatusArgs),
    /// Add a technician note to a job
    Note(NoteArgs),
    /// Show one job with its quotes and notes
    Show(JobIdArgs),
    /// List all jobs
    List(ListArgs),
    /// List your own jobs
    Mine,
    /// Track a device by serial number
    Serial(SerialArgs),
    /// Open jobs that can still be quoted
    AwaitingQuote,
    /// Quoted jobs, for the owner
    Quotes(QuotesArgs),
    /// Summary for your role
    Dashboard,
    /// Apply database migrations
    Migrate,
}

#[derive(Args)]
struct RequestArgs {
    #[arg(long, help = "Device make and model")]
    item_model: String,
    #[arg(long, help = "Device serial number")]
    serial_number: Option<String>,
    #[arg(long, help = "What is wrong with the device")]
    description: String,
    #[arg(long, help = "Walk-in customer's id (staff only)")]
    customer_id: Option<String>,
    #[arg(long, help = "Walk-in customer's name (staff only)")]
    customer_name: Option<String>,
}

impl RequestArgs {
    /// Customers file for themselves; staff record a walk-in on a customer's behalf.
    fn customer(&self, principal: &Principal) -> Result<(String, String)> {
        let given = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let customer_id = given(&self.customer_id);
        let customer_name = given(&self.customer_name);

        if !principal.is_staff() {
            if customer_id.is_some() || customer_name.is_some() {
                bail!("--customer-id and --customer-name are only accepted from staff");
            }
            return Ok((principal.user_id.clone(), principal.display_name.clone()));
        }

        match (customer_id, customer_name) {
            (Some(id), Some(name)) => Ok((id, name)),
            _ => bail!("walk-in intake requires --customer-id and --customer-name"),
        }
    }
}

#[derive(Args)]
struct QuoteArgs {
    job_id: String,
    #[arg(long, value_parser = parse_decimal, help = "Estimated labor hours")]
    hours: Decimal,
    #[arg(long, value_parser = parse_decimal, help = "Labor rate; defaults to the configured rate")]
    rate: Option<Decimal>,
    #[arg(
        long = "part",
        value_parser = parse_quote_part,
        help = "Part as name=<text>,qty=<n>,price=<decimal>[,number=<text>][,description=<text>]"
    )]
    parts: Vec<QuotePart>,
}

#[derive(Args)]
struct StatusArgs {
    job_id: String,
    #[arg(value_parser = parse_status, help = "Pending, Diagnosis, In Progress, Completed or Cancelled")]
    status: JobStatus,
}

#[derive(Args)]
struct NoteArgs {
    job_id: String,
    content: String,
}

#[derive(Args)]
struct JobIdArgs {
    job_id: String,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, value_parser = parse_status)]
    status: Option<JobStatus>,
    #[arg(long, help = "Customer name prefix")]
    customer_name: Option<String>,
    #[arg(long, value_parser = parse_date, help = "Date received (YYYY-MM-DD, UTC)")]
    received_on: Option<NaiveDate>,
}

#[derive(Args)]
struct SerialArgs {
    serial_number: String,
}

#[derive(Args)]
struct QuotesArgs {
    #[arg(long, value_parser = parse_status)]
    status: Option<JobStatus>,
    #[arg(long)]
    customer_id: Option<String>,
    #[arg(long, value_parser = parse_date, help = "Last updated on or after (YYYY-MM-DD)")]
    from: Option<NaiveDate>,
    #[arg(long, value_parser = parse_date, help = "Last updated on or before (YYYY-MM-DD)")]
    to: Option<NaiveDate>,
}

struct CliContext {
    desk: RepairDesk,
    config: AppConfig,
    principal: Option<Principal>,
    json: bool,
}

impl CliContext {
    fn require(&self, action: Action) -> Result<&Principal> {
        require(self.principal.as_ref(), action)?;
        self.principal
            .as_ref()
            .ok_or_else(|| anyhow!("no authenticated user"))
    }
}

async fn migrate(config: &AppConfig) -> Result<()> {
    if config.is_memory_store() {
        println!("In-memory store selected; nothing to migrate");
        return Ok(());
    }
    let pool = db::establish_connection_from_app_config(config)
        .await
        .context("failed to connect to database")?;
    db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}

async fn handle_request(ctx: &CliContext, args: RequestArgs) -> Result<()> {
    let principal = ctx.require(Action::SubmitRepairRequest)?;
    let (customer_id, customer_name) = args.customer(principal)?;
    let job = ctx
        .desk
        .repair_jobs
        .submit_repair_request(SubmitRepairRequestCommand {
            customer_id,
            customer_name,
            item_model: args.item_model,
            serial_number: args.serial_number,
            problem_description: args.description,
        })
        .await
        .context("failed to submit repair request")?;

    if ctx.json {
        print_json(&job)?;
    } else {
        println!(
            "Repair request submitted. Job #{} ({}) is {}",
            job.reference(),
            job.id,
            job.status
        );
    }
    Ok(())
}

async fn handle_quote(ctx: &CliContext, args: QuoteArgs) -> Result<()> {
    ctx.require(Action::GenerateQuote)?;
    let result = ctx
        .desk
        .repair_jobs
        .generate_quote(GenerateQuoteCommand {
            job_id: args.job_id,
            labor_hours: args.hours,
            labor_rate: args.rate.unwrap_or(ctx.config.quotes.default_labor_rate),
            parts: args.parts,
        })
        .await
        .context("failed to generate quote")?;

    if ctx.json {
        print_json(&result)?;
    } else {
        let totals = result.breakdown.rounded();
        println!("Quote {} for job {}", result.quote.id, result.job_id);
        println!("  Parts:     {}", totals.parts_total);
        println!("  Labor:     {}", totals.labor_total);
        println!("  Subtotal:  {}", totals.sub_total);
        println!("  Tax:       {}", totals.tax_amount);
        println!("  Total:     {}", totals.grand_total);
        println!("  Valid until {}", result.quote.valid_until.format("%Y-%m-%d"));
    }
    Ok(())
}

async fn handle_status(ctx: &CliContext, args: StatusArgs) -> Result<()> {
    ctx.require(Action::UpdateStatus)?;
    let job = ctx
        .desk
        .repair_jobs
        .update_status(UpdateRepairStatusCommand {
            job_id: args.job_id,
            new_status: args.status,
        })
        .await
        .context("failed to update status")?;
    render_or_json(ctx, &job)
}

async fn handle_note(ctx: &CliContext, args: NoteArgs) -> Result<()> {
    ctx.require(Action::AddNote)?;
    let job = ctx
        .desk
        .repair_jobs
        .add_note(AddRepairNoteCommand {
            job_id: args.job_id,
            content: args.content,
        })
        .await
        .context("failed to add note")?;
    render_or_json(ctx, &job)
}

async fn handle_show(ctx: &CliContext, args: JobIdArgs) -> Result<()> {
    ctx.require(Action::ViewJob)?;
    let job = ctx
        .desk
        .repair_jobs
        .get_job(&args.job_id)
        .await?
        .ok_or_else(|| anyhow!("repair job {} not found", args.job_id))?;

    if ctx.json {
        return print_json(&job);
    }
    render_job(&job);
    let now = Utc::now();
    for quote in &job.quotes {
        let totals = quote.breakdown().rounded();
        let validity = if quote.is_expired_at(now) {
            "expired"
        } else {
            "valid until"
        };
        println!(
            "  quote {} • {} h @ {} • total {} • {} {}",
            quote.id,
            quote.labor_hours,
            quote.labor_rate,
            totals.grand_total,
            validity,
            quote.valid_until.format("%Y-%m-%d")
        );
    }
    for note in job.notes_newest_first() {
        println!(
            "  note [{}] {}",
            note.timestamp.format("%Y-%m-%d %H:%M"),
            note.content
        );
    }
    Ok(())
}

async fn handle_list(ctx: &CliContext, args: ListArgs) -> Result<()> {
    ctx.require(Action::ViewAllJobs)?;
    let filter = JobFilter {
        status: args.status,
        customer_name_prefix: args.customer_name,
        received_on: args.received_on,
        customer_id: None,
    };
    let jobs = ctx.desk.repair_jobs.find_all(&filter).await?;
    render_jobs(ctx, &jobs)
}

async fn handle_mine(ctx: &CliContext) -> Result<()> {
    let principal = ctx.require(Action::ViewOwnJobs)?;
    let jobs = ctx
        .desk
        .repair_jobs
        .find_by_customer(&principal.user_id)
        .await?;
    render_jobs(ctx, &jobs)
}

async fn handle_serial(ctx: &CliContext, args: SerialArgs) -> Result<()> {
    ctx.require(Action::TrackSerialNumber)?;
    let jobs = ctx
        .desk
        .repair_jobs
        .find_by_serial_number(&args.serial_number)
        .await?;
    render_jobs(ctx, &jobs)
}

async fn handle_awaiting_quote(ctx: &CliContext) -> Result<()> {
    ctx.require(Action::GenerateQuote)?;
    let jobs = ctx.desk.repair_jobs.jobs_awaiting_quote().await?;
    render_jobs(ctx, &jobs)
}

async fn handle_quotes(ctx: &CliContext, args: QuotesArgs) -> Result<()> {
    ctx.require(Action::QuoteManagement)?;
    let jobs = ctx
        .desk
        .quotes
        .filter_quoted_jobs(&QuoteFilter {
            status: args.status,
            customer_id: args.customer_id,
            updated_from: args.from,
            updated_to: args.to,
        })
        .await?;

    if ctx.json {
        return print_json(&jobs);
    }
    for job in &jobs {
        let latest = job
            .latest_quote()
            .map(|q| q.breakdown().rounded().grand_total.to_string())
            .unwrap_or_default();
        println!(
            "- #{} • {} • {} • latest quote {} • updated {}",
            job.reference(),
            job.customer_name,
            job.status,
            latest,
            job.last_updated.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn handle_dashboard(ctx: &CliContext) -> Result<()> {
    let role = ctx.principal.as_ref().map(|p| p.role);
    match role {
        Some(Role::Owner) => {
            ctx.require(Action::OwnerDashboard)?;
            let dashboard = ctx.desk.dashboard.owner().await?;
            if ctx.json {
                return print_json(&dashboard);
            }
            println!("Completed repairs:   {}", dashboard.completed_repairs);
            println!("Jobs with quotes:    {}", dashboard.jobs_with_quotes);
            println!("Quoted, in progress: {}", dashboard.quoted_in_progress);
            println!("Recent activity:");
            for recent in &dashboard.recent_repairs {
                println!(
                    "  #{} • {} • {} • {}",
                    recent.reference,
                    recent.customer_name,
                    recent.status,
                    recent.last_updated.format("%Y-%m-%d %H:%M")
                );
            }
        }
        _ => {
            ctx.require(Action::TechnicianDashboard)?;
            let dashboard = ctx.desk.dashboard.technician().await?;
            if ctx.json {
                return print_json(&dashboard);
            }
            println!("Open jobs:      {}", dashboard.open_jobs);
            println!("Completed jobs: {}", dashboard.completed_jobs);
            println!("Quotes created: {}", dashboard.total_quotes);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_or_json(ctx: &CliContext, job: &RepairJob) -> Result<()> {
    if ctx.json {
        print_json(job)
    } else {
        render_job(job);
        Ok(())
    }
}

fn render_jobs(ctx: &CliContext, jobs: &[RepairJob]) -> Result<()> {
    if ctx.json {
        return print_json(&jobs);
    }
    if jobs.is_empty() {
        println!("No repair jobs found");
    }
    for job in jobs {
        render_job(job);
    }
    Ok(())
}

fn render_job(job: &RepairJob) {
    println!(
        "- Job #{} • {} • {} • {} • received {} • {} quote(s), {} note(s)",
        job.reference(),
        job.customer_name,
        job.item_model,
        job.status,
        job.date_received.format("%Y-%m-%d"),
        job.quotes.len(),
        job.notes.len()
    );
}

fn parse_status(raw: &str) -> Result<JobStatus, String> {
    JobStatus::from_str(raw).map_err(|e| e.to_string())
}

fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("invalid decimal '{raw}'"))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn parse_quote_part(raw: &str) -> Result<QuotePart, String> {
    let mut name = None;
    let mut quantity = None;
    let mut unit_price = None;
    let mut part_number = None;
    let mut description = None;

    for segment in raw.split(',') {
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| format!("invalid segment '{segment}', expected key=value"))?;
        let value = value.trim();

        match key.trim() {
            "name" => name = Some(value.to_string()),
            "qty" | "quantity" => {
                let qty: u32 = value
                    .parse()
                    .map_err(|_| format!("invalid quantity '{value}'"))?;
                quantity = Some(qty);
            }
            "price" | "unit_price" => unit_price = Some(parse_decimal(value)?),
            "number" | "part_number" => part_number = Some(value.to_string()),
            "description" => description = Some(value.to_string()),
            other => return Err(format!("unrecognized key '{other}' in part definition")),
        }
    }

    let name = name.ok_or_else(|| "part must include name=<value>".to_string())?;
    let quantity = quantity.ok_or_else(|| "part must include qty=<integer>".to_string())?;
    let unit_price = unit_price.ok_or_else(|| "part must include price=<decimal>".to_string())?;

    let mut part = QuotePart::new(name, quantity, unit_price);
    part.part_number = part_number.filter(|s| !s.is_empty());
    part.description = description.filter(|s| !s.is_empty());
    Ok(part)
}
