//! CLI administration tool for audit-gateway.
//!
//! Inspects and verifies the audit trail and mints operator tokens without
//! requiring HTTP API access.
//!
//! # Usage
//!
//! ```bash
//! # Verify the whole audit chain
//! cargo run --bin admin -- verify
//!
//! # Show the 20 most recent records
//! cargo run --bin admin -- list --limit 20
//!
//! # Show one record in full
//! cargo run --bin admin -- show 1042
//!
//! # Mint an admin token for the audit API
//! cargo run --bin admin -- token --subject ops --hours 1
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string
//! - `LOG_SIGNING_KEY` (required for `verify`): audit chain HMAC key
//! - `JWT_SECRET` (required for `token`): bearer token signing secret
//! - `JWT_ALGORITHM` (optional for `token`, default `HS256`)

use audit_gateway::application::services::{AuditService, BreakKind};
use audit_gateway::domain::chain_signer::ChainSigner;
use audit_gateway::domain::entities::AuditRecord;
use audit_gateway::domain::token::{ADMIN_ROLE, Claims};
use audit_gateway::infrastructure::persistence::PgAuditRepository;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;

/// CLI tool for managing audit-gateway.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Verify every signature and link of the audit chain
    Verify,

    /// List the most recent audit records
    List {
        /// Number of records to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },

    /// Show one audit record in full
    Show {
        /// Record identifier
        id: i64,
    },

    /// Mint a bearer token for the audit API
    Token {
        /// Subject placed in the token
        #[arg(short, long, default_value = "ops")]
        subject: String,

        /// Role placed in the token
        #[arg(short, long, default_value = ADMIN_ROLE)]
        role: String,

        /// Validity in hours
        #[arg(long, default_value_t = 1)]
        hours: u64,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Token {
        subject,
        role,
        hours,
    } = &cli.command
    {
        return mint_token(subject, role, *hours);
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Verify => verify_chain(&pool).await?,
        Commands::List { limit } => list_records(&pool, limit).await?,
        Commands::Show { id } => show_record(&pool, id).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
        Commands::Token { .. } => {}
    }

    Ok(())
}

fn audit_service(pool: &PgPool, signing_key: &str) -> AuditService {
    let repo = Arc::new(PgAuditRepository::new(Arc::new(pool.clone())));
    AuditService::new(repo, ChainSigner::new(signing_key))
}

/// Walks the chain and exits with a non-zero status if it is broken.
///
/// # Output Format
///
/// ```text
/// Audit Chain Verification
///
///   Checked: 1042
///   #17    signature mismatch
///   #18    broken link
///
///   Chain is BROKEN (2 problems)
/// ```
async fn verify_chain(pool: &PgPool) -> Result<()> {
    let signing_key = std::env::var("LOG_SIGNING_KEY").context("LOG_SIGNING_KEY must be set")?;
    let service = audit_service(pool, &signing_key);

    println!("{}", "Audit Chain Verification".bright_blue().bold());
    println!();

    let report = service
        .verify_chain()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to verify chain: {}", e))?;

    println!(
        "  Checked: {}",
        report.checked.to_string().bright_white().bold()
    );

    for problem in &report.breaks {
        let kind = match problem.kind {
            BreakKind::BrokenLink => "broken link",
            BreakKind::SignatureMismatch => "signature mismatch",
        };
        println!(
            "  {:<6} {}",
            format!("#{}", problem.id).bright_black(),
            kind.red()
        );
    }

    println!();
    if report.is_valid() {
        println!("{}", "  Chain is intact".green().bold());
        Ok(())
    } else {
        println!(
            "{}",
            format!("  Chain is BROKEN ({} problems)", report.breaks.len())
                .red()
                .bold()
        );
        std::process::exit(1);
    }
}

/// Lists the most recent records, newest first.
async fn list_records(pool: &PgPool, limit: i64) -> Result<()> {
    // Reading never touches the signing key.
    let service = audit_service(pool, "");

    println!("{}", "Audit Records".bright_blue().bold());
    println!();

    let (records, total) = tokio::try_join!(service.list(0, limit), service.count())
        .map_err(|e| anyhow::anyhow!("Failed to list records: {}", e))?;

    if records.is_empty() {
        println!("{}", "  No audit records found".yellow());
        return Ok(());
    }

    println!(
        "  {:<8} {:<17} {:<7} {:<32} {:<6} {:<20}",
        "ID".bright_white().bold(),
        "Created".bright_white().bold(),
        "Method".bright_white().bold(),
        "Path".bright_white().bold(),
        "Status".bright_white().bold(),
        "Subject".bright_white().bold()
    );
    println!("  {}", "-".repeat(95).bright_black());

    for record in &records {
        let fields = &record.fields;
        let status = fields.status_code.to_string();
        let status = if fields.status_code >= 500 {
            status.red()
        } else if fields.status_code >= 400 {
            status.yellow()
        } else {
            status.green()
        };

        println!(
            "  {:<8} {:<17} {:<7} {:<32} {:<6} {:<20}",
            record.id.to_string().bright_black(),
            fields
                .created_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black(),
            fields.method.cyan(),
            fields.path,
            status,
            fields.subject_id.as_deref().unwrap_or("-")
        );
    }

    println!();
    println!(
        "  Showing {} of {}",
        records.len().to_string().bright_white().bold(),
        total.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Prints one record with its signatures and captured body.
async fn show_record(pool: &PgPool, id: i64) -> Result<()> {
    let service = audit_service(pool, "");

    let record = service
        .get(id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load record {}: {}", id, e))?;

    print_record(&record)
}

fn print_record(record: &AuditRecord) -> Result<()> {
    let fields = &record.fields;

    println!(
        "{}",
        format!("Audit Record #{}", record.id).bright_blue().bold()
    );
    println!();
    println!("  Created:   {}", fields.created_at.to_rfc3339());
    println!("  Request:   {} {}", fields.method.cyan(), fields.path);
    println!("  Status:    {}", fields.status_code);
    println!("  Duration:  {} ms", fields.duration_ms);
    println!(
        "  Subject:   {}",
        fields.subject_id.as_deref().unwrap_or("-")
    );
    println!("  Client:    {}", fields.ip.as_deref().unwrap_or("-"));
    if let Some(error) = &fields.error {
        println!("  Error:     {}", error.red());
    }
    println!("  Signature: {}", record.signature.bright_black());
    println!(
        "  Previous:  {}",
        record
            .previous_signature
            .as_deref()
            .unwrap_or("(genesis)")
            .bright_black()
    );

    if let Some(body) = &fields.body {
        println!();
        println!("{}", "  Body:".bright_white());
        for line in serde_json::to_string_pretty(body)?.lines() {
            println!("    {}", line);
        }
    }
    println!();

    Ok(())
}

/// Mints a bearer token accepted by the audit API.
fn mint_token(subject: &str, role: &str, hours: u64) -> Result<()> {
    let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
    let algorithm = std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string());
    let algorithm = Algorithm::from_str(&algorithm).context("Unsupported JWT_ALGORITHM")?;

    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_string(),
        exp: Utc::now().timestamp().unsigned_abs() + hours * 3600,
    };

    let token = jsonwebtoken::encode(
        &Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to sign token")?;

    println!("{}", "Bearer Token".bright_blue().bold());
    println!();
    println!("  Subject: {}", subject.cyan());
    println!("  Role:    {}", role.cyan());
    println!("  Expires: in {} hour(s)", hours);
    println!();
    println!("  {}", token.bright_yellow());
    println!();
    println!("{}", "Example:".bright_white());
    println!(
        "  curl -H \"Authorization: Bearer {}\" http://localhost:3000/audit/verify",
        token.bright_yellow()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_records")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL:    {}", version.bright_white());
            println!(
                "  Audit records: {}",
                records.to_string().bright_green().bold()
            );
            println!();
        }
    }

    Ok(())
}
