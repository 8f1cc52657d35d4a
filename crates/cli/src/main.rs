//! TaskPay CLI - Main entry point

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use taskpay_cli::{commands, AppContext};
use taskpay_core::{AccountStatus, Badge, Role, SubmissionKind, SubmissionStatus};
use taskpay_ledger::EntryFilter;
use taskpay_workflow::{NewSubmission, NewTask, SubmissionFilter};

/// Env var used when `--as` is not given
const ACCOUNT_ENV: &str = "TASKPAY_ACCOUNT";

#[derive(Parser)]
#[command(name = "taskpay")]
#[command(about = "TaskPay - task rewards and withdrawals", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Account ID to act as (falls back to TASKPAY_ACCOUNT)
    #[arg(long = "as", global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store, optionally with the first admin
    Init {
        #[arg(long, requires = "admin_email")]
        admin_name: Option<String>,
        #[arg(long, requires = "admin_name")]
        admin_email: Option<String>,
    },

    /// Register a new user account
    Register { name: String, email: String },

    /// Account administration
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Task catalog
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Submit work for review
    Submit {
        #[command(subcommand)]
        command: SubmitCommands,
    },

    /// Request a withdrawal; the amount is held until review
    Withdraw {
        amount: Decimal,
        /// Payout method (Bkash, Nagad, Rocket, Bank)
        method: String,
        /// Account number or payout details
        details: String,
    },

    /// Review submissions (admin)
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },

    /// Credit (positive) or debit (negative) an account (admin)
    Adjust {
        account: String,
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Show a balance (default: your own)
    Balance { account: Option<String> },

    /// Ledger history
    Ledger {
        /// Account to show (admins only for others)
        #[arg(long)]
        account: Option<String>,
        /// Every account (admin)
        #[arg(long)]
        all: bool,
        #[arg(long)]
        search: Option<String>,
        /// RFC3339 lower bound
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// RFC3339 upper bound
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        /// Hide an entry from your own history instead of listing
        #[arg(long, conflicts_with_all = ["all", "account"])]
        hide: Option<String>,
    },

    /// Submission history
    Submissions {
        /// Every account (admin)
        #[arg(long)]
        all: bool,
        /// Pending queue (admin)
        #[arg(long)]
        pending: bool,
        #[arg(long)]
        status: Option<SubmissionStatus>,
        #[arg(long)]
        kind: Option<SubmissionKind>,
        /// Hide a submission from your own history instead of listing
        #[arg(long, conflicts_with_all = ["all", "pending"])]
        hide: Option<String>,
    },

    /// Your notifications
    Notifications {
        #[command(subcommand)]
        command: Option<NotificationCommands>,
        #[arg(long)]
        unread: bool,
    },

    /// Recompute cached balances from the ledger (admin)
    Rebuild,
}

#[derive(Subcommand)]
enum AccountCommands {
    Show { account: Option<String> },
    List {
        #[arg(long)]
        role: Option<Role>,
    },
    /// Set review status: approved, rejected, banned
    Status { account: String, status: AccountStatus },
    Ban { account: String },
    Unban { account: String },
    /// none, member, premium, vip
    Badge { account: String, badge: Badge },
}

#[derive(Subcommand)]
enum TaskCommands {
    Create {
        title: String,
        reward: Decimal,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "1")]
        workers: u32,
        #[arg(long)]
        publish: bool,
    },
    Publish { task: String },
    Unpublish { task: String },
    List {
        /// Include unpublished tasks
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum SubmitCommands {
    /// Proof for a catalog task
    Task {
        task: String,
        #[arg(long)]
        proof: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long = "image")]
        images: Vec<String>,
    },
    /// Claim for work done outside the catalog
    Manual {
        platform: String,
        description: String,
        amount: Decimal,
        #[arg(long = "image")]
        images: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ReviewCommands {
    Approve { submission: String },
    Reject {
        submission: String,
        #[arg(long)]
        reason: Option<String>,
    },
    Delete { submission: String },
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// Mark one (or all) read
    Read { id: Option<String> },
    /// Delete one (or all)
    Clear { id: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut ctx = AppContext::new(&cli.data)
        .await
        .with_context(|| format!("opening {}", cli.data.display()))?;
    if let Some(actor) = cli.actor.or_else(|| std::env::var(ACCOUNT_ENV).ok()) {
        ctx.sign_in(actor);
    }

    let result = run(&ctx, cli.command).await;
    ctx.close().await;
    result
}

async fn run(ctx: &AppContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init {
            admin_name,
            admin_email,
        } => {
            let admin = admin_name.as_deref().zip(admin_email.as_deref());
            commands::init(ctx, admin).await?;
        }

        Commands::Register { name, email } => {
            commands::register(ctx, &name, &email).await?;
        }

        Commands::Account { command } => match command {
            AccountCommands::Show { account } => {
                commands::show_account(ctx, account.as_deref()).await?;
            }
            AccountCommands::List { role } => {
                commands::list_accounts(ctx, role).await?;
            }
            AccountCommands::Status { account, status } => {
                commands::set_status(ctx, &account, status).await?;
            }
            AccountCommands::Ban { account } => {
                commands::ban(ctx, &account).await?;
            }
            AccountCommands::Unban { account } => {
                commands::unban(ctx, &account).await?;
            }
            AccountCommands::Badge { account, badge } => {
                commands::set_badge(ctx, &account, badge).await?;
            }
        },

        Commands::Task { command } => match command {
            TaskCommands::Create {
                title,
                reward,
                description,
                workers,
                publish,
            } => {
                let new_task = NewTask {
                    title,
                    description,
                    reward,
                    worker_limit: workers,
                    publish,
                };
                commands::create_task(ctx, new_task).await?;
            }
            TaskCommands::Publish { task } => {
                commands::publish_task(ctx, &task, true).await?;
            }
            TaskCommands::Unpublish { task } => {
                commands::publish_task(ctx, &task, false).await?;
            }
            TaskCommands::List { all } => {
                commands::list_tasks(ctx, all).await?;
            }
        },

        Commands::Submit { command } => {
            let new_submission = match command {
                SubmitCommands::Task {
                    task,
                    proof,
                    url,
                    images,
                } => NewSubmission::Task {
                    task_id: task,
                    proof_text: proof,
                    proof_url: url,
                    images,
                },
                SubmitCommands::Manual {
                    platform,
                    description,
                    amount,
                    images,
                } => NewSubmission::Manual {
                    platform,
                    description,
                    amount,
                    images,
                },
            };
            commands::submit(ctx, new_submission).await?;
        }

        Commands::Withdraw {
            amount,
            method,
            details,
        } => {
            commands::submit(
                ctx,
                NewSubmission::Withdrawal {
                    amount,
                    method,
                    details,
                },
            )
            .await?;
        }

        Commands::Review { command } => match command {
            ReviewCommands::Approve { submission } => {
                commands::approve(ctx, &submission).await?;
            }
            ReviewCommands::Reject { submission, reason } => {
                commands::reject(ctx, &submission, reason).await?;
            }
            ReviewCommands::Delete { submission } => {
                commands::delete_submission(ctx, &submission).await?;
            }
        },

        Commands::Adjust {
            account,
            amount,
            description,
        } => {
            commands::adjust(ctx, &account, amount, &description).await?;
        }

        Commands::Balance { account } => {
            commands::balance(ctx, account.as_deref()).await?;
        }

        Commands::Ledger {
            account,
            all,
            search,
            from,
            to,
            hide,
        } => {
            if let Some(entry_id) = hide {
                commands::hide_ledger_entry(ctx, &entry_id).await?;
                return Ok(());
            }
            let mut filter = EntryFilter::new();
            if let Some(from) = from {
                filter = filter.from(from);
            }
            if let Some(to) = to {
                filter = filter.to(to);
            }
            if let Some(search) = search {
                filter = filter.search(search);
            }
            commands::ledger(ctx, account.as_deref(), all, filter).await?;
        }

        Commands::Submissions {
            all,
            pending,
            status,
            kind,
            hide,
        } => {
            if let Some(submission_id) = hide {
                commands::hide_submission(ctx, &submission_id).await?;
                return Ok(());
            }
            let filter = SubmissionFilter {
                status,
                kind,
                ..Default::default()
            };
            commands::submissions(ctx, all, pending, filter).await?;
        }

        Commands::Notifications { command, unread } => match command {
            None => {
                commands::notifications(ctx, unread).await?;
            }
            Some(NotificationCommands::Read { id }) => {
                commands::mark_read(ctx, id.as_deref()).await?;
            }
            Some(NotificationCommands::Clear { id }) => {
                commands::clear_notifications(ctx, id.as_deref()).await?;
            }
        },

        Commands::Rebuild => {
            commands::rebuild(ctx).await?;
        }
    }

    Ok(())
}
