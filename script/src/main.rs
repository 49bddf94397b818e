use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use aws_config::BehaviorVersion;
use bank_script::{
    audit_questions::audit_questions,
    config::EnvVars,
    fix_questions::{FixArgs, fix_questions},
    import_questions::{ImportArgs, import_questions},
    parse_document::{ParseArgs, parse_file},
    rebuild_collections::{RebuildArgs, rebuild_collections},
    redistribute_unclassified::{RedistributeArgs, redistribute_unclassified},
    report::write_report,
    rollup_dashboard::rollup_dashboard,
    store::MongoStore,
    upload_asset::{UploadArgs, upload_asset},
};
use bank_utils::writer::BatchWriter;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about = "Batch jobs for the exam-prep question bank")]
struct Cli {
    /// Overrides MONGODB_URI
    #[arg(long, global = true)]
    mongodb_uri: Option<String>,
    /// Overrides BATCH_LIMIT
    #[arg(long, global = true)]
    batch_limit: Option<usize>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse an exam paper into question JSON and report missing numbers
    Parse(ParseArgs),
    /// Parse, repair, group and upsert questions
    Import(ImportArgs),
    /// Validate stored questions and collections; writes a JSON report
    Audit {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value = "reports")]
        report_dir: PathBuf,
    },
    /// Repair stored questions and delete placeholders
    Fix(FixArgs),
    /// Rebuild exam or topic collections from stored questions
    RebuildCollections(RebuildArgs),
    /// Merge an unclassified topic collection into the smallest ones
    Redistribute(RedistributeArgs),
    /// Recompute student summaries and class aggregates
    Rollup,
    /// Upload an image or ebook and record its metadata
    UploadAsset(UploadArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let file = match std::fs::File::create("logs.jsonl") {
        Ok(file) => file,
        Err(e) => {
            eprintln!("unable to create logs.jsonl: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,bank_utils=info", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().pretty())
        .with(tracing_subscriber::fmt::layer().json().with_writer(file))
        .with(sentry::integrations::tracing::layer())
        .init();

    let env_vars = match EnvVars::new() {
        Ok(env_vars) => env_vars,
        Err(e) => {
            error!("{e:?}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = if let Some(sentry_dsn) = env_vars.sentry_dsn.clone() {
        info!("initializing Sentry");
        Some(sentry::init((
            sentry_dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(env_vars.environment.to_string().into()),
                traces_sample_rate: 1.0,
                ..Default::default()
            },
        )))
    } else {
        None
    };

    match run(cli, &env_vars).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, env_vars: &EnvVars) -> anyhow::Result<()> {
    let Cli {
        mongodb_uri,
        batch_limit,
        command,
    } = cli;
    let writer = BatchWriter::new(batch_limit.unwrap_or(env_vars.batch_limit))?;

    match command {
        Command::Parse(args) => {
            let outcome = parse_file(&args)?;
            info!(
                num = outcome.document.questions.len(),
                passages = outcome.document.passages.len(),
                missing = outcome.missing.len(),
                "parse complete"
            );
        }
        Command::Import(args) => {
            let store = connect(mongodb_uri.as_deref(), env_vars).await?;
            let summary = import_questions(&store, &writer, &args).await?;
            info!(summary = %serde_json::to_string(&summary)?, "import finished");
        }
        Command::Audit {
            subject,
            report_dir,
        } => {
            let store = connect(mongodb_uri.as_deref(), env_vars).await?;
            let report = audit_questions(&store, subject.as_deref()).await?;
            write_report(&report_dir, "audit", report.generated_at, &report)?;
        }
        Command::Fix(args) => {
            let store = connect(mongodb_uri.as_deref(), env_vars).await?;
            let report = fix_questions(
                &store,
                &writer,
                args.subject.as_deref(),
                args.answer_fallback.into(),
                args.apply,
            )
            .await?;
            write_report(&args.report_dir, "fix", Utc::now(), &report)?;
        }
        Command::RebuildCollections(args) => {
            let store = connect(mongodb_uri.as_deref(), env_vars).await?;
            rebuild_collections(
                &store,
                &writer,
                args.grouping.into(),
                args.subject.as_deref(),
                args.dry_run,
            )
            .await?;
        }
        Command::Redistribute(args) => {
            let store = connect(mongodb_uri.as_deref(), env_vars).await?;
            let summary = redistribute_unclassified(&store, &writer, &args).await?;
            info!(summary = %serde_json::to_string(&summary)?, "redistribution finished");
        }
        Command::Rollup => {
            let store = connect(mongodb_uri.as_deref(), env_vars).await?;
            rollup_dashboard(&store, &writer).await?;
        }
        Command::UploadAsset(args) => {
            let store = connect(mongodb_uri.as_deref(), env_vars).await?;
            let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
            let s3 = aws_sdk_s3::Client::new(&config);
            let bucket = args.bucket.as_deref().unwrap_or(&env_vars.bucket_name);
            let asset = upload_asset(&s3, &store, &args, bucket).await?;
            info!(id = %asset.id, key = %asset.storage_key, "upload finished");
        }
    }
    Ok(())
}

async fn connect(mongodb_uri: Option<&str>, env_vars: &EnvVars) -> anyhow::Result<MongoStore> {
    let uri = match mongodb_uri {
        Some(uri) => uri,
        None => env_vars.require_mongodb_uri()?,
    };
    MongoStore::connect(uri)
        .await
        .context("unable to connect to MongoDB")
}
