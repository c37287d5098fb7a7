use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use entrance_permits::config::database::DatabaseConfig;
use entrance_permits::config::environment::EnvironmentConfig;
use entrance_permits::database::DatabaseConnection;
use entrance_permits::models::{EntranceRequestFilter, RequestStatus};
use entrance_permits::repositories::PgRequestStore;
use entrance_permits::services::{ApprovalWorkflow, Assignees, DocumentDispatch, SmtpConfig, SmtpMailer};
use entrance_permits::utils::jwt::{generate_token, verify_token, JwtConfig};
use entrance_permits::utils::pagination::PageRequest;

const USAGE: &str = "uso: entrance-permits <comando>

comandos:
  migrate                      aplica las migraciones pendientes
  list [estado] [offset]       lista solicitudes
  render <id>                  genera el formato de una solicitud
  status <id> <estado>         cambia el estado (usa ACCESS_TOKEN)
  approve <id>                 aprueba como personal de seguridad (usa ACCESS_TOKEN)
  token <user_id>              emite un token de acceso";

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("entrance_permits=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = EnvironmentConfig::from_env().context("configuración inválida")?;
    info!("🏢 Solicitudes de ingreso ({})", config.environment);
    if config.is_development() {
        info!(
            "📄 Plantilla: {} | salida: {} | firmas: {}",
            config.template_path.display(),
            config.output_dir.display(),
            config.signature_block_mode
        );
    }

    if command == "token" {
        let user_id = id_argument(&args, 1)?;
        let token = generate_token(user_id, &JwtConfig::from(&config))?;
        println!("{}", token);
        return Ok(());
    }

    let connection = DatabaseConnection::new(&DatabaseConfig::new(config.database_url.clone()))
        .await
        .context("error conectando a la base de datos")?;
    let store = PgRequestStore::new(connection.pool().clone());
    let mailer = Arc::new(SmtpMailer::new(SmtpConfig::from(&config)));
    let workflow = ApprovalWorkflow::from_config(&config, mailer);

    let outcome = run(command, &args, &config, &connection, &store, &workflow).await;
    connection.close().await;
    outcome
}

async fn run(
    command: &str,
    args: &[String],
    config: &EnvironmentConfig,
    connection: &DatabaseConnection,
    store: &PgRequestStore,
    workflow: &ApprovalWorkflow,
) -> Result<()> {
    match command {
        "migrate" => {
            connection.run_migrations().await?;
        }
        "list" => {
            let filter = EntranceRequestFilter {
                status: args.get(1).map(|s| s.parse::<RequestStatus>()).transpose()?,
                ..EntranceRequestFilter::default()
            };
            let offset = args.get(2).map(|s| s.parse::<i64>()).transpose()?.unwrap_or(0);
            let page = workflow
                .list(store, &filter, Some(PageRequest::new(offset, config.page_limit)))
                .await?;
            println!("{} solicitudes (mostrando desde {})", page.total, page.offset);
            for request in page.items {
                println!(
                    "{:>6}  {}  {}  {}",
                    request.id,
                    request.entry_date.format("%d/%m/%Y %H:%M"),
                    request.status.label(),
                    request.reason
                );
            }
        }
        "render" => {
            let id = id_argument(args, 1)?;
            let aggregate = workflow.get(store, id).await?;
            let composer = workflow.composer().clone();
            let path = tokio::task::spawn_blocking(move || composer.compose_for(&aggregate)).await??;
            println!("{}", path.display());
        }
        "status" | "approve" => {
            let id = id_argument(args, 1)?;
            let status = if command == "approve" {
                RequestStatus::Approved
            } else {
                args.get(2).context(USAGE)?.parse::<RequestStatus>()?
            };

            let token = std::env::var("ACCESS_TOKEN").context("ACCESS_TOKEN no definido")?;
            let principal = verify_token(&token, &JwtConfig::from(config))?;
            let assignees = match status {
                RequestStatus::Approved => Assignees {
                    security_id: Some(principal.user_id),
                    ..Assignees::default()
                },
                RequestStatus::SecurityPending => Assignees {
                    authorizer_id: Some(principal.user_id),
                    ..Assignees::default()
                },
                _ => Assignees::default(),
            };

            let change = workflow.set_status(store, id, status, assignees).await?;
            println!(
                "Solicitud {}: {} -> {}",
                change.request.id,
                change.previous_status.label(),
                change.request.status.label()
            );
            match change.dispatch {
                DocumentDispatch::NotTriggered => {}
                DocumentDispatch::Sent { document } => println!("Formato enviado: {}", document.display()),
                DocumentDispatch::ComposeFailed { reason } => {
                    error!("❌ Formato no generado: {}", reason);
                }
                DocumentDispatch::EmailFailed { document, reason } => {
                    error!("❌ Formato {} no enviado: {}", document.display(), reason);
                }
            }
        }
        other => bail!("comando desconocido '{}'\n\n{}", other, USAGE),
    }

    Ok(())
}

fn id_argument(args: &[String], position: usize) -> Result<i64> {
    let raw = args.get(position).context(USAGE)?;
    raw.parse::<i64>()
        .with_context(|| format!("id inválido '{}'", raw))
}
