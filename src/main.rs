use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
pub mod mappings;
mod services;
mod utils;

use config::{Config, LoggingConfig};
use services::{create_display_backend, create_launcher, Dispatcher, Registry};

#[derive(Parser, Debug)]
#[command(name = "hotswitch")]
#[command(about = "Запуск приложения или переключение между его окнами по горячей клавише")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "hotswitch.toml")]
    config: String,

    /// Режим сухого запуска (эмуляция оконной системы, без запуска приложений)
    #[arg(long)]
    dry_run: bool,

    /// Фильтр логирования, например "debug" или "hotswitch=trace"
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Конфигурация нужна до логирования: в ней формат и фильтр логов
    let config = Arc::new(Config::load(&args.config)?);

    init_tracing(args.log_level.as_deref(), &config.logging)?;

    info!("Запуск hotswitch v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - оконная система эмулируется, приложения не запускаются");
    } else {
        utils::check_session()?;
    }

    // Инициализация компонентов
    let backend = create_display_backend(config.clone(), args.dry_run)?;
    let launcher = create_launcher(args.dry_run);
    let registry = Arc::new(Registry::new());
    let mut dispatcher = Dispatcher::new(config.clone(), registry.clone(), backend, launcher);

    info!("Все компоненты инициализированы, привязок клавиш: {}", config.hotkeys.len());

    let mut dispatcher_handle = tokio::spawn(async move { dispatcher.run().await });

    // Ожидание сигнала завершения или остановки диспетчера
    let mut failure = None;
    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
            Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
        },
        joined = &mut dispatcher_handle => match joined {
            Ok(Ok(())) => info!("Диспетчер завершил работу"),
            Ok(Err(e)) => {
                error!("Диспетчер остановлен: {}", e);
                failure = Some(anyhow::Error::from(e));
            }
            Err(e) => {
                error!("Задача диспетчера аварийно завершилась: {}", e);
                failure = Some(anyhow::anyhow!("задача диспетчера завершилась: {}", e));
            }
        },
    }

    info!("Завершение работы...");

    // Прерываем диспетчер, чтобы освободить захват клавиш в Drop
    if !dispatcher_handle.is_finished() {
        dispatcher_handle.abort();

        let shutdown_timeout = tokio::time::Duration::from_secs(5);
        match tokio::time::timeout(shutdown_timeout, dispatcher_handle).await {
            Ok(_) => info!("Диспетчер остановлен корректно"),
            Err(_) => warn!("Таймаут при остановке диспетчера"),
        }
    }

    info!("Групп окон на момент выхода: {}", registry.len());

    match failure {
        Some(e) => Err(e),
        None => {
            info!("hotswitch завершил работу");
            Ok(())
        }
    }
}

fn init_tracing(cli_filter: Option<&str>, logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // RUST_LOG важнее флага --log-level, флаг важнее конфигурации
    let directives = match cli_filter {
        Some(filter) => filter.to_string(),
        None => logging.directives(),
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directives))?;

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "full" {
        registry.with(fmt::layer()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }

    Ok(())
}
