use anyhow::Result;
use clap::{Parser, ValueEnum};
use exit_intent::{Cause, Config, ExitIntent, Page, Platform, Scenario};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "exit-intent")]
#[command(about = "Прогон детектора exit intent на записанном сценарии действий пользователя")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "exit-intent.toml")]
    config: String,

    /// Файл сценария (TOML)
    #[arg(short, long)]
    scenario: String,

    /// Платформа страницы
    #[arg(long, value_enum, default_value_t = PlatformArg::Auto)]
    platform: PlatformArg,

    /// Уровень логирования (перекрывает logging.level из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlatformArg {
    /// Из сценария или по признакам сенсорного ввода
    Auto,
    Desktop,
    Mobile,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Config::load(&args.config)?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск exit-intent v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    let mut scenario = Scenario::load(&args.scenario)?;
    match args.platform {
        PlatformArg::Auto => {}
        PlatformArg::Desktop => scenario.platform = Some(Platform::Desktop),
        PlatformArg::Mobile => scenario.platform = Some(Platform::Mobile),
    }
    if scenario.steps.is_empty() {
        warn!("Сценарий '{}' не содержит шагов, сработать может только бездействие", scenario.name);
    }

    let page = Arc::new(scenario.build_page());
    let platform = page.platform();
    info!("Сценарий '{}': платформа {}, длительность {:?}", scenario.name, platform, scenario.duration());

    // Каждый показ записывается с отметкой времени от начала прогона
    let fired: Arc<Mutex<Vec<(u128, Cause)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = fired.clone();
    let started = tokio::time::Instant::now();
    let disposer = ExitIntent::start_with(
        page.clone(),
        platform,
        Arc::new(config),
        Handle::current(),
        Arc::new(move |cause: Cause| {
            let at = started.elapsed().as_millis();
            info!("EXIT INTENT: {} ({}мс)", cause, at);
            sink.lock().push((at, cause));
        }),
    );

    // Прогон сценария или досрочная остановка
    tokio::select! {
        delivered = scenario.replay(&page) => {
            info!("Сценарий проигран, доставлено событий: {}", delivered);
        }
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
            Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
        },
    }

    info!("Завершение работы...");
    let displays = disposer.displays();
    disposer.dispose();

    let fired = fired.lock();
    println!("Сценарий: {} ({})", scenario.name, platform);
    println!("Показов: {}", displays);
    for (at, cause) in fired.iter() {
        println!("  {:>8}мс  {}", at, cause);
    }
    if page.listener_count() != 0 {
        warn!("После очистки остались слушатели: {}", page.listener_count());
    }

    info!("exit-intent завершил работу");
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }

    Ok(())
}
