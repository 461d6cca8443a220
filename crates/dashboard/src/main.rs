use std::{path::PathBuf, sync::Arc};

use color_eyre::eyre;
use structopt::StructOpt;
use tracing::{error, info};

use dashboard::{
    config::DashboardConfig, logger, render::render, server, Dashboard, MutationReport,
    RefreshOutcome, SyncLoop,
};
use interface::StrategyName;
use trading_api::{HttpTradingClient, Mutation, TradingService};

// lib.rs에서 자동으로 dotenv가 로드됨

#[derive(Debug, StructOpt)]
#[structopt(name = "dashboard", about = "페이퍼 트레이딩 서비스 대시보드")]
struct Opt {
    /// 트레이딩 서비스 주소 (PAPERTRADER_API_URL)
    #[structopt(long)]
    api_url: Option<String>,
    /// 폴링 주기 ms (PAPERTRADER_POLL_MS)
    #[structopt(long)]
    poll_ms: Option<u64>,
    /// 요청 타임아웃 ms (PAPERTRADER_TIMEOUT_MS)
    #[structopt(long)]
    timeout_ms: Option<u64>,
    /// 조회 전에 /refresh_prices를 호출하지 않음
    #[structopt(long)]
    no_refresh_prices: bool,
    /// 로그 디렉터리 (PAPERTRADER_LOG_DIR)
    #[structopt(long, parse(from_os_str))]
    log_dir: Option<PathBuf>,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// 폴링하면서 스냅샷이 바뀔 때마다 화면에 그림 (Ctrl-C로 종료)
    Watch {
        /// 뷰 서버 포트 (/snapshot, /actions/...)
        #[structopt(long)]
        serve: Option<u16>,
    },
    /// 스냅샷을 한 번 가져와서 출력
    Snapshot,
    /// 자동 트레이딩 시작
    Start,
    /// 자동 트레이딩 중지
    Stop,
    /// 계좌 초기화
    Reset,
    /// 트레이딩 틱 한 번 실행
    Tick,
    /// 현금 잔고 설정
    SetCash { amount: f64 },
    /// 전략 변경 (random, momentum)
    SetStrategy { name: StrategyName },
    /// 트레이딩 주기 변경 (분)
    SetInterval { minutes: u32 },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // init error reporting
    color_eyre::install()?;

    let opt = Opt::from_args();
    let config = load_config(&opt)?;

    // guards는 main이 끝날 때까지 들고 있어야 한다
    let _guards = logger::init_tracing(&config.log_dir)?;

    let client = HttpTradingClient::new(&config.api_url, config.request_timeout)?;
    info!("trading service: {}", client.base_url());
    let service: Arc<dyn TradingService> = Arc::new(client);

    match opt.cmd {
        Command::Watch { serve } => run_watch(service, &config, serve).await,
        Command::Snapshot => run_snapshot(service, &config).await,
        Command::Start => run_mutation(service, &config, Mutation::StartTrading).await,
        Command::Stop => run_mutation(service, &config, Mutation::StopTrading).await,
        Command::Reset => run_mutation(service, &config, Mutation::Reset).await,
        Command::Tick => run_mutation(service, &config, Mutation::RunTick).await,
        Command::SetCash { amount } => {
            run_mutation(service, &config, Mutation::SetCash(amount)).await
        }
        Command::SetStrategy { name } => {
            run_mutation(service, &config, Mutation::SetStrategy(name)).await
        }
        Command::SetInterval { minutes } => {
            run_mutation(service, &config, Mutation::SetInterval(minutes)).await
        }
    }
}

fn load_config(opt: &Opt) -> eyre::Result<DashboardConfig> {
    let mut config = DashboardConfig::from_env()?;
    if let Some(url) = &opt.api_url {
        config = config.with_api_url(url)?;
    }
    if let Some(ms) = opt.poll_ms {
        config = config.with_poll_ms(ms)?;
    }
    if let Some(ms) = opt.timeout_ms {
        config = config.with_timeout_ms(ms)?;
    }
    if opt.no_refresh_prices {
        config.refresh_prices = false;
    }
    if let Some(dir) = &opt.log_dir {
        config.log_dir = dir.clone();
    }
    Ok(config)
}

async fn run_watch(
    service: Arc<dyn TradingService>,
    config: &DashboardConfig,
    serve: Option<u16>,
) -> eyre::Result<()> {
    let dashboard = Arc::new(Dashboard::new(service, config.sync_config()));
    let mut views = dashboard.sync().subscribe();
    dashboard.sync().start();

    if let Some(port) = serve {
        let dashboard = Arc::clone(&dashboard);
        tokio::spawn(async move {
            if let Err(e) = server::serve(dashboard, port).await {
                error!("dashboard view server failed: {:?}", e);
            }
        });
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl-C received, stopping");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                println!("{}", render(&view));
            }
        }
    }

    if let Some(handle) = dashboard.sync().stop() {
        handle.await?;
    }
    Ok(())
}

async fn run_snapshot(service: Arc<dyn TradingService>, config: &DashboardConfig) -> eyre::Result<()> {
    let sync = SyncLoop::new(service, config.sync_config());
    sync.start_manual();
    let outcome = sync.refresh_now().await;
    sync.stop();

    match outcome {
        RefreshOutcome::Published { .. } => {
            println!("{}", render(&sync.view()));
            Ok(())
        }
        RefreshOutcome::Failed { error, .. } => Err(eyre::eyre!("snapshot fetch failed: {}", error)),
        other => Err(eyre::eyre!("snapshot fetch did not publish: {:?}", other)),
    }
}

async fn run_mutation(
    service: Arc<dyn TradingService>,
    config: &DashboardConfig,
    mutation: Mutation,
) -> eyre::Result<()> {
    let dashboard = Dashboard::new(service, config.sync_config());
    // 예약 틱 없이 변경 후 새로고침 한 번만 한다
    dashboard.sync().start_manual();

    let report = dashboard.apply(mutation).await;
    print_report(&report);
    println!("{}", render(&dashboard.sync().view()));

    if let Some(handle) = dashboard.sync().stop() {
        handle.await?;
    }

    match report.result {
        Ok(_) => Ok(()),
        Err(e) => Err(eyre::eyre!("{} failed: {}", report.mutation, e)),
    }
}

fn print_report(report: &MutationReport) {
    match &report.result {
        Ok(ack) => println!("[{}] {}", report.mutation, ack.message),
        Err(e) => println!("[{}] FAILED: {}", report.mutation, e),
    }
    println!("  refresh: {:?}", report.refresh);
}
