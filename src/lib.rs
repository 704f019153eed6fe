pub mod adapters;
mod app;
pub mod config;
pub mod notify;
pub mod ports;
mod state;
pub mod store;
pub mod types;

pub use app::app;

pub async fn serve(config: config::AppConfig) {
    let state = app::build_state(config);
    if let Some(every) = state.config.flush_interval {
        tokio::spawn(run_flush_ticker(state.engine.clone(), every));
    }
    let addr = state.config.listen;
    let router = app::router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, router).await.expect("server error");
}

/// In-process stand-in for the external cron trigger. The engine itself never
/// schedules; this task just invokes the flush operation on a fixed cadence.
async fn run_flush_ticker(engine: state::AppEngine, every: std::time::Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        match engine.process_due_batches().await {
            Ok(summary) if summary.sent > 0 || summary.errors > 0 => {
                println!(
                    "flush: {} push(es) sent, {} error(s)",
                    summary.sent, summary.errors
                );
            }
            Ok(_) => {}
            Err(err) => eprintln!("flush error: {err}"),
        }
    }
}
