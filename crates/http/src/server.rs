use crate::routes::{build_router, AppState};
use anyhow::Context;
use hostscope_core::{CacheCoordinator, Config};
use std::{future::Future, sync::Arc};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

/// Binds the configured address and serves until Ctrl-C or SIGTERM
pub async fn serve(config: &Config, coordinator: Arc<CacheCoordinator>) -> anyhow::Result<()> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    serve_on(listener, coordinator, shutdown_signal()).await
}

/// Serves on an already bound listener until `shutdown` resolves.
///
/// Warm-up is spawned before the first connection is accepted and is not
/// awaited; early requests join the collections it started.
pub async fn serve_on<F>(
    listener: TcpListener,
    coordinator: Arc<CacheCoordinator>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;

    let warm = Arc::clone(&coordinator);
    tokio::spawn(async move { warm.warm_up().await });

    info!(%local_addr, platform = %coordinator.platform(), "hostscope listening");
    let router = build_router(AppState { coordinator });
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostscope_core::{CoordinatorConfig, Platform};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_serve_on_warms_up_and_stops_on_shutdown() {
        let coordinator = Arc::new(CacheCoordinator::new(
            Platform::from_id("plan9"),
            None,
            CoordinatorConfig::default(),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let server = tokio::spawn(serve_on(listener, Arc::clone(&coordinator), async move {
            let _ = stopped.await;
        }));

        for _ in 0..100 {
            if coordinator.status().stats.populated {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(coordinator.status().stats.populated);
        assert!(coordinator.status().identity.populated);

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
