//! Utilities for the bridge service, internal to the crate.

/// Spawns a set of parallel [BridgeActor]s in a [JoinSet] and waits for all of them. If any actor
/// fails, the shared cancellation token is cancelled so the others wind down, and the first error
/// is returned. The actors' error types are erased into [ServiceError::Actor].
///
/// [JoinSet]: tokio::task::JoinSet
/// [BridgeActor]: crate::BridgeActor
/// [ServiceError::Actor]: crate::ServiceError::Actor
macro_rules! spawn_and_wait {
    ($cancellation:expr, actors = [$($actor:expr),* $(,)?]) => {{
        let cancellation: &tokio_util::sync::CancellationToken = &$cancellation;
        let mut task_handles = tokio::task::JoinSet::new();

        $(
            {
                let actor = $actor;
                let name = $crate::BridgeActor::name(&actor);
                let context = $crate::ActorContext { cancellation: cancellation.clone() };
                task_handles.spawn(async move {
                    $crate::BridgeActor::start(actor, context).await.map_err(|err| {
                        $crate::ServiceError::Actor { name, reason: format!("{err:?}") }
                    })
                });
            }
        )*

        let mut first_error = None;
        while let Some(joined) = task_handles.join_next().await {
            let result = joined.unwrap_or_else(|err| {
                Err($crate::ServiceError::Actor { name: "unknown", reason: err.to_string() })
            });
            if let Err(err) = result {
                tracing::error!(target: "bridge::service", %err, "Actor failed, shutting down");
                cancellation.cancel();
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }};
}

pub(crate) use spawn_and_wait;

/// Resolves on SIGINT or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "bridge::service", %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(target: "bridge::service", %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!(target: "bridge::service", "Received SIGINT (Ctrl+C)");
        },
        _ = terminate => {
            tracing::info!(target: "bridge::service", "Received SIGTERM");
        },
    }
}
