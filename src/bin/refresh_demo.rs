use std::time::Duration;

use anyhow::anyhow;
use taskstate::{abortable, AsyncState, KeyedTaskRegistry, TaskOptions, TaskRunner, Visitors};
use tokio::task::LocalSet;
use tokio::time::sleep;
use tracing::info;

fn describe(state: &AsyncState<String>) -> String {
    state.fold(
        Visitors::new()
            .on_init(|aborted| {
                if aborted {
                    "aborted".to_string()
                } else {
                    "not started".to_string()
                }
            })
            .on_in_progress(|| "loading...".to_string())
            .on_success(|payload: &String, invalidated| {
                if invalidated {
                    format!("{payload} (refreshing...)")
                } else {
                    payload.clone()
                }
            })
            .on_error(|error| format!("failed: {error}")),
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();
    info!("refresh demo starting");

    let local = LocalSet::new();
    local
        .run_until(async {
            // A slow "fetch" that honors its cancellation token.
            let runner = TaskRunner::new(
                |token, name: String| async move {
                    abortable(&token, async move {
                        sleep(Duration::from_millis(50)).await;
                        if name == "bad" {
                            return Err(anyhow!("upstream rejected {name}"));
                        }
                        Ok(format!("data for {name}"))
                    })
                    .await
                },
                TaskOptions::new()
                    .on_success(|payload: &String| info!(%payload, "settled"))
                    .on_error(|error| info!(%error, "failed")),
            );

            // First load, then a refresh that supersedes a slower attempt.
            let state = runner.trigger("alpha".to_string()).await;
            info!(view = %describe(&state), "after first load");

            let stale = runner.trigger("slow".to_string());
            let fresh = runner.trigger("beta".to_string());
            let (_, _) = tokio::join!(stale, fresh);
            info!(view = %describe(&runner.state()), "after superseding refresh");

            // Abort while in flight.
            let pending = runner.trigger("gamma".to_string());
            runner.abort();
            pending.await;
            info!(view = %describe(&runner.state()), "after abort");

            // A genuine failure becomes a renderable Error state.
            let state = runner.trigger("bad".to_string()).await;
            info!(view = %describe(&state), "after failing load");

            // Independent keyed instances.
            let registry: KeyedTaskRegistry<String, String, String> = KeyedTaskRegistry::new(
                |token, name: String| async move {
                    abortable(&token, async move {
                        sleep(Duration::from_millis(20)).await;
                        Ok(format!("data for {name}"))
                    })
                    .await
                },
                TaskOptions::new(),
            );
            let a = registry.get(&"a".to_string()).trigger("a".to_string());
            let b = registry.get(&"b".to_string()).trigger("b".to_string());
            let (_, _) = tokio::join!(a, b);
            for key in ["a", "b"] {
                let view = describe(&registry.get(&key.to_string()).current());
                info!(key, view = %view, "registry entry");
            }
        })
        .await;

    info!("refresh demo done");
}
