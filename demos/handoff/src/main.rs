//! ITDE hand-off demo
//!
//! JSON Diff announces its output, the Whitespace Remover reviews the signal,
//! accepts it and receives the diff with its whitespace stripped.

use itde::{
    ItdeConfig, ItdeItem, ItdeSender, ItdeTargetController, PayloadResolver, ProcessError,
    SignalChannel, StaticMetadataRegistry, TargetEnvironment, ToolDirective, processor_fn,
};
use itde_testing::{InMemoryFileLibrary, InMemoryStatePersistence};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TOOLS: &str = r#"[
    {
        "directive": "json-diff",
        "title": "JSON Diff",
        "inputConfig": { "acceptsMimeTypes": ["application/json"] },
        "outputConfig": {
            "transferableContent": [
                { "dataType": "inline", "mimeType": "application/json", "field": "diff" }
            ]
        }
    },
    {
        "directive": "text-whitespace-remover",
        "title": "Whitespace Remover",
        "inputConfig": { "acceptsMimeTypes": ["text/*", "application/json"] }
    },
    {
        "directive": "image-resizer",
        "title": "Image Resizer",
        "inputConfig": { "acceptsMimeTypes": ["image/*"] }
    }
]"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "itde=debug,itde_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ItdeConfig::from_env();
    config.validate()?;
    tracing::info!(?config, "Configuration loaded");

    let registry = Arc::new(StaticMetadataRegistry::from_json(TOOLS)?);
    let states = InMemoryStatePersistence::new();
    states.set_state(
        "/tool/json-diff",
        json!({ "diff": { "added": ["  spaced  value  "], "removed": [] } }),
    );

    let channel = SignalChannel::new(config.broadcast_capacity);
    let source = ToolDirective::new("json-diff");
    let target = ToolDirective::new("text-whitespace-remover");

    let sender = ItdeSender::new(channel.clone(), registry.clone(), source.clone());
    println!("=== ITDE hand-off: JSON Diff -> Whitespace Remover ===\n");
    for tool in sender.targets() {
        println!("Compatible target: {} ({})", tool.title, tool.directive);
    }

    let processor = processor_fn(|delivery: itde::SignalDelivery| async move {
        let items = delivery.data.items();
        if items.is_empty() {
            return Err(ProcessError::new("nothing to clean"));
        }
        for item in items {
            let ItdeItem::Inline(blob) = item else {
                return Err(ProcessError::new("expected inline text"));
            };
            let text = blob
                .as_text()
                .ok_or_else(|| ProcessError::new("input is not UTF-8"))?;
            let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            println!(
                "Cleaned {} from {}: {cleaned}",
                blob.mime_type, delivery.signal.source_tool_title
            );
        }
        Ok(())
    });

    let resolver = PayloadResolver::new(Arc::new(states), Arc::new(InMemoryFileLibrary::new()))
        .with_timeout(config.resolve_timeout());
    let environment = TargetEnvironment::new(registry, resolver, channel, Arc::new(processor));
    let controller = ItdeTargetController::mount(target.clone(), environment, &config);
    controller.mark_tool_state_loaded().await?;

    let signal = sender.send_to(target)?;
    println!("\nSent signal #{} from {}", signal.sequence, signal.source_tool_title);

    controller
        .wait_until(|s| !s.pending.is_empty(), Duration::from_secs(1))
        .await?;
    println!("Phase: {:?}", controller.phase().await);

    for pending in controller.pending_signals().await {
        controller.accept_signal(pending.source_directive).await?;
    }

    match (controller.last_delivery().await, controller.last_error().await) {
        (_, Some(error)) => println!("\nHand-off failed: {error}"),
        (Some(summary), None) => println!("\nDelivered {} item(s)", summary.item_count),
        (None, None) => println!("\nNothing was delivered"),
    }
    println!("Phase: {:?}", controller.phase().await);

    controller.unmount().await?;
    Ok(())
}
