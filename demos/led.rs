//! LED demo - drives a simulated Bolt+ over a tiny MTU.
//!
//! This example demonstrates:
//! - Starting a session with a response handler
//! - Main LED, masked LED and matrix commands with processor addressing
//! - Fragmented writes and notifications (MTU 8) being reassembled
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=sphero_link=debug cargo run --example led
//! ```

use sphero_link::device::{BoltPlus, PRIMARY_PROCESSOR};
use sphero_link::handler::ResponseContext;
use sphero_link::session::SessionBuilder;
use sphero_link::transport::SimulatedTransport;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let transport = SimulatedTransport::new(8);
    let probe = transport.probe();

    let session = SessionBuilder::new()
        .handle((0x02, 0x20), |_: (), ctx: ResponseContext| async move {
            tracing::info!("Main LED acknowledged: SEQ={}", ctx.sequence());
            Ok(())
        })
        .start(transport)
        .await?;

    let bolt = BoltPlus::new(session);

    bolt.set_main_led(10, 20, 30).await?;
    bolt.set_led_mask(PRIMARY_PROCESSOR, 0x3F, &[255, 0, 0, 255, 0, 0])
        .await?;
    bolt.set_matrix_color(0, 255, 0).await?;

    for _ in 0..3 {
        let Some(event) = bolt.session().next_event().await else {
            break;
        };
        tracing::info!(
            "SEQ={} {:#04x}/{:#04x} status={:?}",
            event.sequence(),
            event.response.device_id,
            event.response.command_id,
            event.response.status
        );
    }

    tracing::info!("Robot LEDs: {:?}", probe.device().leds());

    bolt.into_session().close().await?;
    Ok(())
}
