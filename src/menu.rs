//! Interactive operator menu
//!
//! A thin console loop over [`SubscriberApp`]: list the current devices, take
//! a selection, export it, or exit. All state lives in the application; the
//! menu only reads lines and prints.

use crate::app::SubscriberApp;
use crate::export::ExportOutcome;
use crate::telemetry::Device;
use crate::transport::Transport;
use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tracing::error;

const MENU_TEXT: &str = "\n1. Export selected devices to CSV\n2. Exit\nSelect an option: ";

/// Run the menu loop until the operator exits or stdin closes.
pub async fn run<T: Transport + 'static>(app: &mut SubscriberApp<T>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(MENU_TEXT.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "1" => export_dialog(app, &mut stdout, &mut lines).await?,
            "2" => break,
            other => {
                stdout
                    .write_all(format!("Invalid option: {other}\n").as_bytes())
                    .await?;
            }
        }
    }

    Ok(())
}

/// The export conversation: list devices, read a selection, write the file.
///
/// Live display is suppressed while the operator is reading the list and
/// typing, and restored to its configured setting afterwards.
async fn export_dialog<T: Transport + 'static>(
    app: &mut SubscriberApp<T>,
    stdout: &mut tokio::io::Stdout,
    lines: &mut Lines<BufReader<tokio::io::Stdin>>,
) -> std::io::Result<()> {
    let snapshot = app.snapshot();
    if snapshot.is_empty() {
        stdout
            .write_all(b"No devices received yet.\n")
            .await?;
        return Ok(());
    }

    app.set_display_enabled(false);
    stdout
        .write_all(render_device_list(&snapshot).as_bytes())
        .await?;
    stdout
        .write_all(b"Enter device numbers separated by commas: ")
        .await?;
    stdout.flush().await?;

    let selection = lines.next_line().await?.unwrap_or_default();
    match app.export_selection(&snapshot, &selection) {
        Ok(ExportOutcome::Written(rows)) => {
            stdout
                .write_all(
                    format!("Exported {rows} device(s) to {}\n", app.export_path().display())
                        .as_bytes(),
                )
                .await?;
        }
        Ok(ExportOutcome::NoValidSelection) => {
            stdout
                .write_all(b"No valid devices selected, nothing exported.\n")
                .await?;
        }
        Err(e) => {
            error!(error = %e, "export failed");
            stdout
                .write_all(format!("Export failed: {e}\n").as_bytes())
                .await?;
        }
    }

    app.restore_display();
    Ok(())
}

/// Render the numbered device list shown before the selection prompt.
fn render_device_list(snapshot: &[Device]) -> String {
    let mut out = String::from("Current devices:\n");
    for (i, device) in snapshot.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. MAC Address: {}, Model: {}, RSSI: {}",
            i + 1,
            device.address,
            device.model,
            device.rssi
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_device_list_is_one_based() {
        let snapshot = vec![
            Device {
                address: "AA:01".to_string(),
                model: "iBS03T".to_string(),
                rssi: -61,
            },
            Device {
                address: "AA:02".to_string(),
                model: "Unknown Model".to_string(),
                rssi: -70,
            },
        ];

        let rendered = render_device_list(&snapshot);
        assert!(rendered.contains("1. MAC Address: AA:01, Model: iBS03T, RSSI: -61"));
        assert!(rendered.contains("2. MAC Address: AA:02, Model: Unknown Model, RSSI: -70"));
    }

    #[test]
    fn test_render_empty_list_has_header_only() {
        assert_eq!(render_device_list(&[]), "Current devices:\n");
    }
}
