//! `wagate watch`: follow realtime events for one device session.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::mpsc;

use wagate_core::{ConnectionUpdate, QrUpdate, RealtimeNotifier};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::AppContext;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum WatchEvent {
    Qr(QrUpdate),
    Connection(ConnectionUpdate),
}

fn render_event(event: &WatchEvent, format: OutputFormat, color: bool) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(match event {
            WatchEvent::Qr(u) => format!("qr          {}  {}", u.session_name, u.qr),
            WatchEvent::Connection(u) => format!(
                "connection  {}  {}{}",
                u.session_name,
                output::paint_status(&u.status, color),
                u.phone_number
                    .as_deref()
                    .map(|p| format!("  {p}"))
                    .unwrap_or_default()
            ),
        }),
        // One event per line, whatever the JSON flavour.
        OutputFormat::Json | OutputFormat::JsonCompact => {
            serde_json::to_string(event).map_err(|e| CliError::Render {
                message: e.to_string(),
            })
        }
        OutputFormat::Yaml => serde_yaml::to_string(event)
            .map(|doc| format!("---\n{}", doc.trim_end()))
            .map_err(|e| CliError::Render {
                message: e.to_string(),
            }),
    }
}

fn spinner(session: &str, global: &GlobalOpts) -> Option<ProgressBar> {
    if global.quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(format!("Waiting for events on '{session}' (Ctrl-C to stop)"));
    bar.enable_steady_tick(Duration::from_millis(120));
    Some(bar)
}

pub async fn handle(ctx: &AppContext, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let notifier = RealtimeNotifier::from_config(&ctx.profile.gateway)?;
    let color = output::should_color(global.color);

    let (tx, mut rx) = mpsc::unbounded_channel::<WatchEvent>();
    let session = args.session.clone();
    let qr_tx = tx.clone();
    let _qr = notifier.on_qr(move |u| {
        if u.session_name == session {
            let _ = qr_tx.send(WatchEvent::Qr(u.clone()));
        }
    });
    let session = args.session.clone();
    let _connection = notifier.on_connection(move |u| {
        if u.session_name == session {
            let _ = tx.send(WatchEvent::Connection(u.clone()));
        }
    });

    notifier.connect();
    notifier.join_session(&args.session)?;
    tracing::info!(session = %args.session, endpoint = %notifier.endpoint().url, "watching");

    let mut bar = spinner(&args.session, global);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                if let Some(bar) = bar.take() {
                    bar.finish_and_clear();
                }
                output::print_output(&render_event(&event, global.output, color)?, global.quiet);
                let connected = matches!(&event, WatchEvent::Connection(u) if u.status == "connected");
                if connected && !args.follow {
                    break;
                }
            }
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    if let Err(e) = notifier.leave_session(&args.session) {
        tracing::debug!(error = %e, "leave-session not sent");
    }
    notifier.disconnect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> WatchEvent {
        WatchEvent::Connection(ConnectionUpdate {
            session_name: "sales".into(),
            status: "connected".into(),
            phone_number: Some("62811".into()),
        })
    }

    #[test]
    fn json_events_are_tagged() {
        let line = render_event(&connected(), OutputFormat::Json, false).unwrap_or_default();
        assert_eq!(
            line,
            r#"{"event":"connection","sessionName":"sales","status":"connected","phoneNumber":"62811"}"#
        );
    }

    #[test]
    fn plain_qr_line() {
        let event = WatchEvent::Qr(QrUpdate {
            session_name: "sales".into(),
            qr: "2@pair".into(),
        });
        assert_eq!(
            render_event(&event, OutputFormat::Plain, false).unwrap_or_default(),
            "qr          sales  2@pair"
        );
    }
}
