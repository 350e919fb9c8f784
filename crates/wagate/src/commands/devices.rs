//! Device command handlers.

use chrono::{DateTime, Utc};
use tabled::Tabled;

use wagate_core::{Device, DeviceQr, DeviceService, QrFormat, media};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, QrOutput};
use crate::error::CliError;
use crate::output;

use super::{AppContext, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Session")]
    session: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Live")]
    live: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn device_row(d: &Device, color: bool) -> DeviceRow {
    DeviceRow {
        id: d.id.to_string(),
        session: d.session_name.clone(),
        phone: d.phone_number.clone().unwrap_or_default(),
        status: output::paint_status(&d.status.to_string(), color),
        live: output::paint_status(&d.live_status.to_string(), color),
        online: if d.is_online { "yes" } else { "no" }.into(),
        updated: timestamp(d.updated_at, "%Y-%m-%d %H:%M"),
    }
}

fn timestamp(ts: Option<DateTime<Utc>>, fmt: &str) -> String {
    ts.map_or_else(|| "-".into(), |t| t.format(fmt).to_string())
}

fn detail(d: &Device) -> String {
    [
        format!("ID:       {}", d.id),
        format!("Session:  {}", d.session_name),
        format!("Phone:    {}", d.phone_number.as_deref().unwrap_or("-")),
        format!("Status:   {}", d.status),
        format!("Live:     {}", d.live_status),
        format!("Online:   {}", d.is_online),
        format!("Created:  {}", timestamp(d.created_at, "%Y-%m-%d %H:%M:%S UTC")),
        format!("Updated:  {}", timestamp(d.updated_at, "%Y-%m-%d %H:%M:%S UTC")),
    ]
    .join("\n")
}

fn qr_detail(q: &DeviceQr) -> String {
    let mut lines = vec![
        format!("Session:    {}", q.session_name),
        format!("Connected:  {}", q.is_connected),
    ];
    if let Some(ref qr) = q.qr {
        lines.push(format!("QR:         {qr}"));
    }
    if q.qr_image.is_some() {
        lines.push("Image:      available (use --save to write a PNG)".into());
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &AppContext, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let service = DeviceService::new(ctx.session.clone());
    let color = output::should_color(global.color);

    match args.command {
        DevicesCommand::List => {
            let devices = service.fetch_devices().await?;
            let out = output::render_list(
                global.output,
                &devices,
                |d| device_row(d, color),
                |d| d.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Create { session_name } => {
            let device = service.create_device(&session_name).await?;
            output::notice(
                &format!("✓ Created device '{}' (ID {})", device.session_name, device.id),
                global.quiet,
            );
            let out = output::render_single(global.output, &device, detail, |d| d.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Qr {
            device,
            format,
            save,
        } => {
            let id = util::resolve_device_id(&service, &device).await?;
            let format = match format {
                QrOutput::Image => QrFormat::Image,
                QrOutput::Raw => QrFormat::Raw,
            };
            let qr = service.device_qr(id, format).await?;

            if let Some(path) = save {
                let image = qr.qr_image.as_deref().ok_or_else(|| CliError::Validation {
                    field: "save".into(),
                    reason: if qr.is_connected {
                        "device is already connected; no QR to save".into()
                    } else {
                        "the gateway returned no QR image; request --format image".into()
                    },
                })?;
                let (_, bytes) = media::decode_data_url(image)?;
                tokio::fs::write(&path, bytes).await?;
                output::notice(&format!("✓ QR image written to {}", path.display()), global.quiet);
            }

            let out = output::render_single(global.output, &qr, qr_detail, |q| {
                q.qr.clone().unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Delete { device } => {
            let id = util::resolve_device_id(&service, &device).await?;
            if !util::confirm(&format!("Delete device {device}?"), "devices delete", global.yes)? {
                output::notice("Aborted", global.quiet);
                return Ok(());
            }
            service.delete_device(id).await?;
            output::notice(&format!("✓ Deleted device {device}"), global.quiet);
            Ok(())
        }

        DevicesCommand::Reconnect { device } => {
            let id = util::resolve_device_id(&service, &device).await?;
            service.reconnect_device(id).await?;
            output::notice(&format!("✓ Reconnecting device {device}"), global.quiet);
            Ok(())
        }
    }
}
