//! Message command handlers.

use wagate_core::{
    DeviceService, MessageContent, MessageReceipt, MessageService, SendCapability,
    SendMessageRequest, media,
};

use crate::cli::{GlobalOpts, MessagesArgs, MessagesCommand};
use crate::error::CliError;
use crate::output;

use super::{AppContext, util};

fn receipt_detail(r: &MessageReceipt) -> String {
    format!("Message ID:  {}", r.message_id)
}

fn capability_detail(c: &SendCapability) -> String {
    let mut line = format!("Can send:  {}", if c.can_send { "yes" } else { "no" });
    if let Some(ref reason) = c.reason {
        line.push_str(&format!("\nReason:    {reason}"));
    }
    line
}

pub async fn handle(ctx: &AppContext, args: MessagesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = DeviceService::new(ctx.session.clone());
    let messages = MessageService::new(ctx.session.clone());

    match args.command {
        MessagesCommand::Send {
            device,
            to,
            text,
            image,
            document,
            caption,
        } => {
            let device_id = util::resolve_device_id(&devices, &device).await?;
            let content = match (text, image, document) {
                (Some(text), _, _) => MessageContent::text(text),
                (None, Some(path), _) => media::encode_file(&path).await?.into_image(caption),
                (None, None, Some(path)) => media::encode_file(&path).await?.into_document(caption),
                (None, None, None) => {
                    return Err(CliError::Validation {
                        field: "content".into(),
                        reason: "pass one of --text, --image, or --document".into(),
                    });
                }
            };
            tracing::debug!(kind = content.kind(), %device_id, "sending message");

            let receipt = messages
                .send_message(&SendMessageRequest {
                    device_id,
                    to,
                    content,
                })
                .await?;
            let out = output::render_single(global.output, &receipt, receipt_detail, |r| {
                r.message_id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MessagesCommand::Check { device } => {
            let id = util::resolve_device_id(&devices, &device).await?;
            let capability = messages.check_device(id).await?;
            let out = output::render_single(global.output, &capability, capability_detail, |c| {
                c.can_send.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
